//! Pedagogical recommender
//!
//! Maps a detected emotion and its confidence to an ordered list of
//! interventions and a structured session adjustment. The mapping is a
//! versioned TOML table: a built-in copy is compiled into the binary and an
//! operator may replace it with a file loaded once at startup.
//!
//! Below [`CONFIDENCE_THRESHOLD`] the detection is not trusted and every
//! label gets the defaults.

use edugame_common::{AdjustmentRecord, RecommendationSet};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Detections below this confidence yield the default recommendation
pub const CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Table format version understood by this build
pub const TABLE_VERSION: u32 = 1;

const BUILTIN_TABLE: &str = include_str!("../../tables/pedagogy.toml");

/// Recommendation table errors
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Failed to read recommendation table {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse recommendation table: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unsupported recommendation table version {found} (expected {})", TABLE_VERSION)]
    UnsupportedVersion { found: u32 },

    #[error("Invalid difficulty_adjustment {value} for '{emotion}' (must be -1, 0 or 1)")]
    InvalidDifficulty { emotion: String, value: i8 },

    #[error("default_recommendations must not be empty")]
    EmptyDefaults,
}

/// Emotion → interventions and adjustments
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecommendationTable {
    pub version: u32,
    pub default_recommendations: RecommendationSet,
    #[serde(default)]
    pub recommendations: BTreeMap<String, RecommendationSet>,
    #[serde(default)]
    pub adjustments: BTreeMap<String, AdjustmentRecord>,
}

impl RecommendationTable {
    /// Table compiled into the binary
    pub fn builtin() -> Result<Self, TableError> {
        Self::parse(BUILTIN_TABLE)
    }

    /// Parse and validate table text
    pub fn parse(content: &str) -> Result<Self, TableError> {
        let raw: RecommendationTable = toml::from_str(content)?;
        raw.validated()
    }

    /// Read, parse and validate a table file
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let content = std::fs::read_to_string(path).map_err(|source| TableError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    fn validated(self) -> Result<Self, TableError> {
        if self.version != TABLE_VERSION {
            return Err(TableError::UnsupportedVersion {
                found: self.version,
            });
        }

        if self.default_recommendations.is_empty() {
            return Err(TableError::EmptyDefaults);
        }

        if let Some((emotion, record)) = self
            .adjustments
            .iter()
            .find(|(_, r)| !(-1..=1).contains(&r.difficulty_adjustment))
        {
            return Err(TableError::InvalidDifficulty {
                emotion: emotion.clone(),
                value: record.difficulty_adjustment,
            });
        }

        // Keys are matched case-insensitively
        Ok(Self {
            recommendations: self
                .recommendations
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect(),
            adjustments: self
                .adjustments
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect(),
            ..self
        })
    }
}

/// Rule-table lookup of interventions and adjustments
#[derive(Debug, Clone)]
pub struct PedagogicalRecommender {
    table: RecommendationTable,
}

impl PedagogicalRecommender {
    pub fn new(table: RecommendationTable) -> Self {
        Self { table }
    }

    /// Recommender over the built-in table
    pub fn builtin() -> Result<Self, TableError> {
        Ok(Self::new(RecommendationTable::builtin()?))
    }

    /// Recommender over a replacement table, or the built-in one when `None`
    pub fn from_path(path: Option<&Path>) -> Result<Self, TableError> {
        match path {
            Some(path) => {
                let table = RecommendationTable::load(path)?;
                info!(
                    path = %path.display(),
                    emotions = table.recommendations.len(),
                    "Loaded recommendation table"
                );
                Ok(Self::new(table))
            }
            None => Self::builtin(),
        }
    }

    pub fn table(&self) -> &RecommendationTable {
        &self.table
    }

    fn trusted(confidence: f64) -> bool {
        // NaN compares false and is treated as untrusted
        confidence >= CONFIDENCE_THRESHOLD
    }

    /// Interventions for an emotion detection
    pub fn recommendations_for(&self, emotion: &str, confidence: f64) -> RecommendationSet {
        if !Self::trusted(confidence) {
            return self.table.default_recommendations.clone();
        }

        self.table
            .recommendations
            .get(&emotion.trim().to_ascii_lowercase())
            .unwrap_or(&self.table.default_recommendations)
            .clone()
    }

    /// Session adjustment for an emotion detection
    pub fn adjustments_for(&self, emotion: &str, confidence: f64) -> AdjustmentRecord {
        if !Self::trusted(confidence) {
            return AdjustmentRecord::neutral();
        }

        self.table
            .adjustments
            .get(&emotion.trim().to_ascii_lowercase())
            .cloned()
            .unwrap_or_else(AdjustmentRecord::neutral)
    }

    /// Interventions and adjustment for an emotion detection
    pub fn recommend(
        &self,
        emotion: &str,
        confidence: f64,
    ) -> (RecommendationSet, AdjustmentRecord) {
        let recommendations = self.recommendations_for(emotion, confidence);
        let adjustments = self.adjustments_for(emotion, confidence);
        debug!(
            emotion,
            confidence,
            recommendations = recommendations.len(),
            difficulty = adjustments.difficulty_adjustment,
            "Pedagogical recommendation"
        );
        (recommendations, adjustments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edugame_common::{AudioEmotion, Encouragement, SupportLevel};

    fn recommender() -> PedagogicalRecommender {
        PedagogicalRecommender::builtin().unwrap()
    }

    fn default_set() -> RecommendationSet {
        vec!["Continue with current approach".to_string()]
    }

    #[test]
    fn builtin_table_is_valid() {
        let table = RecommendationTable::builtin().unwrap();
        assert_eq!(table.version, TABLE_VERSION);
        assert_eq!(table.recommendations.len(), 7);
        assert_eq!(table.adjustments.len(), 5);
    }

    #[test]
    fn low_confidence_yields_defaults_for_every_label() {
        let r = recommender();
        let labels = AudioEmotion::ALL
            .iter()
            .map(|e| e.as_str())
            .chain(["frustrated", "joy", "unknown"]);

        for label in labels {
            for confidence in [0.0, 0.3, 0.4999] {
                let (recs, adj) = r.recommend(label, confidence);
                assert_eq!(recs, default_set(), "{} @ {}", label, confidence);
                assert_eq!(adj, AdjustmentRecord::neutral(), "{} @ {}", label, confidence);
            }
        }
    }

    #[test]
    fn nan_confidence_is_untrusted() {
        let (recs, adj) = recommender().recommend("angry", f64::NAN);
        assert_eq!(recs, default_set());
        assert_eq!(adj, AdjustmentRecord::neutral());
    }

    #[test]
    fn unknown_label_falls_back_to_defaults() {
        let (recs, adj) = recommender().recommend("joy", 0.95);
        assert_eq!(recs, default_set());
        assert_eq!(adj, AdjustmentRecord::neutral());
    }

    #[test]
    fn threshold_is_inclusive() {
        let (recs, adj) = recommender().recommend("angry", 0.5);
        assert_eq!(recs[0], "Take a short break");
        assert_eq!(adj.difficulty_adjustment, -1);
        assert_eq!(adj.break_recommended, Some(true));
    }

    #[test]
    fn table_rows_match_expected_adjustments() {
        let r = recommender();

        let fearful = r.adjustments_for("fearful", 0.8);
        assert_eq!(fearful.support_level, SupportLevel::VeryHigh);
        assert_eq!(fearful.encouragement, Encouragement::High);
        assert_eq!(fearful.hints_enabled, Some(true));

        let sad = r.adjustments_for("sad", 0.8);
        assert_eq!(sad.encouragement, Encouragement::VeryHigh);
        assert_eq!(sad.show_achievements, Some(true));

        let happy = r.adjustments_for("happy", 0.8);
        assert_eq!(happy.difficulty_adjustment, 1);
        assert_eq!(happy.challenge_increase, Some(true));

        assert_eq!(r.adjustments_for("calm", 0.8), AdjustmentRecord::neutral());
    }

    #[test]
    fn recommendations_without_adjustments_use_neutral_record() {
        let (recs, adj) = recommender().recommend("surprised", 0.7);
        assert_eq!(recs.len(), 2);
        assert_eq!(adj, AdjustmentRecord::neutral());

        let (recs, _) = recommender().recommend("frustrated", 0.7);
        assert_eq!(recs[0], "Offer hints or tips");
    }

    #[test]
    fn replacement_table_changes_lookup() {
        let table = RecommendationTable::parse(
            r#"
            version = 1
            default_recommendations = ["Keep going"]

            [recommendations]
            Calm = ["Try a harder level"]

            [adjustments.calm]
            difficulty_adjustment = 1
            support_level = "normal"
            encouragement = "standard"
            "#,
        )
        .unwrap();
        let r = PedagogicalRecommender::new(table);

        let (recs, adj) = r.recommend("calm", 0.9);
        assert_eq!(recs, vec!["Try a harder level".to_string()]);
        assert_eq!(adj.difficulty_adjustment, 1);
        assert_eq!(r.recommendations_for("calm", 0.1), vec!["Keep going".to_string()]);
    }

    #[test]
    fn unsupported_version_rejected() {
        let result = RecommendationTable::parse(
            r#"
            version = 2
            default_recommendations = ["Keep going"]
            "#,
        );
        assert!(matches!(result, Err(TableError::UnsupportedVersion { found: 2 })));
    }

    #[test]
    fn out_of_range_difficulty_rejected() {
        let result = RecommendationTable::parse(
            r#"
            version = 1
            default_recommendations = ["Keep going"]

            [adjustments.angry]
            difficulty_adjustment = -3
            support_level = "high"
            encouragement = "high"
            "#,
        );
        assert!(matches!(result, Err(TableError::InvalidDifficulty { value: -3, .. })));
    }
}
