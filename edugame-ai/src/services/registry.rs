//! Model registry
//!
//! Holds one lazily initialised handle per wrapped model. The first request
//! needing a model builds it through the [`ModelFactory`]; concurrent first
//! requests wait on that same initialisation, and later requests share the
//! handle. A failed initialisation leaves the slot empty so the next request
//! retries, and is remembered for health reporting until a retry succeeds.

use super::agent::{AgentSettings, ConversationalAgent};
use super::audio_emotion::AudioEmotionClassifier;
use super::fusion::MultimodalFusionPolicy;
use super::recommender::PedagogicalRecommender;
use super::speech::{SpeechTranscriber, TranscriberSettings};
use super::text_emotion::TextEmotionClassifier;
use crate::backends::factory::ModelFactory;
use crate::backends::{BackendError, ModelKind};
use crate::error::{ServiceError, ServiceResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use tokio::sync::OnceCell;
use tracing::{error, info};

/// Which models have been initialised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelsLoaded {
    pub audio_emotion: bool,
    pub text_emotion: bool,
    pub speech: bool,
    pub agent: bool,
}

/// Lazily initialised, shared model handles
pub struct ModelRegistry {
    factory: Arc<dyn ModelFactory>,
    recommender: Arc<PedagogicalRecommender>,
    fusion: MultimodalFusionPolicy,
    transcriber_settings: TranscriberSettings,
    agent_settings: AgentSettings,
    audio: OnceCell<Arc<AudioEmotionClassifier>>,
    text: OnceCell<Arc<TextEmotionClassifier>>,
    speech: OnceCell<Arc<SpeechTranscriber>>,
    agent: OnceCell<Arc<ConversationalAgent>>,
    failures: RwLock<BTreeMap<&'static str, String>>,
}

impl ModelRegistry {
    pub fn new(
        factory: Arc<dyn ModelFactory>,
        recommender: Arc<PedagogicalRecommender>,
        transcriber_settings: TranscriberSettings,
        agent_settings: AgentSettings,
    ) -> Self {
        Self {
            factory,
            fusion: MultimodalFusionPolicy::new(recommender.clone()),
            recommender,
            transcriber_settings,
            agent_settings,
            audio: OnceCell::new(),
            text: OnceCell::new(),
            speech: OnceCell::new(),
            agent: OnceCell::new(),
            failures: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn recommender(&self) -> &PedagogicalRecommender {
        &self.recommender
    }

    pub fn fusion_policy(&self) -> &MultimodalFusionPolicy {
        &self.fusion
    }

    pub fn transcriber_settings(&self) -> &TranscriberSettings {
        &self.transcriber_settings
    }

    fn record_failure(&self, kind: ModelKind, reason: &str) {
        let mut failures = self.failures.write().unwrap_or_else(|e| e.into_inner());
        failures.insert(kind.as_str(), reason.to_string());
    }

    fn clear_failure(&self, kind: ModelKind) {
        let mut failures = self.failures.write().unwrap_or_else(|e| e.into_inner());
        failures.remove(kind.as_str());
    }

    /// Initialise `cell` once, mapping factory errors to `ModelUnavailable`
    async fn get_or_load<T, F, Fut>(
        &self,
        cell: &OnceCell<Arc<T>>,
        kind: ModelKind,
        load: F,
    ) -> ServiceResult<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        cell.get_or_try_init(|| async {
            info!(model = %kind, "Loading model");
            match load().await {
                Ok(handle) => {
                    self.clear_failure(kind);
                    info!(model = %kind, "Model ready");
                    Ok(Arc::new(handle))
                }
                Err(e) => {
                    let reason = e.to_string();
                    error!(model = %kind, error = %reason, "Model failed to initialise");
                    self.record_failure(kind, &reason);
                    Err(ServiceError::ModelUnavailable {
                        model: kind,
                        reason,
                    })
                }
            }
        })
        .await
        .map(Arc::clone)
    }

    pub async fn audio_classifier(&self) -> ServiceResult<Arc<AudioEmotionClassifier>> {
        self.get_or_load(&self.audio, ModelKind::AudioEmotion, || async {
            let model = self.factory.audio_emotion().await?;
            Ok::<_, BackendError>(AudioEmotionClassifier::new(model, self.recommender.clone()))
        })
        .await
    }

    pub async fn text_classifier(&self) -> ServiceResult<Arc<TextEmotionClassifier>> {
        self.get_or_load(&self.text, ModelKind::TextEmotion, || async {
            let model = self.factory.text_emotion().await?;
            Ok::<_, BackendError>(TextEmotionClassifier::new(model))
        })
        .await
    }

    pub async fn transcriber(&self) -> ServiceResult<Arc<SpeechTranscriber>> {
        self.get_or_load(&self.speech, ModelKind::Speech, || async {
            let model = self.factory.speech().await?;
            Ok::<_, BackendError>(SpeechTranscriber::new(
                model,
                self.transcriber_settings.clone(),
            ))
        })
        .await
    }

    pub async fn agent(&self) -> ServiceResult<Arc<ConversationalAgent>> {
        self.get_or_load(&self.agent, ModelKind::LanguageModel, || async {
            let model = self.factory.language_model().await?;
            Ok::<_, BackendError>(ConversationalAgent::new(model, self.agent_settings.clone()))
        })
        .await
    }

    /// Which handles are initialised
    pub fn loaded(&self) -> ModelsLoaded {
        ModelsLoaded {
            audio_emotion: self.audio.initialized(),
            text_emotion: self.text.initialized(),
            speech: self.speech.initialized(),
            agent: self.agent.initialized(),
        }
    }

    /// Models whose last initialisation failed, with the reason
    pub fn failures(&self) -> BTreeMap<&'static str, String> {
        self.failures
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::StubModelFactory;
    use std::time::Duration;

    fn registry(factory: Arc<StubModelFactory>) -> ModelRegistry {
        ModelRegistry::new(
            factory,
            Arc::new(PedagogicalRecommender::builtin().unwrap()),
            TranscriberSettings::default(),
            AgentSettings::default(),
        )
    }

    #[tokio::test]
    async fn nothing_loaded_until_first_use() {
        let factory = Arc::new(StubModelFactory::new());
        let registry = registry(factory.clone());

        assert_eq!(
            registry.loaded(),
            ModelsLoaded {
                audio_emotion: false,
                text_emotion: false,
                speech: false,
                agent: false
            }
        );

        registry.text_classifier().await.unwrap();
        assert!(registry.loaded().text_emotion);
        assert!(!registry.loaded().speech);
        assert_eq!(factory.loads(ModelKind::Speech), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_calls_load_once() {
        let factory = Arc::new(StubModelFactory::new().with_load_delay(Duration::from_millis(50)));
        let registry = Arc::new(registry(factory.clone()));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.transcriber().await.map(|_| ()) })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(factory.loads(ModelKind::Speech), 1);
        let a = registry.transcriber().await.unwrap();
        let b = registry.transcriber().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn failed_init_is_unavailable_then_retried() {
        let factory = Arc::new(StubModelFactory::new().fail_loads(ModelKind::LanguageModel, 1));
        let registry = registry(factory.clone());

        match registry.agent().await {
            Err(ServiceError::ModelUnavailable { model, .. }) => {
                assert_eq!(model, ModelKind::LanguageModel)
            }
            other => panic!("expected ModelUnavailable, got {:?}", other.map(|_| ())),
        }
        assert!(registry.failures().contains_key("language_model"));
        assert!(!registry.loaded().agent);

        registry.agent().await.unwrap();
        assert_eq!(factory.loads(ModelKind::LanguageModel), 2);
        assert!(registry.failures().is_empty());
        assert!(registry.loaded().agent);
    }
}
