//! Backend construction
//!
//! [`ModelFactory`] is the seam between the model registry and concrete
//! backends. [`BackendFactory`] builds whatever the configuration names for
//! each model; tests inject [`super::stub::StubModelFactory`] instead.

use super::chat::{HttpLanguageModel, DEFAULT_LLM_MODEL};
use super::classification::{
    HttpAudioEmotionModel, HttpTextEmotionModel, DEFAULT_AUDIO_EMOTION_MODEL, DEFAULT_HF_ENDPOINT,
    DEFAULT_HF_KEY_ENV, DEFAULT_TEXT_EMOTION_MODEL,
};
use super::stub::{StubAudioModel, StubLanguageModel, StubSpeechModel, StubTextModel};
use super::whisper::{
    HttpSpeechModel, DEFAULT_OPENAI_ENDPOINT, DEFAULT_OPENAI_KEY_ENV, DEFAULT_SPEECH_MODEL,
};
use super::{AudioEmotionModel, BackendError, LanguageModel, SpeechModel, TextEmotionModel};
use async_trait::async_trait;
use edugame_common::config::{BackendKind, ModelEndpoint, ModelsConfig};
use std::sync::Arc;
use tracing::info;

/// Creates model handles on demand
///
/// Each call builds a fresh handle; the registry guarantees each method is
/// called at most once per successful initialisation.
#[async_trait]
pub trait ModelFactory: Send + Sync {
    async fn audio_emotion(&self) -> Result<Arc<dyn AudioEmotionModel>, BackendError>;
    async fn text_emotion(&self) -> Result<Arc<dyn TextEmotionModel>, BackendError>;
    async fn speech(&self) -> Result<Arc<dyn SpeechModel>, BackendError>;
    async fn language_model(&self) -> Result<Arc<dyn LanguageModel>, BackendError>;
}

/// Per-model defaults used when the config leaves a field unset
struct Defaults {
    endpoint: &'static str,
    model: &'static str,
    key_env: &'static str,
}

const AUDIO_DEFAULTS: Defaults = Defaults {
    endpoint: DEFAULT_HF_ENDPOINT,
    model: DEFAULT_AUDIO_EMOTION_MODEL,
    key_env: DEFAULT_HF_KEY_ENV,
};

const TEXT_DEFAULTS: Defaults = Defaults {
    endpoint: DEFAULT_HF_ENDPOINT,
    model: DEFAULT_TEXT_EMOTION_MODEL,
    key_env: DEFAULT_HF_KEY_ENV,
};

const SPEECH_DEFAULTS: Defaults = Defaults {
    endpoint: DEFAULT_OPENAI_ENDPOINT,
    model: DEFAULT_SPEECH_MODEL,
    key_env: DEFAULT_OPENAI_KEY_ENV,
};

const LLM_DEFAULTS: Defaults = Defaults {
    endpoint: DEFAULT_OPENAI_ENDPOINT,
    model: DEFAULT_LLM_MODEL,
    key_env: DEFAULT_OPENAI_KEY_ENV,
};

/// Resolved settings for one HTTP backend
struct Resolved<'a> {
    endpoint: &'a str,
    model: &'a str,
    api_key: Option<String>,
    timeout_secs: u64,
}

fn resolve<'a>(config: &'a ModelEndpoint, defaults: &Defaults) -> Resolved<'a> {
    Resolved {
        endpoint: config.endpoint_or(defaults.endpoint),
        model: config.model_or(defaults.model),
        api_key: config.api_key(defaults.key_env),
        timeout_secs: config.timeout_secs,
    }
}

/// Builds backends from the `[models]` configuration
pub struct BackendFactory {
    models: ModelsConfig,
}

impl BackendFactory {
    pub fn new(models: ModelsConfig) -> Self {
        Self { models }
    }

    fn log_backend(kind: &str, endpoint: &ModelEndpoint, resolved: &Resolved<'_>) {
        info!(
            model_kind = kind,
            model = resolved.model,
            endpoint = resolved.endpoint,
            authenticated = resolved.api_key.is_some(),
            backend = ?endpoint.backend,
            "Initializing model backend"
        );
    }
}

#[async_trait]
impl ModelFactory for BackendFactory {
    async fn audio_emotion(&self) -> Result<Arc<dyn AudioEmotionModel>, BackendError> {
        let config = &self.models.audio_emotion;
        if config.backend == BackendKind::Stub {
            info!("Using stub audio emotion backend");
            return Ok(Arc::new(StubAudioModel::new()));
        }
        let r = resolve(config, &AUDIO_DEFAULTS);
        Self::log_backend("audio_emotion", config, &r);
        let model = HttpAudioEmotionModel::new(r.endpoint, r.model, r.api_key, r.timeout_secs)?;
        Ok(Arc::new(model))
    }

    async fn text_emotion(&self) -> Result<Arc<dyn TextEmotionModel>, BackendError> {
        let config = &self.models.text_emotion;
        if config.backend == BackendKind::Stub {
            info!("Using stub text emotion backend");
            return Ok(Arc::new(StubTextModel::new()));
        }
        let r = resolve(config, &TEXT_DEFAULTS);
        Self::log_backend("text_emotion", config, &r);
        let model = HttpTextEmotionModel::new(r.endpoint, r.model, r.api_key, r.timeout_secs)?;
        Ok(Arc::new(model))
    }

    async fn speech(&self) -> Result<Arc<dyn SpeechModel>, BackendError> {
        let config = &self.models.speech;
        if config.backend == BackendKind::Stub {
            info!("Using stub speech backend");
            return Ok(Arc::new(StubSpeechModel::new()));
        }
        let r = resolve(config, &SPEECH_DEFAULTS);
        Self::log_backend("speech", config, &r);
        let model = HttpSpeechModel::new(r.endpoint, r.model, r.api_key, r.timeout_secs)?;
        Ok(Arc::new(model))
    }

    async fn language_model(&self) -> Result<Arc<dyn LanguageModel>, BackendError> {
        let config = &self.models.llm;
        if config.backend == BackendKind::Stub {
            info!("Using stub language model backend");
            return Ok(Arc::new(StubLanguageModel::new()));
        }
        let r = resolve(config, &LLM_DEFAULTS);
        Self::log_backend("language_model", config, &r);
        let model = HttpLanguageModel::new(r.endpoint, r.model, r.api_key, r.timeout_secs)?;
        Ok(Arc::new(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_config_builds_http_backends() {
        let factory = BackendFactory::new(ModelsConfig::default());

        assert_eq!(factory.audio_emotion().await.unwrap().name(), DEFAULT_AUDIO_EMOTION_MODEL);
        assert_eq!(factory.speech().await.unwrap().name(), DEFAULT_SPEECH_MODEL);
        assert_eq!(factory.language_model().await.unwrap().name(), DEFAULT_LLM_MODEL);
    }

    #[tokio::test]
    async fn invalid_endpoint_is_config_error() {
        let mut models = ModelsConfig::default();
        models.speech.endpoint = Some("not a url".to_string());
        let factory = BackendFactory::new(models);

        assert!(matches!(factory.speech().await, Err(BackendError::Config(_))));
    }

    #[tokio::test]
    async fn stub_backend_selected_by_config() {
        let mut models = ModelsConfig::default();
        models.text_emotion.backend = BackendKind::Stub;
        let factory = BackendFactory::new(models);

        assert_eq!(factory.text_emotion().await.unwrap().name(), "stub-text-emotion");
    }
}
