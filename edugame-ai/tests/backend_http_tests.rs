//! HTTP backend tests against a mock inference server

use edugame_ai::backends::factory::{BackendFactory, ModelFactory};
use edugame_ai::backends::{
    BackendError, ChatMessage, LabelScore, ModelKind, TranscribeOptions,
};
use edugame_ai::error::ServiceError;
use edugame_ai::services::{AgentSettings, ModelRegistry, PedagogicalRecommender, TranscriberSettings};
use edugame_common::config::{BackendKind, ModelEndpoint, ModelsConfig};
use edugame_common::TranscriptionTask;
use serde_json::json;
use serial_test::serial;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY_ENV: &str = "EDUGAME_TEST_BACKEND_KEY";

fn endpoint(server: &MockServer, suffix: &str, model: &str) -> ModelEndpoint {
    ModelEndpoint {
        backend: BackendKind::Http,
        endpoint: Some(format!("{}{}", server.uri(), suffix)),
        model: Some(model.to_string()),
        api_key_env: Some(KEY_ENV.to_string()),
        timeout_secs: 5,
    }
}

fn factory(models: ModelsConfig) -> BackendFactory {
    BackendFactory::new(models)
}

fn audio_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("clip.wav");
    std::fs::write(&path, b"RIFF\x24\x00\x00\x00WAVEfmt ").unwrap();
    path
}

#[tokio::test]
#[serial]
async fn test_text_classifier_sends_bearer_token() {
    std::env::set_var(KEY_ENV, "hf-test-key");
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/acme/text-emotion"))
        .and(header("authorization", "Bearer hf-test-key"))
        .and(body_partial_json(json!({"inputs": "estoy contento"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([[
            {"label": "joy", "score": 0.91},
            {"label": "sadness", "score": 0.09}
        ]])))
        .expect(1)
        .mount(&server)
        .await;

    let models = ModelsConfig {
        text_emotion: endpoint(&server, "", "acme/text-emotion"),
        ..Default::default()
    };
    let model = factory(models).text_emotion().await.unwrap();
    let scores = model.classify("estoy contento").await.unwrap();

    assert_eq!(
        scores,
        vec![LabelScore::new("joy", 0.91), LabelScore::new("sadness", 0.09)]
    );
    std::env::remove_var(KEY_ENV);
}

#[tokio::test]
#[serial]
async fn test_audio_classifier_posts_raw_audio() {
    std::env::remove_var(KEY_ENV);
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/models/acme/audio-emotion"))
        .and(header("content-type", "audio/wav"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"label": "hap", "score": 0.7},
            {"label": "sad", "score": 0.3}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let models = ModelsConfig {
        audio_emotion: endpoint(&server, "", "acme/audio-emotion"),
        ..Default::default()
    };
    let model = factory(models).audio_emotion().await.unwrap();
    let scores = model.classify(&audio_file(&dir)).await.unwrap();

    assert_eq!(scores.len(), 2);
    assert_eq!(scores[0].label, "hap");
}

#[tokio::test]
#[serial]
async fn test_server_error_maps_to_api_error() {
    std::env::remove_var(KEY_ENV);
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/acme/text-emotion"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model is loading"))
        .mount(&server)
        .await;

    let models = ModelsConfig {
        text_emotion: endpoint(&server, "", "acme/text-emotion"),
        ..Default::default()
    };
    let model = factory(models).text_emotion().await.unwrap();

    match model.classify("hola").await {
        Err(BackendError::Api(status, message)) => {
            assert_eq!(status, 503);
            assert!(message.contains("model is loading"), "{}", message);
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
#[serial]
async fn test_speech_transcription_and_translation_endpoints() {
    std::env::remove_var(KEY_ENV);
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task": "transcribe",
            "language": "spanish",
            "duration": 1.2,
            "text": " hola ",
            "segments": [{"id": 0, "start": 0.0, "end": 1.2, "text": " hola", "no_speech_prob": 0.05}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/audio/translations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "hello",
            "segments": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let models = ModelsConfig {
        speech: endpoint(&server, "/v1", "whisper-test"),
        ..Default::default()
    };
    let model = factory(models).speech().await.unwrap();
    let audio = audio_file(&dir);

    let raw = model
        .transcribe(&audio, &TranscribeOptions::default())
        .await
        .unwrap();
    assert_eq!(raw.text, "hola");
    assert_eq!(raw.language.as_deref(), Some("es"));
    assert_eq!(raw.segments[0].no_speech_prob, Some(0.05));

    let translated = model
        .transcribe(
            &audio,
            &TranscribeOptions {
                language: Some("es".to_string()),
                task: TranscriptionTask::Translate,
            },
        )
        .await
        .unwrap();
    assert_eq!(translated.text, "hello");
    assert!(translated.language.is_none());
}

#[tokio::test]
#[serial]
async fn test_chat_completion_with_tool_calls() {
    std::env::set_var(KEY_ENV, "sk-test");
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "tutor-test", "tool_choice": "auto"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "calculate_adaptive_difficulty",
                            "arguments": "{\"accuracy\": 95}"
                        }
                    }]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let models = ModelsConfig {
        llm: endpoint(&server, "/v1", "tutor-test"),
        ..Default::default()
    };
    let model = factory(models).language_model().await.unwrap();
    let tools = edugame_ai::services::agent::tools::tool_specs();

    let completion = model
        .complete(&[ChatMessage::user("¿Subo de nivel?")], &tools)
        .await
        .unwrap();

    assert!(completion.content.is_none());
    assert_eq!(completion.tool_calls.len(), 1);
    assert_eq!(completion.tool_calls[0].name, "calculate_adaptive_difficulty");
    assert_eq!(completion.tool_calls[0].arguments, "{\"accuracy\": 95}");
    std::env::remove_var(KEY_ENV);
}

#[tokio::test]
#[serial]
async fn test_agent_tool_loop_over_http() {
    std::env::remove_var(KEY_ENV);
    let server = MockServer::start().await;

    // First turn asks for a tool, second answers in text
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": null, "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "recommend_learning_path", "arguments": "{}"}
            }]}}]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "Te recomiendo practicar los colores."}}]
        })))
        .mount(&server)
        .await;

    let models = ModelsConfig {
        llm: endpoint(&server, "/v1", "tutor-test"),
        ..Default::default()
    };
    let registry = ModelRegistry::new(
        Arc::new(factory(models)),
        Arc::new(PedagogicalRecommender::builtin().unwrap()),
        TranscriberSettings::default(),
        AgentSettings::default(),
    );

    let agent = registry.agent().await.unwrap();
    let reply = agent
        .chat("¿Qué estudio ahora?", &edugame_common::UserContext::new("u1"), None)
        .await;

    assert_eq!(reply.response, "Te recomiendo practicar los colores.");
    assert_eq!(reply.suggested_actions, vec!["recommend_learning_path".to_string()]);
    assert_eq!(reply.confidence, 0.85);
}

#[tokio::test]
async fn test_invalid_endpoint_is_model_unavailable() {
    let models = ModelsConfig {
        speech: ModelEndpoint {
            endpoint: Some("ftp://example.com".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let registry = ModelRegistry::new(
        Arc::new(factory(models)),
        Arc::new(PedagogicalRecommender::builtin().unwrap()),
        TranscriberSettings::default(),
        AgentSettings::default(),
    );

    match registry.transcriber().await {
        Err(ServiceError::ModelUnavailable { model, .. }) => assert_eq!(model, ModelKind::Speech),
        other => panic!("expected ModelUnavailable, got {:?}", other.map(|_| ())),
    }
    assert!(registry.failures().contains_key("speech"));
}

#[tokio::test]
async fn test_stub_backend_selected_by_config() {
    let models = ModelsConfig {
        text_emotion: ModelEndpoint {
            backend: BackendKind::Stub,
            ..Default::default()
        },
        ..Default::default()
    };

    let model = factory(models).text_emotion().await.unwrap();
    let scores = model.classify("hola").await.unwrap();
    assert!(!scores.is_empty());
}
