//! Test application built on stub model backends

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use edugame_ai::backends::stub::StubModelFactory;
use edugame_ai::config::ServiceConfig;
use edugame_ai::services::{AgentSettings, ModelRegistry, PedagogicalRecommender};
use edugame_ai::AppState;
use http_body_util::BodyExt;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const BOUNDARY: &str = "edugame-test-boundary";

/// Router plus handles the tests inspect
pub struct TestApp {
    pub router: Router,
    pub factory: Arc<StubModelFactory>,
    pub registry: Arc<ModelRegistry>,
    /// Upload temp directory; empty whenever no request is in flight
    pub temp_dir: TempDir,
}

impl TestApp {
    pub fn new(factory: StubModelFactory) -> Self {
        Self::with_config(factory, |_| {})
    }

    pub fn with_config(factory: StubModelFactory, adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let mut config = ServiceConfig::default();
        config.temp_dir = Some(temp_dir.path().to_path_buf());
        adjust(&mut config);

        let factory = Arc::new(factory);
        let registry = Arc::new(ModelRegistry::new(
            factory.clone(),
            Arc::new(PedagogicalRecommender::builtin().expect("builtin table")),
            config.transcriber_settings(),
            AgentSettings::default(),
        ));
        let state = AppState::new(registry.clone(), Arc::new(config));

        Self {
            router: edugame_ai::build_router(state),
            factory,
            registry,
            temp_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub fn temp_files(&self) -> usize {
        count_files(self.temp_dir.path())
    }
}

pub fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// One part of a multipart body
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        filename: &'a str,
        content_type: Option<&'a str>,
        data: &'a [u8],
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                if let Some(content_type) = content_type {
                    body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
                }
                body.extend_from_slice(b"\r\n");
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn post_multipart(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

/// Multipart request with one WAV `audio_file` part plus text fields
pub fn post_wav(uri: &str, wav: &[u8], fields: &[(&str, &str)]) -> Request<Body> {
    let mut parts = vec![Part::File {
        name: "audio_file",
        filename: "clip.wav",
        content_type: Some("audio/wav"),
        data: wav,
    }];
    parts.extend(fields.iter().map(|(name, value)| Part::Text(name, value)));
    post_multipart(uri, &parts)
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        panic!(
            "response is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&bytes)
        )
    })
}
