#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tanoshi_engine::http::{HttpExecutor, HttpRequest};
use tanoshi_engine::protocol::ResponseEnvelope;
use tanoshi_engine::{ConnectorEngine, EngineConfig, SessionHeaders, TransportError, TransportErrorKind};

pub fn headers(pairs: &[(&str, &str)]) -> SessionHeaders {
    let mut headers = SessionHeaders::new();
    for (name, value) in pairs {
        headers.replace(name, vec![value.to_string()]).unwrap();
    }
    headers
}

/// Executor that records every request and answers from a table keyed by URL path.
#[derive(Default)]
pub struct RecordingExecutor {
    requests: Mutex<Vec<HttpRequest>>,
    responses: Mutex<HashMap<String, ResponseEnvelope>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn respond(&self, path: &str, body: &str) {
        self.respond_with(path, body, SessionHeaders::new());
    }

    pub fn respond_with(&self, path: &str, body: &str, header: SessionHeaders) {
        self.responses.lock().unwrap().insert(
            path.to_string(),
            ResponseEnvelope {
                status: 200,
                header,
                body: body.to_string(),
            },
        );
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests().pop().expect("no request was executed")
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpExecutor for RecordingExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<ResponseEnvelope, TransportError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let path = request.url.path().to_string();
        self.requests.lock().unwrap().push(request);
        let response = self.responses.lock().unwrap().get(&path).cloned();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(response.unwrap_or_default())
    }
}

/// Executor whose every call fails to connect.
pub struct FailingExecutor;

#[async_trait]
impl HttpExecutor for FailingExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<ResponseEnvelope, TransportError> {
        Err(TransportError::new(
            TransportErrorKind::Connect,
            request.url.as_str(),
            "connection refused",
        ))
    }
}

pub fn engine(executor: Arc<dyn HttpExecutor>) -> ConnectorEngine {
    ConnectorEngine::new(executor, EngineConfig::default())
}

pub const IDENTITY: &str = r#"
function name() return "fixture" end
function base_url() return "https://fixture.test" end
"#;

/// Script text with the fixture identity prepended.
pub fn script(body: &str) -> String {
    format!("{IDENTITY}\n{body}")
}
