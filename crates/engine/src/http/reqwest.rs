use std::time::Duration;

use async_trait::async_trait;

use super::{HttpExecutor, HttpRequest, Method, RequestBody};
use crate::error::{TransportError, TransportErrorKind};
use crate::protocol::ResponseEnvelope;
use crate::session::SessionHeaders;

/// Default transport, backed by a shared [`reqwest::Client`].
pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl Default for ReqwestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestExecutor {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a client whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::new(TransportErrorKind::Request, "", e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    #[tracing::instrument(skip_all, fields(method = %request.method, url = %request.url))]
    async fn execute(&self, request: HttpRequest) -> Result<ResponseEnvelope, TransportError> {
        let url = request.url.to_string();
        let mut builder = self
            .client
            .request(request.method.into(), request.url)
            .headers(request.headers.into_map());

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Text(body) => builder.body(body),
            RequestBody::Multipart(fields) => builder.multipart(create_multipart(fields)),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        map_response(&url, response).await
    }
}

fn create_multipart(fields: Vec<(String, String)>) -> reqwest::multipart::Form {
    fields
        .into_iter()
        .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
            form.text(name, value)
        })
}

impl From<Method> for reqwest::Method {
    fn from(value: Method) -> Self {
        match value {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
            Method::Head => reqwest::Method::HEAD,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }
}

async fn map_response(
    url: &str,
    value: reqwest::Response,
) -> Result<ResponseEnvelope, TransportError> {
    let status = value.status().as_u16();
    let header = SessionHeaders::from(value.headers().clone());

    let body = value
        .text()
        .await
        .map_err(|e| TransportError::new(TransportErrorKind::Body, url, e.to_string()))?;

    tracing::debug!(status, bytes = body.len(), "received response");

    Ok(ResponseEnvelope {
        status,
        header,
        body,
    })
}

fn transport_error(url: &str, value: reqwest::Error) -> TransportError {
    let kind = if value.is_timeout() {
        TransportErrorKind::Timeout
    } else if value.is_connect() {
        TransportErrorKind::Connect
    } else if value.is_body() || value.is_decode() {
        TransportErrorKind::Body
    } else {
        TransportErrorKind::Request
    };
    TransportError::new(kind, url, value.to_string())
}
