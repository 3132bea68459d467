//! Host side of the request protocol: turning a descriptor into a concrete
//! request and handing it to a transport.

mod executor;
mod reqwest;

use std::collections::HashSet;
use std::fmt;

use url::Url;

use crate::error::ProtocolError;
use crate::protocol::RequestDescriptor;
use crate::session::{self, SessionHeaders};

pub use self::executor::HttpExecutor;
pub use self::reqwest::ReqwestExecutor;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const USER_AGENT: &str = "User-Agent";
const MULTIPART_FORM_DATA: &str = "multipart/form-data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
            Method::Delete => write!(f, "DELETE"),
            Method::Patch => write!(f, "PATCH"),
            Method::Head => write!(f, "HEAD"),
            Method::Options => write!(f, "OPTIONS"),
        }
    }
}

impl std::str::FromStr for Method {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            _ => Err(ProtocolError::InvalidMethod(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    /// Sent verbatim.
    Text(String),
    /// Encoded by the transport, which also sets the boundary-bearing `Content-Type`.
    Multipart(Vec<(String, String)>),
}

/// A fully resolved request, ready for an [`HttpExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: SessionHeaders,
    pub body: RequestBody,
}

/// Resolve a descriptor against the connector's session state.
///
/// Header precedence, highest first: the descriptor's own `header` table,
/// then `session`, then the default `User-Agent`. A `multipart/form-data`
/// content type turns a `data` table, empty or not, into form fields; any
/// other content type leaves `data` alone and only a literal `body` is sent.
///
/// Descriptor header names must be valid and must not repeat under different
/// casing.
pub fn build_request(
    descriptor: RequestDescriptor,
    session: &SessionHeaders,
    user_agent: &str,
) -> Result<HttpRequest, ProtocolError> {
    let method = descriptor.method.parse::<Method>()?;
    let url = Url::parse(&descriptor.url).map_err(|source| ProtocolError::InvalidUrl {
        url: descriptor.url.clone(),
        source,
    })?;

    let mut headers = SessionHeaders::new();
    headers.replace(USER_AGENT, vec![user_agent.to_string()])?;
    headers.overlay(session);

    let mut seen = HashSet::new();
    for (name, _) in &descriptor.header {
        if !seen.insert(session::parse_name(name)?) {
            return Err(ProtocolError::InvalidHeader {
                name: name.clone(),
                reason: "set more than once with different casing".to_string(),
            });
        }
    }
    headers.apply(
        descriptor
            .header
            .into_iter()
            .map(|(name, value)| (name, vec![value])),
    )?;

    let is_multipart = headers
        .first(CONTENT_TYPE)
        .as_deref()
        .and_then(|content_type| content_type.split(';').next())
        .is_some_and(|media_type| media_type.trim().eq_ignore_ascii_case(MULTIPART_FORM_DATA));

    let body = match descriptor.data {
        Some(fields) if is_multipart => {
            headers.remove(CONTENT_TYPE);
            RequestBody::Multipart(fields)
        }
        _ => descriptor
            .body
            .map(RequestBody::Text)
            .unwrap_or(RequestBody::Empty),
    };

    Ok(HttpRequest {
        method,
        url,
        headers,
        body,
    })
}
