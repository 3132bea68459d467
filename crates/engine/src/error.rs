use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// This defines the error types used in the engine for handling connector calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The script could not be turned into a usable connector.
    ///
    /// Returned when the script fails to execute or when `name` / `base_url`
    /// are missing or malformed. No connector is created.
    #[error("failed to load connector {path}: {message}")]
    Load {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<mlua::Error>,
    },

    /// An entry point returned a value of the wrong shape.
    ///
    /// Fatal to the current call only; the connector stays usable.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The described HTTP call could not be performed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A fault raised inside the script while running an entry point.
    ///
    /// Lua errors are always caught at the call boundary and reported here.
    #[error("script error in `{entry_point}`: {source}")]
    ScriptRuntime {
        entry_point: String,
        #[source]
        source: mlua::Error,
    },
}

impl Error {
    pub(crate) fn load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Load {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn script(entry_point: impl Into<String>, source: mlua::Error) -> Self {
        Error::ScriptRuntime {
            entry_point: entry_point.into(),
            source,
        }
    }
}

/// Shape violations in values exchanged with a connector.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("entry point `{0}` is not defined")]
    MissingEntryPoint(String),

    #[error("`{entry_point}` returned {found}, expected {expected}")]
    UnexpectedValue {
        entry_point: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("request descriptor from `{entry_point}` is missing `{field}`")]
    MissingField {
        entry_point: String,
        field: &'static str,
    },

    #[error("invalid header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid request method `{0}`")]
    InvalidMethod(String),

    #[error("invalid request url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Connect,
    Timeout,
    Body,
    Request,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportErrorKind::Connect => write!(f, "connection failed"),
            TransportErrorKind::Timeout => write!(f, "timed out"),
            TransportErrorKind::Body => write!(f, "failed to read body"),
            TransportErrorKind::Request => write!(f, "request failed"),
        }
    }
}

/// Network level failure while performing a described request.
#[derive(Debug, thiserror::Error)]
#[error("{kind} for {url}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub url: String,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            message: message.into(),
        }
    }
}
