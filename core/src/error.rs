//! Error types for the request pipeline and the lifecycle reducer.
//!
//! # Design
//! Every failure a pipeline run can hit lands in `FetchError`. The pipeline
//! never lets one escape: it is converted into an `ErrorInfo` and committed
//! to the lifecycle state. `ActionError` is different. It signals a caller
//! feeding the reducer an event it does not understand, and is returned to
//! that caller instead of being folded into state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Message used for every non-2xx response.
pub const REQUEST_ERROR_MESSAGE: &str = "There has been a problem with your fetch operation";

/// The host's `send` call failed before a response was received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("transport failed: {message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors produced while executing one pipeline run.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The base URL or endpoint could not be resolved into an absolute URL.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The transport could not deliver the request.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response arrived but its status is outside 2xx.
    #[error("{}", REQUEST_ERROR_MESSAGE)]
    HttpStatus { code: u16 },

    /// The body parser rejected the request body.
    #[error("could not serialize request body: {0}")]
    BodySerialization(String),

    /// The extractor or formatter rejected the response.
    #[error("could not extract response: {0}")]
    Extraction(String),

    /// The success callback panicked.
    #[error("completion callback panicked: {0}")]
    Callback(String),
}

impl FetchError {
    /// Short tag stored under `kind` in `ErrorInfo::extra`.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Url(_) => "url",
            FetchError::Transport(_) => "transport",
            FetchError::HttpStatus { .. } => "http_status",
            FetchError::BodySerialization(_) => "body",
            FetchError::Extraction(_) => "extraction",
            FetchError::Callback(_) => "callback",
        }
    }
}

/// Failure details exposed through `LifecycleState::error` and `on_error`.
///
/// `code` is only set for status failures. Additional fields are flattened
/// next to `message` and `code` when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            extra: Map::new(),
        }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    /// Returns the `kind` tag, if one was recorded.
    pub fn kind(&self) -> Option<&str> {
        self.extra.get("kind").and_then(Value::as_str)
    }
}

impl From<&FetchError> for ErrorInfo {
    fn from(err: &FetchError) -> Self {
        let mut info = ErrorInfo::new(err.to_string());
        if let FetchError::HttpStatus { code } = err {
            info.code = Some(*code);
        }
        info.extra
            .insert("kind".to_string(), Value::String(err.kind().to_string()));
        info
    }
}

impl From<FetchError> for ErrorInfo {
    fn from(err: FetchError) -> Self {
        ErrorInfo::from(&err)
    }
}

/// Rejections from `LifecycleState::dispatch`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    /// The event type is not one of `FETCH_INIT`, `FETCH_SUCCESS`,
    /// `FETCH_FAILURE`.
    #[error("action does not exist for the lifecycle reducer: {0}")]
    UnknownAction(String),

    /// A known event type arrived without the field it carries.
    #[error("{kind} action is missing its {field}")]
    Incomplete {
        kind: &'static str,
        field: &'static str,
    },
}
