//! Per-controller behaviour: body parsing, response extraction, formatting,
//! and the success/failure callbacks.
//!
//! # Design
//! Each hook is an `Arc`'d closure so a `Hooks` value can be cloned into
//! every spawned pipeline run. Callbacks default to the `noop` and
//! `noop_error` sentinels rather than being optional.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ErrorInfo, FetchError};
use crate::http::HttpResponse;

pub type BodyParser = Arc<dyn Fn(&Value) -> Result<String, FetchError> + Send + Sync>;
pub type Extractor = Arc<dyn Fn(&HttpResponse) -> Result<Value, FetchError> + Send + Sync>;
pub type Formatter<T> = Arc<dyn Fn(Value) -> Result<T, FetchError> + Send + Sync>;
pub type OnCompleted<T> = Arc<dyn Fn(&T) + Send + Sync>;
pub type OnError = Arc<dyn Fn(&ErrorInfo) + Send + Sync>;

/// Default success callback. Does nothing.
pub fn noop<T>(_: &T) {}

/// Default failure callback. Does nothing.
pub fn noop_error(_: &ErrorInfo) {}

/// Default body parser: JSON serialization.
pub fn json_body(body: &Value) -> Result<String, FetchError> {
    serde_json::to_string(body).map_err(|e| FetchError::BodySerialization(e.to_string()))
}

/// Default extractor: parse the response body as JSON.
pub fn json_extractor(response: &HttpResponse) -> Result<Value, FetchError> {
    response
        .json()
        .map_err(|e| FetchError::Extraction(e.to_string()))
}

/// Default formatter: deserialize the extracted JSON into `T`.
pub fn deserialize<T: DeserializeOwned>(value: Value) -> Result<T, FetchError> {
    serde_json::from_value(value).map_err(|e| FetchError::Extraction(e.to_string()))
}

pub struct Hooks<T> {
    pub body_parser: BodyParser,
    pub extractor: Extractor,
    pub formatter: Formatter<T>,
    pub on_completed: OnCompleted<T>,
    pub on_error: OnError,
}

impl<T: 'static> Hooks<T> {
    /// Hooks with a custom formatter and every other hook at its default.
    pub fn with_formatter<F>(formatter: F) -> Self
    where
        F: Fn(Value) -> Result<T, FetchError> + Send + Sync + 'static,
    {
        Self {
            body_parser: Arc::new(json_body),
            extractor: Arc::new(json_extractor),
            formatter: Arc::new(formatter),
            on_completed: Arc::new(noop::<T>),
            on_error: Arc::new(noop_error),
        }
    }

    pub fn formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(Value) -> Result<T, FetchError> + Send + Sync + 'static,
    {
        self.formatter = Arc::new(formatter);
        self
    }

    pub fn body_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(&Value) -> Result<String, FetchError> + Send + Sync + 'static,
    {
        self.body_parser = Arc::new(parser);
        self
    }

    pub fn extractor<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&HttpResponse) -> Result<Value, FetchError> + Send + Sync + 'static,
    {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn on_completed<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.on_completed = Arc::new(callback);
        self
    }

    /// Alias of `on_completed`.
    pub fn on_success<F>(self, callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.on_completed(callback)
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ErrorInfo) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(callback);
        self
    }

    /// Alias of `on_error`.
    pub fn on_failure<F>(self, callback: F) -> Self
    where
        F: Fn(&ErrorInfo) + Send + Sync + 'static,
    {
        self.on_error(callback)
    }

    /// Copy of these hooks with the given callbacks swapped in.
    pub(crate) fn overridden(
        &self,
        on_completed: Option<&OnCompleted<T>>,
        on_error: Option<&OnError>,
    ) -> Self {
        Self {
            body_parser: Arc::clone(&self.body_parser),
            extractor: Arc::clone(&self.extractor),
            formatter: Arc::clone(&self.formatter),
            on_completed: Arc::clone(on_completed.unwrap_or(&self.on_completed)),
            on_error: Arc::clone(on_error.unwrap_or(&self.on_error)),
        }
    }
}

impl<T: DeserializeOwned + 'static> Default for Hooks<T> {
    fn default() -> Self {
        Self::with_formatter(deserialize::<T>)
    }
}

impl<T: 'static> Clone for Hooks<T> {
    fn clone(&self) -> Self {
        self.overridden(None, None)
    }
}

impl<T> fmt::Debug for Hooks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}
