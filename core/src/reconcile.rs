//! Computes the next request parameters for a refetch.
//!
//! The query is never merged: it is replaced, reset or retained as a whole,
//! so parameters do not accumulate over repeated refetches.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ErrorInfo;
use crate::hooks::{OnCompleted, OnError};
use crate::http::RequestOptions;
use crate::types::{Query, RequestParameters};

/// Partial overrides accepted by `refetch` and `do_get`.
///
/// Callbacks and transport options apply to the triggered run only.
pub struct Overrides<T> {
    pub endpoint: Option<String>,
    pub query: Option<Query>,
    pub body: Option<Value>,
    pub options: Option<RequestOptions>,
    pub on_completed: Option<OnCompleted<T>>,
    pub on_error: Option<OnError>,
}

impl<T> Default for Overrides<T> {
    fn default() -> Self {
        Self {
            endpoint: None,
            query: None,
            body: None,
            options: None,
            on_completed: None,
            on_error: None,
        }
    }
}

impl<T> Overrides<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn on_completed<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
        T: 'static,
    {
        self.on_completed = Some(Arc::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ErrorInfo) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// The endpoint override, treating an empty string as absent.
    fn requested_endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref().filter(|e| !e.is_empty())
    }
}

impl<T> fmt::Debug for Overrides<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overrides")
            .field("endpoint", &self.endpoint)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("options", &self.options)
            .field("on_completed", &self.on_completed.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Resolves the query for the next request.
///
/// - a new endpoint with no query at all resets to empty;
/// - a non-empty query replaces the previous one outright;
/// - anything else keeps the previous query.
pub fn reconcile_query(
    requested_endpoint: Option<&str>,
    requested_query: Option<&Query>,
    previous: &Query,
) -> Query {
    match (requested_endpoint, requested_query) {
        (Some(_), None) => Query::new(),
        (_, Some(query)) if !query.is_empty() => query.clone(),
        _ => previous.clone(),
    }
}

/// Builds the parameters for the next run. Always clears `lazy`.
pub fn next_parameters<T>(previous: &RequestParameters, overrides: &Overrides<T>) -> RequestParameters {
    let endpoint = overrides.requested_endpoint();
    RequestParameters {
        base_url: previous.base_url.clone(),
        endpoint: endpoint.unwrap_or(previous.endpoint.as_str()).to_string(),
        query: reconcile_query(endpoint, overrides.query.as_ref(), &previous.query),
        body: overrides.body.clone(),
        lazy: false,
    }
}
