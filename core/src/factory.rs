//! GET-only controller factory with bindable defaults.
//!
//! A `GetFactory` binds the transport, base URL, headers and hooks once and
//! stamps out controllers per endpoint. Callbacks can be overridden for a
//! single controller without touching the bound defaults.

use std::sync::Arc;

use crate::config::FetchOptions;
use crate::controller::FetchController;
use crate::hooks::Hooks;
use crate::http::{HttpMethod, RequestOptions, Transport};
use crate::reconcile::Overrides;

pub struct GetFactory<T> {
    transport: Arc<dyn Transport>,
    base_url: String,
    headers: Vec<(String, String)>,
    hooks: Hooks<T>,
    lazy: bool,
    discard_stale_runs: bool,
}

impl<T> GetFactory<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(transport: Arc<dyn Transport>, hooks: Hooks<T>) -> Self {
        Self {
            transport,
            base_url: String::new(),
            headers: Vec::new(),
            hooks,
            lazy: false,
            discard_stale_runs: false,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Controllers built from here wait for their first `do_get`.
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn discard_stale_runs(mut self, discard: bool) -> Self {
        self.discard_stale_runs = discard;
        self
    }

    /// Builds a controller for `call.endpoint` (default `/`) with
    /// `call.query`. Callbacks in `call` replace the bound ones for this
    /// controller only; extra headers are layered over the bound headers.
    /// Any body in `call` is ignored.
    pub fn get(&self, call: Overrides<T>) -> FetchController<T> {
        let mut options = FetchOptions {
            base_url: self.base_url.clone(),
            lazy: self.lazy,
            discard_stale_runs: self.discard_stale_runs,
            ..FetchOptions::default()
        };
        if let Some(endpoint) = call.endpoint.filter(|e| !e.is_empty()) {
            options.endpoint = endpoint;
        }
        if let Some(query) = call.query {
            options.query = query;
        }

        let bound = RequestOptions {
            method: None,
            headers: self.headers.clone(),
        };
        let per_call = call.options.unwrap_or_default();
        options.options = bound.merge(&per_call).method(HttpMethod::Get);

        let hooks = self
            .hooks
            .overridden(call.on_completed.as_ref(), call.on_error.as_ref());
        FetchController::new(options, hooks, Arc::clone(&self.transport))
    }
}
