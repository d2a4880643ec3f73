//! Construction-time request settings.
//!
//! Everything a controller needs that is plain data lives here and can be
//! loaded from JSON. Behaviour (parsers, callbacks) is configured separately
//! through `Hooks`.

use serde::Deserialize;
use serde_json::Value;

use crate::http::RequestOptions;
use crate::types::{Query, RequestParameters};

fn default_endpoint() -> String {
    "/".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchOptions {
    pub base_url: String,
    pub endpoint: String,
    pub query: Query,
    pub body: Option<Value>,
    /// Raw transport options. The method falls back to GET.
    pub options: RequestOptions,
    /// Don't fetch until the first refetch.
    pub lazy: bool,
    /// Never fetch automatically.
    pub skip: bool,
    /// Drop commits from runs superseded by a newer one.
    pub discard_stale_runs: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            endpoint: default_endpoint(),
            query: Query::new(),
            body: None,
            options: RequestOptions::default(),
            lazy: false,
            skip: false,
            discard_stale_runs: false,
        }
    }
}

impl FetchOptions {
    pub fn new(base_url: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    pub fn discard_stale_runs(mut self, discard: bool) -> Self {
        self.discard_stale_runs = discard;
        self
    }

    /// Initial request parameters. An empty endpoint falls back to `/`.
    pub fn parameters(&self) -> RequestParameters {
        let endpoint = if self.endpoint.is_empty() {
            default_endpoint()
        } else {
            self.endpoint.clone()
        };
        RequestParameters {
            base_url: self.base_url.clone(),
            endpoint,
            query: self.query.clone(),
            body: self.body.clone(),
            lazy: self.lazy,
        }
    }
}
