//! Declarative HTTP request orchestration core.
//!
//! # Overview
//! A `FetchController` holds the parameters of one request (base URL,
//! endpoint, query, body), runs it through the pipeline, and publishes a
//! `{data, error, is_loading}` snapshot. Callers trigger follow-up requests
//! with `refetch`, passing only the fields that change.
//!
//! # Design
//! - Host-does-IO: the core never opens a socket. It builds `HttpRequest`
//!   values and hands them to a host-supplied `Transport`.
//! - The lifecycle reducer (`state`), the URL builder and the reconciliation
//!   rules are pure and tested without a runtime.
//! - Every failure inside a pipeline run is folded into the lifecycle state;
//!   only `LifecycleState::dispatch` returns an error to its caller.

pub mod config;
pub mod controller;
pub mod error;
pub mod factory;
pub mod hooks;
pub mod http;
pub mod pipeline;
pub mod reconcile;
pub mod state;
pub mod types;
pub mod url_builder;

#[cfg(test)]
mod test_support;

pub use config::FetchOptions;
pub use controller::{FetchController, Refetch};
pub use error::{ActionError, ErrorInfo, FetchError, TransportError, REQUEST_ERROR_MESSAGE};
pub use factory::GetFactory;
pub use hooks::Hooks;
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestOptions, Transport};
pub use reconcile::{next_parameters, reconcile_query, Overrides};
pub use state::{LifecycleAction, LifecycleState, RawAction};
pub use types::{Query, RequestParameters};
pub use url_builder::build_url;

/// Re-exported so hosts can implement `Transport` without a direct
/// dependency.
pub use async_trait::async_trait;
