//! One request cycle: build → send → parse → callback → commit.
//!
//! # Design
//! Split the same way as a host-does-IO client. `build_request` and
//! `parse_response` are pure and return `Result<_, FetchError>`; only
//! `Transport::send` touches the outside world. `run` is the single place
//! where a `FetchError` is turned into an `ErrorInfo` and committed, so no
//! failure of any stage escapes a run.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::error::{ErrorInfo, FetchError};
use crate::hooks::Hooks;
use crate::http::{HttpRequest, HttpResponse, RequestOptions, Transport};
use crate::state::LifecycleAction;
use crate::types::RequestParameters;
use crate::url_builder::build_url;

/// Turns parameters and merged options into a transport request.
///
/// The body parser only runs when a body is present.
pub fn build_request<T>(
    params: &RequestParameters,
    options: &RequestOptions,
    hooks: &Hooks<T>,
) -> Result<HttpRequest, FetchError> {
    let body = params
        .present_body()
        .map(|body| (hooks.body_parser)(body))
        .transpose()?;
    let url = build_url(&params.base_url, &params.endpoint, &params.query)?;

    Ok(HttpRequest {
        method: options.effective_method(),
        url,
        headers: options.headers.clone(),
        body,
    })
}

/// Validates the status, then extracts and formats the payload.
pub fn parse_response<T>(response: &HttpResponse, hooks: &Hooks<T>) -> Result<T, FetchError> {
    if !response.is_success() {
        return Err(FetchError::HttpStatus {
            code: response.status,
        });
    }
    let raw = (hooks.extractor)(response)?;
    (hooks.formatter)(raw)
}

/// Executes the request stages and returns the formatted payload.
pub async fn execute<T>(
    params: &RequestParameters,
    options: &RequestOptions,
    hooks: &Hooks<T>,
    transport: &dyn Transport,
) -> Result<T, FetchError> {
    let request = build_request(params, options, hooks)?;
    debug!(method = request.method.as_str(), url = %request.url, "sending request");

    let response = transport.send(request).await?;
    debug!(status = response.status, "response received");

    parse_response(&response, hooks)
}

/// Runs one full cycle, reporting lifecycle events through `commit`.
///
/// Emits `Init` first and exactly one of `Success`/`Failure` last. The
/// matching callback runs before the final event is committed. A panicking
/// `on_completed` turns the run into a failure; a panicking `on_error` is
/// logged and the failure is still committed.
pub async fn run<T, C>(
    params: &RequestParameters,
    options: &RequestOptions,
    hooks: &Hooks<T>,
    transport: &dyn Transport,
    mut commit: C,
) where
    C: FnMut(LifecycleAction<T>),
{
    commit(LifecycleAction::Init);

    let err = match execute(params, options, hooks, transport).await {
        Ok(payload) => match catch_unwind(AssertUnwindSafe(|| (hooks.on_completed)(&payload))) {
            Ok(()) => {
                commit(LifecycleAction::Success(payload));
                return;
            }
            Err(panic) => FetchError::Callback(panic_message(panic.as_ref())),
        },
        Err(err) => err,
    };

    warn!(error = %err, kind = err.kind(), "request failed");
    let error = ErrorInfo::from(&err);
    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| (hooks.on_error)(&error))) {
        warn!(panic = %panic_message(panic.as_ref()), "error callback panicked");
    }
    commit(LifecycleAction::Failure(error));
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::REQUEST_ERROR_MESSAGE;
    use crate::http::HttpMethod;
    use crate::state::LifecycleState;
    use crate::test_support::ScriptedTransport;
    use crate::types::Query;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    fn params(endpoint: &str, body: Option<Value>) -> RequestParameters {
        RequestParameters {
            base_url: "https://api.test".to_string(),
            endpoint: endpoint.to_string(),
            query: Query::new().with("page", 1),
            body,
            lazy: false,
        }
    }

    async fn run_to_state(
        transport: &ScriptedTransport,
        hooks: &Hooks<Value>,
        initial: Option<Value>,
    ) -> (LifecycleState<Value>, Vec<&'static str>) {
        let mut state = LifecycleState::new(initial);
        let mut events = Vec::new();
        run(
            &params("/items", None),
            &RequestOptions::default(),
            hooks,
            transport,
            |action| {
                events.push(action.kind());
                state.reduce(action);
            },
        )
        .await;
        (state, events)
    }

    #[test]
    fn build_request_defaults_to_get_without_body() {
        let hooks: Hooks<Value> = Hooks::default();
        let req = build_request(&params("/items", None), &RequestOptions::default(), &hooks).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "https://api.test/items?page=1");
        assert!(req.body.is_none());
    }

    #[test]
    fn build_request_serializes_present_body() {
        let hooks: Hooks<Value> = Hooks::default();
        let options = RequestOptions::default()
            .method(HttpMethod::Post)
            .header("content-type", "application/json");
        let req = build_request(&params("/items", Some(json!({"name": "a"}))), &options, &hooks).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.body.as_deref(), Some(r#"{"name":"a"}"#));
        assert_eq!(req.headers.len(), 1);
    }

    #[test]
    fn body_parser_is_skipped_for_falsy_body() {
        let hooks: Hooks<Value> = Hooks::default()
            .body_parser(|_| Err(FetchError::BodySerialization("should not run".to_string())));
        for body in [Value::Null, json!(false), json!(0), json!("")] {
            let req = build_request(&params("/items", Some(body.clone())), &RequestOptions::default(), &hooks);
            assert!(req.unwrap().body.is_none(), "{body}");
        }
    }

    #[test]
    fn parse_response_maps_status_to_code() {
        let hooks: Hooks<Value> = Hooks::default();
        let err = parse_response(&HttpResponse::new(503, "down"), &hooks).unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus { code: 503 }));
    }

    #[tokio::test]
    async fn success_commits_payload() {
        let transport = ScriptedTransport::always(200, r#"{"id":1}"#);
        let hooks = Hooks::default();
        let (state, events) = run_to_state(&transport, &hooks, None).await;

        assert_eq!(events, vec!["FETCH_INIT", "FETCH_SUCCESS"]);
        assert_eq!(state, LifecycleState::new(Some(json!({"id": 1}))));
        assert_eq!(transport.urls(), vec!["https://api.test/items?page=1"]);
    }

    #[tokio::test]
    async fn status_failure_keeps_stale_data() {
        let transport = ScriptedTransport::always(404, "");
        let hooks = Hooks::default();
        let (state, events) = run_to_state(&transport, &hooks, Some(json!("stale"))).await;

        assert_eq!(events, vec!["FETCH_INIT", "FETCH_FAILURE"]);
        let error = state.error.unwrap();
        assert_eq!(error.message, REQUEST_ERROR_MESSAGE);
        assert_eq!(error.code, Some(404));
        assert_eq!(state.data, Some(json!("stale")));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn transport_failure_has_no_code() {
        let transport = ScriptedTransport::failing("connection refused");
        let hooks = Hooks::default();
        let (state, _) = run_to_state(&transport, &hooks, None).await;

        let error = state.error.unwrap();
        assert_eq!(error.code, None);
        assert_eq!(error.kind(), Some("transport"));
    }

    #[tokio::test]
    async fn extraction_failure_is_folded_into_failure() {
        let transport = ScriptedTransport::always(200, "not json");
        let hooks = Hooks::default();
        let (state, events) = run_to_state(&transport, &hooks, None).await;

        assert_eq!(events, vec!["FETCH_INIT", "FETCH_FAILURE"]);
        assert_eq!(state.error.unwrap().kind(), Some("extraction"));
    }

    #[tokio::test]
    async fn url_failure_never_reaches_transport() {
        let transport = ScriptedTransport::always(200, "{}");
        let hooks: Hooks<Value> = Hooks::default();
        let mut state = LifecycleState::new(None);
        let mut bad = params("/items", None);
        bad.base_url = "not a url".to_string();

        run(&bad, &RequestOptions::default(), &hooks, &transport, |a| state.reduce(a)).await;

        assert_eq!(state.error.unwrap().kind(), Some("url"));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn formatter_output_is_the_payload() {
        let transport = ScriptedTransport::always(200, r#"{"items":[1,2,3]}"#);
        let hooks: Hooks<usize> = Hooks::with_formatter(|raw: Value| {
            raw["items"]
                .as_array()
                .map(Vec::len)
                .ok_or_else(|| FetchError::Extraction("missing items".to_string()))
        });
        let mut state = LifecycleState::new(None);
        run(&params("/items", None), &RequestOptions::default(), &hooks, &transport, |a| {
            state.reduce(a)
        })
        .await;
        assert_eq!(state.data, Some(3));
    }

    #[tokio::test]
    async fn callbacks_run_before_final_event() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let on_ok = Arc::clone(&log);
        let on_err = Arc::clone(&log);
        let hooks: Hooks<Value> = Hooks::default()
            .on_completed(move |_: &Value| on_ok.lock().unwrap().push("on_completed".to_string()))
            .on_error(move |_: &ErrorInfo| on_err.lock().unwrap().push("on_error".to_string()));

        for status in [200, 500] {
            let transport = ScriptedTransport::always(status, "{}");
            let events = Arc::clone(&log);
            run(&params("/items", None), &RequestOptions::default(), &hooks, &transport, |a| {
                events.lock().unwrap().push(a.kind().to_string())
            })
            .await;
        }

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "FETCH_INIT",
                "on_completed",
                "FETCH_SUCCESS",
                "FETCH_INIT",
                "on_error",
                "FETCH_FAILURE",
            ]
        );
    }

    #[tokio::test]
    async fn panicking_success_callback_becomes_failure() {
        let transport = ScriptedTransport::always(200, r#"{"id":1}"#);
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let hooks: Hooks<Value> = Hooks::default()
            .on_completed(|_: &Value| panic!("render failed"))
            .on_error(move |e: &ErrorInfo| *sink.lock().unwrap() = e.kind().map(str::to_string));

        let (state, events) = run_to_state(&transport, &hooks, Some(json!("stale"))).await;

        assert_eq!(events, vec!["FETCH_INIT", "FETCH_FAILURE"]);
        assert!(!state.is_loading);
        assert_eq!(state.data, Some(json!("stale")));
        assert!(state.error.unwrap().message.contains("render failed"));
        assert_eq!(seen.lock().unwrap().as_deref(), Some("callback"));
    }

    #[tokio::test]
    async fn panicking_error_callback_still_commits_failure() {
        let transport = ScriptedTransport::always(500, "");
        let hooks: Hooks<Value> =
            Hooks::default().on_error(|_: &ErrorInfo| panic!("logger unavailable"));

        let (state, events) = run_to_state(&transport, &hooks, None).await;

        assert_eq!(events, vec!["FETCH_INIT", "FETCH_FAILURE"]);
        assert!(!state.is_loading);
        assert_eq!(state.error.unwrap().code, Some(500));
    }
}
