//! The public entry point: owns the request parameters and lifecycle state
//! of one fetch, runs the pipeline when the parameters change, and exposes
//! the refetch trigger.
//!
//! # Design
//! Parameters live behind an `Arc` that is swapped, never mutated, on each
//! refetch. `on_parameters_changed` compares that `Arc` by identity with the
//! last one it saw and spawns a pipeline run only on a change, so a host may
//! call it as often as it re-renders. State is published through a
//! `tokio::sync::watch` channel; every lifecycle event is applied inside
//! `send_modify`, so readers never observe a half-applied transition.
//!
//! Overlapping runs are not serialized. Without `discard_stale_runs` the
//! last event to be committed wins, even when it comes from an older run.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, Instrument};

use crate::config::FetchOptions;
use crate::hooks::{Hooks, OnCompleted, OnError};
use crate::http::{HttpMethod, RequestOptions, Transport};
use crate::pipeline;
use crate::reconcile::{next_parameters, Overrides};
use crate::state::{LifecycleAction, LifecycleState};
use crate::types::RequestParameters;

/// Refetch trigger handed out by `FetchController::snapshot`.
pub type Refetch<T> = Box<dyn Fn(Overrides<T>) + Send + Sync>;

/// Per-call overrides stored next to the parameters they were given with.
struct CallOverrides<T> {
    options: Option<RequestOptions>,
    on_completed: Option<OnCompleted<T>>,
    on_error: Option<OnError>,
}

impl<T> Default for CallOverrides<T> {
    fn default() -> Self {
        Self {
            options: None,
            on_completed: None,
            on_error: None,
        }
    }
}

/// Parameters and the last parameters a run was considered for. Both sit
/// under one lock so storing, comparing and numbering runs stay in order.
struct Current<T> {
    params: Arc<RequestParameters>,
    call: Arc<CallOverrides<T>>,
    observed: Option<Arc<RequestParameters>>,
}

/// A run claimed under the `current` lock, not yet spawned.
struct PendingRun<T> {
    run: u64,
    params: Arc<RequestParameters>,
    call: Arc<CallOverrides<T>>,
}

struct Inner<T> {
    hooks: Hooks<T>,
    options: RequestOptions,
    skip: bool,
    discard_stale_runs: bool,
    transport: Arc<dyn Transport>,
    runtime: Handle,
    current: Mutex<Current<T>>,
    runs: AtomicU64,
    state: watch::Sender<LifecycleState<T>>,
}

impl<T> Inner<T> {
    /// Marks the current parameters as observed and claims the next run
    /// number if they changed and fetching is not suppressed.
    fn claim_run(&self, current: &mut Current<T>) -> Option<PendingRun<T>> {
        if current
            .observed
            .as_ref()
            .is_some_and(|seen| Arc::ptr_eq(seen, &current.params))
        {
            return None;
        }
        current.observed = Some(Arc::clone(&current.params));

        if self.skip || current.params.lazy {
            debug!(skip = self.skip, lazy = current.params.lazy, "automatic fetch suppressed");
            return None;
        }
        Some(PendingRun {
            run: self.runs.fetch_add(1, Ordering::SeqCst) + 1,
            params: Arc::clone(&current.params),
            call: Arc::clone(&current.call),
        })
    }

    fn commit(&self, run: u64, action: LifecycleAction<T>) {
        if self.discard_stale_runs && run != self.runs.load(Ordering::SeqCst) {
            debug!(run, action = action.kind(), "discarding event from superseded run");
            return;
        }
        self.state.send_modify(|state| state.reduce(action));
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives requests for one consumer.
///
/// Cheap to clone; clones share parameters and state.
pub struct FetchController<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for FetchController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for FetchController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchController")
            .field("params", &lock(&self.inner.current).params)
            .field("skip", &self.inner.skip)
            .field("runs", &self.inner.runs.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<T> FetchController<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a controller with no initial data. See `with_data`.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime. Runs are spawned on that
    /// runtime, so `refetch` may later be called from any thread.
    pub fn new(options: FetchOptions, hooks: Hooks<T>, transport: Arc<dyn Transport>) -> Self {
        Self::with_data(options, hooks, transport, None)
    }

    /// Creates a controller whose state starts as `{data, error: None,
    /// is_loading: false}` and immediately runs the first fetch unless
    /// `lazy` or `skip` is set.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn with_data(
        options: FetchOptions,
        hooks: Hooks<T>,
        transport: Arc<dyn Transport>,
        data: Option<T>,
    ) -> Self {
        let (state, _) = watch::channel(LifecycleState::new(data));
        let controller = Self {
            inner: Arc::new(Inner {
                hooks,
                options: options.options.clone(),
                skip: options.skip,
                discard_stale_runs: options.discard_stale_runs,
                transport,
                runtime: Handle::current(),
                current: Mutex::new(Current {
                    params: Arc::new(options.parameters()),
                    call: Arc::new(CallOverrides::default()),
                    observed: None,
                }),
                runs: AtomicU64::new(0),
                state,
            }),
        };
        controller.on_parameters_changed();
        controller
    }

    /// Runs the pipeline if the parameters changed since the last call.
    ///
    /// Returns the handle of the spawned run, or `None` when the parameters
    /// are unchanged or fetching is suppressed by `skip`/`lazy`.
    pub fn on_parameters_changed(&self) -> Option<JoinHandle<()>> {
        let pending = self.inner.claim_run(&mut lock(&self.inner.current))?;
        Some(self.spawn_run(pending))
    }

    /// Replaces the parameters according to `overrides` and triggers a run.
    ///
    /// The outcome is observed through `state` or `subscribe`.
    pub fn refetch(&self, overrides: Overrides<T>) {
        let pending = {
            let mut current = lock(&self.inner.current);
            let next = next_parameters(&current.params, &overrides);
            info!(endpoint = %next.endpoint, query = ?next.query, "refetch requested");
            current.params = Arc::new(next);
            current.call = Arc::new(CallOverrides {
                options: overrides.options,
                on_completed: overrides.on_completed,
                on_error: overrides.on_error,
            });
            self.inner.claim_run(&mut current)
        };
        if let Some(pending) = pending {
            self.spawn_run(pending);
        }
    }

    /// `refetch` with the method pinned to GET.
    pub fn do_get(&self, mut overrides: Overrides<T>) {
        let options = overrides.options.take().unwrap_or_default();
        overrides.options = Some(options.method(HttpMethod::Get));
        self.refetch(overrides);
    }

    /// The last committed lifecycle state.
    pub fn state(&self) -> LifecycleState<T> {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified after every committed lifecycle event.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState<T>> {
        self.inner.state.subscribe()
    }

    pub fn parameters(&self) -> Arc<RequestParameters> {
        Arc::clone(&lock(&self.inner.current).params)
    }

    /// Current state together with a refetch trigger.
    pub fn snapshot(&self) -> (LifecycleState<T>, Refetch<T>) {
        let controller = self.clone();
        (
            self.state(),
            Box::new(move |overrides| controller.refetch(overrides)),
        )
    }

    fn spawn_run(&self, pending: PendingRun<T>) -> JoinHandle<()> {
        let PendingRun { run, params, call } = pending;
        let inner = Arc::clone(&self.inner);
        let span = info_span!("pipeline_run", run, endpoint = %params.endpoint);

        self.inner.runtime.spawn(
            async move {
                let hooks = inner
                    .hooks
                    .overridden(call.on_completed.as_ref(), call.on_error.as_ref());
                let options = match &call.options {
                    Some(per_call) => inner.options.merge(per_call),
                    None => inner.options.clone(),
                };
                pipeline::run(
                    &params,
                    &options,
                    &hooks,
                    inner.transport.as_ref(),
                    |action| inner.commit(run, action),
                )
                .await;
            }
            .instrument(span),
        )
    }
}
