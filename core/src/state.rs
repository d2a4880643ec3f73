//! Request lifecycle state machine.
//!
//! # Design
//! The visible state is the `{data, error, is_loading}` triple rather than a
//! phase enum. `LifecycleState::reduce` is a pure transition over typed
//! events. Untyped events (for instance ones decoded from a host message)
//! go through `dispatch`, which refuses anything outside the three known
//! types instead of ignoring it.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ActionError, ErrorInfo};

pub const FETCH_INIT: &str = "FETCH_INIT";
pub const FETCH_SUCCESS: &str = "FETCH_SUCCESS";
pub const FETCH_FAILURE: &str = "FETCH_FAILURE";

/// Externally observable outcome of the most recently started request.
///
/// `data` is omitted when serialized as `None`, so a JSON `null` always
/// means a committed null payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct LifecycleState<T> {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<T>,
    pub error: Option<ErrorInfo>,
    pub is_loading: bool,
}

impl<T> Default for LifecycleState<T> {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Typed lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleAction<T> {
    Init,
    Success(T),
    Failure(ErrorInfo),
}

impl<T> LifecycleAction<T> {
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleAction::Init => FETCH_INIT,
            LifecycleAction::Success(_) => FETCH_SUCCESS,
            LifecycleAction::Failure(_) => FETCH_FAILURE,
        }
    }
}

/// Untyped lifecycle event, as it would arrive over a message boundary.
///
/// A `payload` key that is present is always `Some`, even when it holds
/// `null`; only a missing key counts as no payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct RawAction<T> {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "present")]
    pub payload: Option<T>,
    #[serde(default)]
    pub error: Option<ErrorInfo>,
}

/// Deserializes a field that is present in the input as `Some`, `null`
/// included. Missing fields fall back to `#[serde(default)]`.
fn present<'de, D, V>(deserializer: D) -> Result<Option<V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    V::deserialize(deserializer).map(Some)
}

impl<T> RawAction<T> {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
            error: None,
        }
    }
}

impl<T> TryFrom<RawAction<T>> for LifecycleAction<T> {
    type Error = ActionError;

    fn try_from(raw: RawAction<T>) -> Result<Self, Self::Error> {
        match raw.kind.as_str() {
            FETCH_INIT => Ok(LifecycleAction::Init),
            FETCH_SUCCESS => raw
                .payload
                .map(LifecycleAction::Success)
                .ok_or(ActionError::Incomplete {
                    kind: FETCH_SUCCESS,
                    field: "payload",
                }),
            FETCH_FAILURE => raw
                .error
                .map(LifecycleAction::Failure)
                .ok_or(ActionError::Incomplete {
                    kind: FETCH_FAILURE,
                    field: "error",
                }),
            _ => Err(ActionError::UnknownAction(raw.kind)),
        }
    }
}

impl<T> LifecycleState<T> {
    /// Idle state carrying the caller's initial data.
    pub fn new(data: Option<T>) -> Self {
        Self {
            data,
            error: None,
            is_loading: false,
        }
    }

    pub fn reduce(&mut self, action: LifecycleAction<T>) {
        match action {
            LifecycleAction::Init => {
                self.is_loading = true;
                self.error = None;
            }
            LifecycleAction::Success(payload) => {
                self.data = Some(payload);
                self.error = None;
                self.is_loading = false;
            }
            LifecycleAction::Failure(error) => {
                self.error = Some(error);
                self.is_loading = false;
            }
        }
    }

    /// Applies an untyped event. On error the state is left untouched.
    pub fn dispatch(&mut self, raw: RawAction<T>) -> Result<(), ActionError> {
        let action = LifecycleAction::try_from(raw)?;
        self.reduce(action);
        Ok(())
    }
}
