use crate::{IntoLoadable, LoadError};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

/// Lifecycle of one asynchronously obtained value.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Loadable<T> {
    Idle,
    Loading,
    Success(T),
    Failure(LoadError),
}

impl<T> Loadable<T> {
    pub fn idle() -> Self {
        Loadable::Idle
    }

    pub fn loading() -> Self {
        Loadable::Loading
    }

    pub fn success(value: T) -> Self {
        Loadable::Success(value)
    }

    pub fn failure(error: LoadError) -> Self {
        Loadable::Failure(error)
    }

    pub fn failure_with_message(message: impl Into<String>) -> Self {
        Loadable::Failure(LoadError::Message(message.into()))
    }

    /// Awaits `future` and captures its outcome.
    ///
    /// Errors, missing values and panics all end up as [`Loadable::Failure`];
    /// nothing escapes past this call.
    pub async fn load<R, F>(future: F) -> Self
    where
        F: Future<Output = R>,
        R: IntoLoadable<T>,
    {
        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(result) => result.into_loadable(),
            Err(panic) => Loadable::Failure(LoadError::from_panic(panic)),
        }
    }

    /// Like [`Loadable::load`], but fails with [`LoadError::Timeout`] once `timeout` elapses.
    pub async fn load_with_timeout<R, F>(timeout: Duration, future: F) -> Self
    where
        F: Future<Output = R>,
        R: IntoLoadable<T>,
    {
        match tokio::time::timeout(timeout, Self::load(future)).await {
            Ok(loadable) => loadable,
            Err(_) => Loadable::Failure(LoadError::Timeout),
        }
    }

    /// True once the value is either loaded or failed.
    pub fn is_finished(&self) -> bool {
        matches!(self, Loadable::Success(_) | Loadable::Failure(_))
    }

    /// True once anything has happened, i.e. the value is no longer idle.
    pub fn has_initialized(&self) -> bool {
        !matches!(self, Loadable::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Loadable::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Loadable::Failure(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Loadable::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn value_mut(&mut self) -> Option<&mut T> {
        match self {
            Loadable::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Loadable::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            Loadable::Failure(error) => Some(error),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Loadable<&T> {
        match self {
            Loadable::Idle => Loadable::Idle,
            Loadable::Loading => Loadable::Loading,
            Loadable::Success(value) => Loadable::Success(value),
            Loadable::Failure(error) => Loadable::Failure(error.clone()),
        }
    }

    /// Transforms the payload of a `Success`; every other state is carried over as is.
    pub fn map<U, F>(self, f: F) -> Loadable<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Loadable::Idle => Loadable::Idle,
            Loadable::Loading => Loadable::Loading,
            Loadable::Success(value) => Loadable::Success(f(value)),
            Loadable::Failure(error) => Loadable::Failure(error),
        }
    }
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Loadable::Idle
    }
}

impl<T> From<Loadable<T>> for Option<T> {
    fn from(value: Loadable<T>) -> Self {
        value.into_value()
    }
}
