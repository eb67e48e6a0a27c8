use std::any::Any;
use thiserror::Error;

/// Represents the ways loading an asynchronous value can fail.
///
/// A `LoadError` is the payload of [`Loadable::Failure`](crate::Loadable::Failure).
/// There is no cancelled variant: a cancelled unit produces no value at all.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoadError {
    /// A general error with a message describing what went wrong.
    #[error("{0}")]
    Message(String),

    /// An operation returned `None` when a value was expected.
    #[error("operation returned no value")]
    Missing,

    /// The operation did not finish before its deadline.
    #[error("deadline has elapsed")]
    Timeout,

    /// The operation panicked; the payload is the panic message when one was available.
    #[error("operation panicked: {0}")]
    Panicked(String),
}

impl LoadError {
    pub fn message(message: impl Into<String>) -> Self {
        LoadError::Message(message.into())
    }

    /// Returns true if this error is a general error with a message.
    pub fn is_message(&self) -> bool {
        matches!(self, LoadError::Message(_))
    }

    /// Returns true if this error represents a missing value.
    pub fn is_missing(&self) -> bool {
        matches!(self, LoadError::Missing)
    }

    /// Returns true if this error represents a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LoadError::Timeout)
    }

    pub fn is_panicked(&self) -> bool {
        matches!(self, LoadError::Panicked(_))
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "unknown panic".to_string()
        };
        LoadError::Panicked(message)
    }
}
