mod cancellation;
mod effect;
mod into_loadable;
mod load_error;
mod loadable;
mod observe;
mod reducer;
mod store;
mod stream_ext;
pub mod mock;

pub use cancellation::*;
pub use effect::{Completion, Effect, Sender};
pub use into_loadable::*;
pub use load_error::*;
pub use loadable::*;
pub use reducer::*;
pub use store::*;
pub use stream_ext::*;

#[cfg(test)]
mod unit_tests;

/// Screen state owned by a [`Store`].
pub trait State: Clone + Send + Sync + 'static {}

/// A discrete event consumed by a [`Reducer`].
pub trait Action: std::fmt::Debug + Send + 'static {}
