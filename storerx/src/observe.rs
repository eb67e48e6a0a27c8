//! Bridges from external push-streams to actions.
//!
//! Each bridge is an ordinary cancellable unit: the upstream collaborator is the
//! only producer, the Store the only consumer. The unit ends quietly when the
//! upstream stream ends or when its identity is cancelled.

use crate::{Action, CancelId, Effect};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use tracing::debug;

impl<A: Action> Effect<A> {
    /// Dispatches `to_action(item)` for every item `stream` produces, under `id`.
    pub fn observe<St, F>(id: impl Into<CancelId>, stream: St, to_action: F) -> Self
    where
        St: Stream + Send + 'static,
        St::Item: Send,
        F: Fn(St::Item) -> A + Send + 'static,
    {
        Effect::run(move |sender| async move {
            let mut stream = Box::pin(stream);
            while let Some(item) = stream.next().await {
                if sender.is_cancelled() {
                    break;
                }
                sender.send(to_action(item)).await;
            }
        })
        .cancellable(id, false)
    }

    /// Like [`Effect::observe`] for streams of results; the first error ends the unit.
    pub fn observe_fallible<St, T, E, F>(id: impl Into<CancelId>, stream: St, to_action: F) -> Self
    where
        St: Stream<Item = Result<T, E>> + Send + 'static,
        T: Send,
        E: Display + Send,
        F: Fn(T) -> A + Send + 'static,
    {
        let id = id.into();
        Effect::run(move |sender| async move {
            let mut stream = Box::pin(stream);
            while let Some(item) = stream.next().await {
                match item {
                    Ok(item) => sender.send(to_action(item)).await,
                    Err(error) => {
                        debug!(%error, id = id.name(), "observation ended with an error");
                        break;
                    }
                }
            }
        })
        .cancellable(id, false)
    }
}
