use crate::{Action, CancelId, IntoLoadable, Loadable};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt::{self, Display};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub(crate) type Dispatch<A> = Arc<dyn Fn(A) -> Option<oneshot::Receiver<()>> + Send + Sync>;

/// Handle through which a running effect feeds actions back into its Store.
///
/// Every sender belongs to exactly one unit of work. Once that unit is cancelled
/// the sender goes quiet, and anything it already queued is discarded before it
/// reaches the reducer.
pub struct Sender<A> {
    dispatch: Dispatch<A>,
    token: CancellationToken,
}

impl<A> Clone for Sender<A> {
    fn clone(&self) -> Self {
        Sender {
            dispatch: self.dispatch.clone(),
            token: self.token.clone(),
        }
    }
}

impl<A: Send + 'static> Sender<A> {
    pub(crate) fn new(dispatch: Dispatch<A>, token: CancellationToken) -> Self {
        Sender { dispatch, token }
    }

    /// Queues `action` and waits until the Store has reduced it.
    pub async fn send(&self, action: A) {
        if self.token.is_cancelled() {
            return;
        }
        if let Some(reduced) = (self.dispatch)(action) {
            let _ = reduced.await;
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the owning unit has been cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub(crate) fn embed<C: Send + 'static>(self, f: Arc<dyn Fn(C) -> A + Send + Sync>) -> Sender<C> {
        let dispatch = self.dispatch;
        Sender {
            dispatch: Arc::new(move |action| dispatch(f(action))),
            token: self.token,
        }
    }
}

/// Output of an effect body. Failures are logged and otherwise dropped.
pub trait Completion {
    fn finish(self, context: &'static str);
}

impl Completion for () {
    fn finish(self, _context: &'static str) {}
}

impl<E: Display> Completion for Result<(), E> {
    fn finish(self, context: &'static str) {
        if let Err(error) = self {
            debug!(%error, context, "effect ended with an error");
        }
    }
}

pub(crate) type Body<A> = Box<dyn FnOnce(Sender<A>) -> BoxFuture<'static, ()> + Send>;

pub(crate) enum Operation<A> {
    None,
    Send(A),
    Run {
        id: Option<CancelId>,
        cancel_in_flight: bool,
        body: Body<A>,
    },
    FireAndForget(BoxFuture<'static, ()>),
    Cancel(CancelId),
    Merge(Vec<Effect<A>>),
    Concatenate(Vec<Effect<A>>),
}

/// Description of asynchronous work returned by a reducer.
///
/// An effect does nothing on its own; the Store that receives it decides when
/// and how to run it.
#[must_use = "effects do nothing unless returned to a Store"]
pub struct Effect<A> {
    pub(crate) operation: Operation<A>,
}

impl<A: Action> Effect<A> {
    pub fn none() -> Self {
        Effect {
            operation: Operation::None,
        }
    }

    /// Feeds `action` back into the Store on a later turn.
    pub fn send(action: A) -> Self {
        Effect {
            operation: Operation::Send(action),
        }
    }

    /// Runs `body` as one unit of work. The body may dispatch any number of actions.
    pub fn run<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Sender<A>) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Completion,
    {
        Effect {
            operation: Operation::Run {
                id: None,
                cancel_in_flight: false,
                body: Box::new(move |sender| {
                    async move { body(sender).await.finish("run") }.boxed()
                }),
            },
        }
    }

    /// Loads a value through [`Loadable::load`] and dispatches the outcome.
    pub fn task<T, R, Fut, F>(future: Fut, to_action: F) -> Self
    where
        T: Send + 'static,
        R: IntoLoadable<T> + Send + 'static,
        Fut: Future<Output = R> + Send + 'static,
        F: FnOnce(Loadable<T>) -> A + Send + 'static,
    {
        Effect::run(move |sender| async move {
            let loadable = Loadable::load(future).await;
            sender.send(to_action(loadable)).await;
        })
    }

    /// Runs `future` detached from the action loop; its outcome is never reduced.
    pub fn fire_and_forget<Fut>(future: Fut) -> Self
    where
        Fut: Future + Send + 'static,
        Fut::Output: Completion,
    {
        Effect {
            operation: Operation::FireAndForget(
                async move { future.await.finish("fire_and_forget") }.boxed(),
            ),
        }
    }

    /// Waits `delay`, then runs `body`, replacing any unit already running under `id`.
    ///
    /// Rapid repeats collapse to the last one: each new debounce cancels the
    /// previous one while it is still sleeping.
    pub fn debounce<F, Fut>(id: impl Into<CancelId>, delay: Duration, body: F) -> Self
    where
        F: FnOnce(Sender<A>) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Completion,
    {
        Effect::run(move |sender| async move {
            tokio::time::sleep(delay).await;
            body(sender).await
        })
        .cancellable(id, true)
    }

    /// Cancels every unit registered under `id`.
    pub fn cancel(id: impl Into<CancelId>) -> Self {
        Effect {
            operation: Operation::Cancel(id.into()),
        }
    }

    /// Runs all effects concurrently.
    pub fn merge(effects: impl IntoIterator<Item = Effect<A>>) -> Self {
        let mut effects: Vec<_> = effects.into_iter().filter(|e| !e.is_none()).collect();
        match effects.len() {
            0 => Effect::none(),
            1 => effects.remove(0),
            _ => Effect {
                operation: Operation::Merge(effects),
            },
        }
    }

    /// Runs effects one after another; each finishes, its actions reduced, before the next starts.
    pub fn concatenate(effects: impl IntoIterator<Item = Effect<A>>) -> Self {
        let mut effects: Vec<_> = effects.into_iter().filter(|e| !e.is_none()).collect();
        match effects.len() {
            0 => Effect::none(),
            1 => effects.remove(0),
            _ => Effect {
                operation: Operation::Concatenate(effects),
            },
        }
    }

    pub fn merge_with(self, other: Effect<A>) -> Self {
        Effect::merge([self, other])
    }

    /// Tags every unit in this effect with `id`.
    ///
    /// With `cancel_in_flight`, starting a unit first cancels whatever is already
    /// registered under `id`.
    pub fn cancellable(self, id: impl Into<CancelId>, cancel_in_flight: bool) -> Self {
        let id = id.into();
        let operation = match self.operation {
            Operation::Run { body, .. } => Operation::Run {
                id: Some(id),
                cancel_in_flight,
                body,
            },
            Operation::Merge(effects) => Operation::Merge(
                effects
                    .into_iter()
                    .map(|e| e.cancellable(id, cancel_in_flight))
                    .collect(),
            ),
            Operation::Concatenate(effects) => Operation::Concatenate(
                effects
                    .into_iter()
                    .map(|e| e.cancellable(id, cancel_in_flight))
                    .collect(),
            ),
            other => other,
        };
        Effect { operation }
    }

    /// Lifts this effect into another action type.
    pub fn map<B, F>(self, f: F) -> Effect<B>
    where
        B: Action,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        self.map_shared(Arc::new(f))
    }

    fn map_shared<B: Action>(self, f: Arc<dyn Fn(A) -> B + Send + Sync>) -> Effect<B> {
        let operation = match self.operation {
            Operation::None => Operation::None,
            Operation::Send(action) => Operation::Send(f(action)),
            Operation::Run {
                id,
                cancel_in_flight,
                body,
            } => Operation::Run {
                id,
                cancel_in_flight,
                body: Box::new(move |sender: Sender<B>| body(sender.embed(f))),
            },
            Operation::FireAndForget(future) => Operation::FireAndForget(future),
            Operation::Cancel(id) => Operation::Cancel(id),
            Operation::Merge(effects) => Operation::Merge(
                effects
                    .into_iter()
                    .map(|e| e.map_shared(f.clone()))
                    .collect(),
            ),
            Operation::Concatenate(effects) => Operation::Concatenate(
                effects
                    .into_iter()
                    .map(|e| e.map_shared(f.clone()))
                    .collect(),
            ),
        };
        Effect { operation }
    }

    pub fn is_none(&self) -> bool {
        matches!(self.operation, Operation::None)
    }
}

impl<A: Action> Default for Effect<A> {
    fn default() -> Self {
        Effect::none()
    }
}

impl<A: Action> fmt::Debug for Effect<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operation {
            Operation::None => f.write_str("None"),
            Operation::Send(action) => f.debug_tuple("Send").field(action).finish(),
            Operation::Run {
                id,
                cancel_in_flight,
                ..
            } => f
                .debug_struct("Run")
                .field("id", id)
                .field("cancel_in_flight", cancel_in_flight)
                .finish(),
            Operation::FireAndForget(_) => f.write_str("FireAndForget"),
            Operation::Cancel(id) => f.debug_tuple("Cancel").field(id).finish(),
            Operation::Merge(effects) => f.debug_tuple("Merge").field(effects).finish(),
            Operation::Concatenate(effects) => f.debug_tuple("Concatenate").field(effects).finish(),
        }
    }
}
