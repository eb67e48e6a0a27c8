use crate::effect::{Dispatch, Operation};
use crate::{
    Action, CancelId, CancellationRegistry, Effect, Reducer, Sender, State, StoreStreamExt,
};
use futures::future::{self, BoxFuture};
use futures::{FutureExt, Stream, StreamExt};
use futures_signals::signal::{Mutable, MutableSignalCloned, Signal, SignalExt, SignalStream};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, trace};

pub type BoxSignal<T> = Pin<Box<dyn Signal<Item = T> + Send>>;

struct Envelope<A> {
    action: A,
    token: Option<CancellationToken>,
    reduced: Option<oneshot::Sender<()>>,
}

struct Runtime<S: State, A: Action> {
    state: Mutable<S>,
    reducer: Box<dyn Reducer<State = S, Action = A>>,
    registry: CancellationRegistry,
    transition: Mutex<()>,
    mailbox: WeakUnboundedSender<Envelope<A>>,
    /// Parent of every unit token; cancelled when the last Store handle goes away.
    root: CancellationToken,
    handle: Handle,
}

impl<S: State, A: Action> Runtime<S, A> {
    async fn process_mailbox(runtime: Arc<Self>, mut mailbox: UnboundedReceiver<Envelope<A>>) {
        while let Some(Envelope {
            action,
            token,
            reduced,
        }) = mailbox.recv().await
        {
            runtime.apply(token.as_ref(), action);
            if let Some(reduced) = reduced {
                let _ = reduced.send(());
            }
        }
    }

    /// Runs one transition and schedules its effect.
    ///
    /// Transitions are serialized; an action tagged with a cancelled token is
    /// dropped here, inside the same critical section that cancellations run in.
    fn apply(self: &Arc<Self>, token: Option<&CancellationToken>, action: A) {
        let _transition = self
            .transition
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if token.is_some_and(CancellationToken::is_cancelled) {
            trace!(?action, "dropped action from cancelled effect");
            return;
        }
        debug!(?action, "reduce");
        let effect = {
            let mut state = self.state.lock_mut();
            self.reducer.reduce(&mut state, action)
        };
        self.schedule(effect);
    }

    fn schedule(self: &Arc<Self>, effect: Effect<A>) {
        if effect.is_none() {
            return;
        }
        let Some(mailbox) = self.mailbox.upgrade() else {
            return;
        };
        let unit = self.start(effect, &mailbox);
        self.handle.spawn(unit);
    }

    /// Starts `effect` and returns a future that completes when it has finished.
    ///
    /// Registration and cancellation happen right here rather than on first
    /// poll, so a later transition always observes them.
    fn start(
        self: &Arc<Self>,
        effect: Effect<A>,
        mailbox: &UnboundedSender<Envelope<A>>,
    ) -> BoxFuture<'static, ()> {
        match effect.operation {
            Operation::None => future::ready(()).boxed(),
            Operation::Send(action) => deliver(mailbox, action).boxed(),
            Operation::Run {
                id,
                cancel_in_flight,
                body,
            } => {
                let token = self.root.child_token();
                let lease = id.map(|id| {
                    if cancel_in_flight {
                        self.registry
                            .cancel_in_flight_then_register(id, token.clone())
                    } else {
                        self.registry.register(id, token.clone())
                    }
                });
                let sender = Sender::new(dispatcher(mailbox, &token), token.clone());
                let unit = body(sender);
                async move {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            trace!(id = ?lease.as_ref().map(|l| l.id()), "unit cancelled");
                        },
                        _ = unit => {},
                    }
                    drop(lease);
                }
                .boxed()
            }
            Operation::FireAndForget(future) => {
                self.handle.spawn(future);
                future::ready(()).boxed()
            }
            Operation::Cancel(id) => {
                self.registry.cancel(id);
                future::ready(()).boxed()
            }
            Operation::Merge(effects) => {
                let units: Vec<_> = effects
                    .into_iter()
                    .map(|effect| self.start(effect, mailbox))
                    .collect();
                future::join_all(units).map(|_| ()).boxed()
            }
            Operation::Concatenate(effects) => {
                let mut effects = effects.into_iter();
                // Leading cancellations take effect now, and the first real branch starts now.
                let mut first = None;
                for effect in effects.by_ref() {
                    let immediate = matches!(effect.operation, Operation::Cancel(_) | Operation::None);
                    let unit = self.start(effect, mailbox);
                    if !immediate {
                        first = Some(unit);
                        break;
                    }
                }
                let rest: Vec<_> = effects.collect();
                let runtime = self.clone();
                let mailbox = mailbox.clone();
                async move {
                    if let Some(unit) = first {
                        unit.await;
                    }
                    for effect in rest {
                        runtime.start(effect, &mailbox).await;
                    }
                }
                .boxed()
            }
        }
    }
}

/// Enqueues `action` now, so mailbox order follows scheduling order, and
/// returns a future that resolves once it has been reduced.
fn deliver<A>(
    mailbox: &UnboundedSender<Envelope<A>>,
    action: A,
) -> impl std::future::Future<Output = ()> + Send + 'static
where
    A: Send + 'static,
{
    let (reduced, on_reduced) = oneshot::channel();
    let envelope = Envelope {
        action,
        token: None,
        reduced: Some(reduced),
    };
    let queued = mailbox.send(envelope).is_ok();
    async move {
        if queued {
            let _ = on_reduced.await;
        }
    }
}

fn dispatcher<A: Action>(
    mailbox: &UnboundedSender<Envelope<A>>,
    token: &CancellationToken,
) -> Dispatch<A> {
    let mailbox = mailbox.clone();
    let token = token.clone();
    Arc::new(move |action| {
        let (reduced, on_reduced) = oneshot::channel();
        let envelope = Envelope {
            action,
            token: Some(token.clone()),
            reduced: Some(reduced),
        };
        mailbox.send(envelope).ok().map(|_| on_reduced)
    })
}

async fn first_matching<S, St, P>(stream: St, mut predicate: P) -> Option<S>
where
    St: Stream<Item = S>,
    P: FnMut(&S) -> bool,
{
    let mut matched = None;
    stream
        .stop_if(|state| predicate(state))
        .for_each(|state| {
            matched = Some(state);
            async {}
        })
        .await;
    matched
}

/// Owner of one screen's state.
///
/// `send` runs the reducer synchronously; effects run on the tokio runtime and
/// feed their actions back through a mailbox that a background task drains.
/// A Store must be created inside a tokio runtime. It keeps a handle to that
/// runtime, so `send` may be called from any thread afterwards.
///
/// Dropping the last handle (scoped stores included) cancels every effect the
/// Store still runs, which lets long-lived observations end.
pub struct Store<S: State, A: Action> {
    runtime: Arc<Runtime<S, A>>,
    mailbox: UnboundedSender<Envelope<A>>,
    _lifetime: Arc<DropGuard>,
}

impl<S: State, A: Action> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Store {
            runtime: self.runtime.clone(),
            mailbox: self.mailbox.clone(),
            _lifetime: self._lifetime.clone(),
        }
    }
}

impl<S: State, A: Action> Store<S, A> {
    pub fn new<R>(reducer: R, initial_state: S) -> Self
    where
        R: Reducer<State = S, Action = A>,
    {
        Self::with_registry(reducer, initial_state, CancellationRegistry::new())
    }

    /// Builds a Store whose effects register in `registry`, e.g. [`CancellationRegistry::global`].
    pub fn with_registry<R>(reducer: R, initial_state: S, registry: CancellationRegistry) -> Self
    where
        R: Reducer<State = S, Action = A>,
    {
        let handle = Handle::current();
        let root = CancellationToken::new();
        let (mailbox, inbox) = tokio::sync::mpsc::unbounded_channel();
        let runtime = Arc::new(Runtime {
            state: Mutable::new(initial_state),
            reducer: Box::new(reducer),
            registry,
            transition: Mutex::new(()),
            mailbox: mailbox.downgrade(),
            root: root.clone(),
            handle: handle.clone(),
        });

        handle.spawn(Runtime::process_mailbox(runtime.clone(), inbox));

        Store {
            runtime,
            mailbox,
            _lifetime: Arc::new(root.drop_guard()),
        }
    }

    /// Reduces `action` right away and schedules the resulting effect.
    pub fn send(&self, action: A) {
        self.runtime.apply(None, action);
    }

    pub fn state(&self) -> S {
        self.runtime.state.get_cloned()
    }

    /// Reads the current state without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.runtime.state.lock_ref())
    }

    pub fn to_signal(&self) -> MutableSignalCloned<S> {
        self.runtime.state.signal_cloned()
    }

    pub fn to_stream(&self) -> SignalStream<MutableSignalCloned<S>> {
        self.runtime.state.signal_cloned().to_stream()
    }

    /// Resolves with the first observed state matching `predicate`.
    pub async fn wait_for<P>(&self, predicate: P) -> S
    where
        P: FnMut(&S) -> bool,
    {
        match first_matching(self.to_stream(), predicate).await {
            Some(state) => state,
            None => self.state(),
        }
    }

    pub fn registry(&self) -> &CancellationRegistry {
        &self.runtime.registry
    }

    pub fn cancel(&self, id: impl Into<CancelId>) -> usize {
        self.runtime.registry.cancel(id)
    }

    /// Cancels every unit this Store's registry knows about.
    pub fn cancel_all(&self) {
        self.runtime.registry.cancel_all();
    }

    /// Derives a view of a sub-region of the state driven by a narrower action type.
    pub fn scope<C, B, P, E>(&self, project: P, embed: E) -> ScopedStore<C, B>
    where
        C: State,
        B: Action,
        P: Fn(&S) -> C + Send + Sync + 'static,
        E: Fn(B) -> A + Send + Sync + 'static,
    {
        ScopedStore::from(self.clone()).scope(project, embed)
    }
}

type Snapshot<S> = Arc<dyn Fn() -> S + Send + Sync>;
type SignalFactory<S> = Arc<dyn Fn() -> BoxSignal<S> + Send + Sync>;
type Forward<A> = Arc<dyn Fn(A) + Send + Sync>;

/// A projection of a [`Store`] onto part of its state and a subset of its actions.
///
/// It holds only the projection and embedding functions, never the parent
/// state itself. Scoping a scoped store composes the functions.
pub struct ScopedStore<S, A> {
    snapshot: Snapshot<S>,
    signal: SignalFactory<S>,
    forward: Forward<A>,
}

impl<S, A> Clone for ScopedStore<S, A> {
    fn clone(&self) -> Self {
        ScopedStore {
            snapshot: self.snapshot.clone(),
            signal: self.signal.clone(),
            forward: self.forward.clone(),
        }
    }
}

impl<S: State, A: Action> From<Store<S, A>> for ScopedStore<S, A> {
    fn from(store: Store<S, A>) -> Self {
        let snapshot: Snapshot<S> = {
            let store = store.clone();
            Arc::new(move || store.state())
        };
        let signal: SignalFactory<S> = {
            let store = store.clone();
            Arc::new(move || store.to_signal().boxed())
        };
        let forward: Forward<A> = Arc::new(move |action| store.send(action));
        ScopedStore {
            snapshot,
            signal,
            forward,
        }
    }
}

impl<S: State, A: Action> ScopedStore<S, A> {
    pub fn send(&self, action: A) {
        (self.forward)(action)
    }

    pub fn state(&self) -> S {
        (self.snapshot)()
    }

    pub fn to_signal(&self) -> BoxSignal<S> {
        (self.signal)()
    }

    pub fn to_stream(&self) -> SignalStream<BoxSignal<S>> {
        self.to_signal().to_stream()
    }

    pub async fn wait_for<P>(&self, predicate: P) -> S
    where
        P: FnMut(&S) -> bool,
    {
        match first_matching(self.to_stream(), predicate).await {
            Some(state) => state,
            None => self.state(),
        }
    }

    pub fn scope<C, B, P, E>(&self, project: P, embed: E) -> ScopedStore<C, B>
    where
        C: State,
        B: Action,
        P: Fn(&S) -> C + Send + Sync + 'static,
        E: Fn(B) -> A + Send + Sync + 'static,
    {
        let project = Arc::new(project);
        let snapshot: Snapshot<C> = {
            let parent = self.snapshot.clone();
            let project = project.clone();
            Arc::new(move || project(&parent()))
        };
        let signal: SignalFactory<C> = {
            let parent = self.signal.clone();
            Arc::new(move || {
                let project = project.clone();
                parent().map(move |state| project(&state)).boxed()
            })
        };
        let forward: Forward<B> = {
            let parent = self.forward.clone();
            Arc::new(move |action| parent(embed(action)))
        };
        ScopedStore {
            snapshot,
            signal,
            forward,
        }
    }
}
