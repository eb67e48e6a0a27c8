use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Identity of a class of in-flight work.
///
/// Identities are keyed by type rather than by value: two `CancelId`s built from
/// the same type are the same identity. Declare identities with [`cancel_ids!`](crate::cancel_ids).
#[derive(Clone, Copy)]
pub struct CancelId {
    type_id: TypeId,
    name: &'static str,
}

impl CancelId {
    pub fn of<T: ?Sized + 'static>() -> Self {
        CancelId {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The unqualified type name, for logs.
    pub fn name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for CancelId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for CancelId {}

impl Hash for CancelId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for CancelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CancelId({})", self.name())
    }
}

#[derive(Default)]
struct Table {
    next_key: u64,
    units: HashMap<CancelId, Vec<(u64, CancellationToken)>>,
}

impl Table {
    fn insert(&mut self, id: CancelId, token: CancellationToken) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        self.units.entry(id).or_default().push((key, token));
        key
    }

    fn cancel(&mut self, id: &CancelId) -> usize {
        match self.units.remove(id) {
            Some(units) => {
                for (_, token) in &units {
                    token.cancel();
                }
                units.len()
            }
            None => 0,
        }
    }
}

/// Table of in-flight units keyed by [`CancelId`].
///
/// Cloning a registry yields another handle to the same table. All operations
/// take an internal lock, so registering and cancelling from concurrently running
/// effects is safe.
#[derive(Clone, Default)]
pub struct CancellationRegistry {
    table: Arc<Mutex<Table>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> CancellationRegistry {
        static GLOBAL: OnceLock<CancellationRegistry> = OnceLock::new();
        GLOBAL.get_or_init(CancellationRegistry::new).clone()
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `token` under `id` alongside whatever is already there.
    pub fn register(&self, id: impl Into<CancelId>, token: CancellationToken) -> Lease {
        let id = id.into();
        let key = self.lock().insert(id, token.clone());
        Lease {
            table: self.table.clone(),
            id,
            key,
            token,
        }
    }

    /// Cancels every unit registered under `id`, then registers `token` in its place.
    ///
    /// Both steps happen under one lock, so no other registration can slip in between.
    pub fn cancel_in_flight_then_register(
        &self,
        id: impl Into<CancelId>,
        token: CancellationToken,
    ) -> Lease {
        let id = id.into();
        let key = {
            let mut table = self.lock();
            let cancelled = table.cancel(&id);
            if cancelled > 0 {
                trace!(id = id.name(), cancelled, "cancelled in-flight units");
            }
            table.insert(id, token.clone())
        };
        Lease {
            table: self.table.clone(),
            id,
            key,
            token,
        }
    }

    /// Cancels and deregisters every unit under `id`. Returns how many were cancelled.
    pub fn cancel(&self, id: impl Into<CancelId>) -> usize {
        let id = id.into();
        let cancelled = self.lock().cancel(&id);
        if cancelled > 0 {
            trace!(id = id.name(), cancelled, "cancelled");
        }
        cancelled
    }

    pub fn cancel_all(&self) {
        let units = std::mem::take(&mut self.lock().units);
        for (id, units) in units {
            trace!(id = id.name(), cancelled = units.len(), "cancelled");
            for (_, token) in units {
                token.cancel();
            }
        }
    }

    pub fn is_registered(&self, id: impl Into<CancelId>) -> bool {
        self.in_flight(id) > 0
    }

    pub fn in_flight(&self, id: impl Into<CancelId>) -> usize {
        self.lock().units.get(&id.into()).map_or(0, Vec::len)
    }

    /// Spawns the unit produced by `factory` and registers it under `id`.
    ///
    /// The unit stops at its next suspension point once cancelled.
    pub fn run<F, Fut>(&self, id: impl Into<CancelId>, factory: F) -> JoinHandle<()>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let lease = self.register(id, CancellationToken::new());
        Self::spawn_leased(lease, factory)
    }

    /// Cancels whatever runs under `id`, then spawns and registers the unit produced by `factory`.
    pub fn cancel_in_flight_then_run<F, Fut>(
        &self,
        id: impl Into<CancelId>,
        factory: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let lease = self.cancel_in_flight_then_register(id, CancellationToken::new());
        Self::spawn_leased(lease, factory)
    }

    fn spawn_leased<F, Fut>(lease: Lease, factory: F) -> JoinHandle<()>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = lease.token().clone();
        let unit = factory(token.clone());
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {},
                _ = unit => {},
            }
            drop(lease);
        })
    }
}

/// A registration in a [`CancellationRegistry`].
///
/// Dropping the lease deregisters exactly this unit; later registrations under
/// the same identity are left alone.
pub struct Lease {
    table: Arc<Mutex<Table>>,
    id: CancelId,
    key: u64,
    token: CancellationToken,
}

impl Lease {
    pub fn id(&self) -> CancelId {
        self.id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl fmt::Debug for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("id", &self.id)
            .field("key", &self.key)
            .finish()
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(units) = table.units.get_mut(&self.id) {
            units.retain(|(key, _)| *key != self.key);
            if units.is_empty() {
                table.units.remove(&self.id);
            }
        }
    }
}

/// Declares zero-sized marker types usable as cancellation identities.
///
/// ```
/// storerx::cancel_ids! {
///     pub FetchProfile,
///     ObserveInbox,
/// }
///
/// let id: storerx::CancelId = FetchProfile.into();
/// assert_eq!(id, storerx::CancelId::of::<FetchProfile>());
/// ```
#[macro_export]
macro_rules! cancel_ids {
    ($($vis:vis $name:ident),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            $vis struct $name;

            impl ::std::convert::From<$name> for $crate::CancelId {
                fn from(_: $name) -> Self {
                    $crate::CancelId::of::<$name>()
                }
            }
        )+
    };
}
