use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Unauthenticated,
    Loading,
    Authenticated,
}

/// The client's current belief about who is signed in
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    pub identity: Option<User>,
    pub status: SessionStatus,
}

impl Session {
    pub fn unauthenticated() -> Self {
        Self::default()
    }

    pub fn loading() -> Self {
        Self {
            identity: None,
            status: SessionStatus::Loading,
        }
    }

    pub fn authenticated(user: User) -> Self {
        Self {
            identity: Some(user),
            status: SessionStatus::Authenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated && self.identity.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.identity.as_ref()
    }

    pub fn reset(&mut self) {
        *self = Self::unauthenticated();
    }
}

/// Identifies one coordinator transition. Only the newest ticket may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Counts forced invalidations (logout, account deletion, failed refresh).
/// Ordinary transitions leave it alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch(u64);

/// In-memory session state, shared by the coordinator and the transport.
///
/// Never persisted. Observers can `subscribe()` to learn about silent
/// invalidation. A monotonic generation counter lets a slow flow detect that
/// a newer one has started, so stale results are dropped instead of
/// overwriting newer state.
pub struct SessionCache {
    state: watch::Sender<Session>,
    generation: AtomicU64,
    epoch: AtomicU64,
}

impl SessionCache {
    /// Starts in `Loading` until the startup identity check resolves it
    pub fn new() -> Self {
        let (state, _) = watch::channel(Session::loading());
        Self {
            state,
            generation: AtomicU64::new(0),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn current(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status
    }

    pub fn identity(&self) -> Option<User> {
        self.state.borrow().identity.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn set_identity(&self, identity: Option<User>) {
        self.state.send_modify(|s| s.identity = identity);
    }

    pub fn set_status(&self, status: SessionStatus) {
        self.state.send_modify(|s| s.status = status);
    }

    pub fn clear(&self) {
        self.state.send_modify(Session::reset);
    }

    /// Start a transition, superseding any transition still in flight
    pub fn begin_transition(&self) -> Ticket {
        Ticket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The newest transition's ticket, without starting a new one
    pub fn current_ticket(&self) -> Ticket {
        Ticket(self.generation.load(Ordering::SeqCst))
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }

    pub fn epoch(&self) -> Epoch {
        Epoch(self.epoch.load(Ordering::SeqCst))
    }

    /// Run `effect` under the state lock if no forced invalidation happened
    /// since `epoch` was taken. Observers are not notified.
    pub fn persist_if_unforced(&self, epoch: Epoch, effect: impl FnOnce()) -> bool {
        let mut applied = false;
        self.state.send_if_modified(|_| {
            if self.epoch.load(Ordering::SeqCst) == epoch.0 {
                effect();
                applied = true;
            }
            false
        });
        applied
    }

    /// Apply `update` if `ticket` is still the newest transition.
    ///
    /// `update` runs while the state lock is held, so side effects performed
    /// inside it (persisting credentials) complete before any observer sees
    /// the new state. Returns whether the update was applied.
    pub fn commit(&self, ticket: Ticket, update: impl FnOnce(&mut Session)) -> bool {
        self.state.send_if_modified(|session| {
            if !self.is_current(ticket) {
                return false;
            }
            update(session);
            true
        })
    }

    /// Apply `update` unconditionally and supersede every in-flight transition
    pub fn force(&self, update: impl FnOnce(&mut Session)) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|session| {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            update(session);
        });
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}
