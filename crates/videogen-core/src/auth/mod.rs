//! Authentication module for managing credentials and the user session.
//!
//! This module provides:
//! - `CredentialStore`: Best-effort persistence of the access/refresh pair,
//!   backed by a private file, the OS keychain, or memory
//! - `SessionCache`: In-memory, observable session state with a generation
//!   counter so stale results never overwrite newer state
//! - `SessionManager`: The lifecycle coordinator (startup, login, signup,
//!   password reset, email verification, logout)
//!
//! Access credentials expire after 7 days, refresh credentials after 30.
//! The identity itself is never persisted; it is re-fetched on startup.

pub mod credentials;
pub mod lifecycle;
pub mod session;

pub use credentials::{
    CredentialBackend, CredentialPair, CredentialStore, ExpiryPolicy, FileBackend, KeyringBackend,
    MemoryBackend, StoredCredentials,
};
pub use lifecycle::SessionManager;
pub use session::{Epoch, Session, SessionCache, SessionStatus, Ticket};
