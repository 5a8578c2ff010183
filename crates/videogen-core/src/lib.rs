//! Core library for the AI VideoGen client.
//!
//! - `api`: REST client with bearer credentials and one-shot refresh on 401
//! - `auth`: credential storage, session cache and the session lifecycle
//! - `studio`: local video post queue with simulated generation
//! - `models`: API data types
//! - `config`: on-disk client configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod studio;

pub use api::{ApiClient, ApiError, ClientConfig};
pub use auth::{CredentialPair, CredentialStore, Session, SessionCache, SessionManager, SessionStatus};
pub use config::Config;
pub use models::{Platform, PostStatus, User, VideoPost};
pub use studio::{Studio, StudioError, StudioEvent};
