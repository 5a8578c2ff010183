//! REST API client module for AI VideoGen services.
//!
//! This module provides the `ApiClient` for communicating with the
//! AI VideoGen API: account endpoints, identity, and credential refresh.
//!
//! The API uses bearer token authentication. Tokens are issued by login,
//! signup, password reset and email verification, and renewed through
//! `/api/auth/refresh` when a call comes back 401.

pub mod client;
pub mod error;

pub use client::{decide_on_unauthorized, ApiClient, ClientConfig, RetryDecision};
pub use error::ApiError;
