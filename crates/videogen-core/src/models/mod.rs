//! Data models for the AI VideoGen API.
//!
//! This module contains:
//! - `User`: the server-sourced identity snapshot
//! - `ApiResponse`: the uniform `{success, message, data?, error?}` envelope
//! - Request/response bodies for the auth endpoints
//! - `VideoPost` and `Platform` used by the studio

pub mod auth;
pub mod envelope;
pub mod post;
pub mod user;

pub use auth::{
    AuthPayload, ChangePasswordRequest, DeleteAccountRequest, ForgotPasswordPayload,
    ForgotPasswordRequest, LoginRequest, RefreshRequest, RegisterRequest,
    ResendVerificationRequest, ResetPasswordRequest, TokenPayload, UpdateProfileRequest,
    UserPayload, VerifyEmailRequest, VerifyResetCodeRequest,
};
pub use envelope::{ApiResponse, Empty};
pub use post::{Platform, PostStatus, PostUpdate, VideoPost};
pub use user::{Plan, User};
