//! Request and response bodies for the `/api/auth/*` endpoints.

use serde::{Deserialize, Serialize};

use super::User;
use crate::auth::CredentialPair;

// ===== Requests =====

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    #[serde(rename = "refreshToken")]
    pub refresh_token: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForgotPasswordRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResetCodeRequest<'a> {
    pub email: &'a str,
    pub code: &'a str,
}

/// Completes a password reset.
///
/// Two variants exist server-side: the emailed-link flow identifies the
/// reset by `token`, the code flow by `email` + `code`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResetPasswordRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub password: String,
}

impl ResetPasswordRequest {
    pub fn with_code(email: impl Into<String>, code: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            code: Some(code.into()),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_token(token: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            password: password.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyEmailRequest<'a> {
    #[serde(rename = "userId")]
    pub user_id: &'a str,
    pub code: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResendVerificationRequest<'a> {
    #[serde(rename = "userId")]
    pub user_id: &'a str,
    pub email: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateProfileRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangePasswordRequest<'a> {
    #[serde(rename = "currentPassword")]
    pub current_password: &'a str,
    #[serde(rename = "newPassword")]
    pub new_password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteAccountRequest<'a> {
    pub password: &'a str,
}

// ===== Responses =====

/// Issued by login, register and reset-password
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub user: User,
    #[serde(rename = "accessToken", alias = "token")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

impl AuthPayload {
    pub fn into_parts(self) -> (User, CredentialPair) {
        (
            self.user,
            CredentialPair::new(self.access_token, self.refresh_token),
        )
    }
}

/// Issued by refresh and verify-email; the user is optional here
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPayload {
    #[serde(rename = "accessToken", alias = "token")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    #[serde(default)]
    pub user: Option<User>,
}

impl TokenPayload {
    pub fn credentials(&self) -> CredentialPair {
        CredentialPair::new(self.access_token.clone(), self.refresh_token.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    pub user: User,
}

/// Some deployments answer forgot-password with a challenge id for the code flow
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForgotPasswordPayload {
    #[serde(rename = "challengeId", alias = "resetId", default)]
    pub challenge_id: Option<String>,
}
