//! API client for communicating with the AI VideoGen REST API.
//!
//! Every call goes through one transport path that attaches the bearer
//! credential and recovers from an expired access credential by refreshing
//! it once. A call is replayed at most once; if the refresh is impossible or
//! fails, the stored credentials and the session cache are cleared and the
//! original 401 is returned to the caller. A refresh that completes after a
//! sign-out is dropped without touching the store.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{CredentialPair, CredentialStore, Session, SessionCache};
use crate::models::{
    ApiResponse, AuthPayload, ChangePasswordRequest, DeleteAccountRequest, Empty,
    ForgotPasswordPayload, ForgotPasswordRequest, LoginRequest, RefreshRequest, RegisterRequest,
    ResendVerificationRequest, ResetPasswordRequest, TokenPayload, UpdateProfileRequest, User,
    UserPayload, VerifyEmailRequest, VerifyResetCodeRequest,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when nothing is configured (local development server)
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// A call that fails with 401 is replayed at most this many times.
const MAX_UNAUTHORIZED_RETRIES: u32 = 1;

const REGISTER_PATH: &str = "/api/auth/register";
const LOGIN_PATH: &str = "/api/auth/login";
const ME_PATH: &str = "/api/auth/me";
const REFRESH_PATH: &str = "/api/auth/refresh";
const FORGOT_PASSWORD_PATH: &str = "/api/auth/forgot-password";
const VERIFY_RESET_CODE_PATH: &str = "/api/auth/verify-reset-code";
const RESET_PASSWORD_PATH: &str = "/api/auth/reset-password";
const VERIFY_EMAIL_PATH: &str = "/api/auth/verify-email";
const RESEND_VERIFICATION_PATH: &str = "/api/auth/resend-verification";
const LOGOUT_PATH: &str = "/api/auth/logout";
const PROFILE_PATH: &str = "/api/auth/profile";
const CHANGE_PASSWORD_PATH: &str = "/api/auth/change-password";
const ACCOUNT_PATH: &str = "/api/auth/account";

/// Connection settings for `ApiClient`
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Refuse to send credentials over plain HTTP
    pub secure_transport: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            secure_transport: false,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Normalized base URL (no trailing slash), checked against the transport policy
    fn validated_base_url(&self) -> Result<String, ApiError> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        let url = Url::parse(trimmed)
            .map_err(|e| ApiError::Config(format!("Invalid API base URL {:?}: {}", trimmed, e)))?;

        match url.scheme() {
            "https" => {}
            "http" if !self.secure_transport => {}
            "http" => {
                return Err(ApiError::Config(format!(
                    "Refusing to send credentials to {} over plain HTTP",
                    trimmed
                )))
            }
            other => {
                return Err(ApiError::Config(format!("Unsupported URL scheme: {}", other)));
            }
        }
        Ok(trimmed.to_string())
    }
}

/// Which credential a request carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth<'a> {
    /// The stored access credential; 401s go through the refresh path
    Bearer,
    /// No credential; credential-issuing endpoints
    Public,
    /// A specific access credential that is not (yet) stored; no refresh path
    Token(&'a str),
}

/// A request that can be replayed
struct ApiRequest<'a> {
    method: Method,
    path: &'static str,
    body: Option<serde_json::Value>,
    auth: Auth<'a>,
}

impl<'a> ApiRequest<'a> {
    fn new(method: Method, path: &'static str, auth: Auth<'a>) -> Self {
        Self {
            method,
            path,
            body: None,
            auth,
        }
    }

    fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// What to do after a 401 on an authenticated call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Mint a new access credential with this refresh credential, then replay
    Refresh(String),
    /// Give up: clear the session and surface the failure
    Fail,
}

/// `attempt` counts how many times this call has already been replayed.
pub fn decide_on_unauthorized(attempt: u32, refresh_token: Option<String>) -> RetryDecision {
    if attempt >= MAX_UNAUTHORIZED_RETRIES {
        return RetryDecision::Fail;
    }
    match refresh_token {
        Some(token) if !token.is_empty() => RetryDecision::Refresh(token),
        _ => RetryDecision::Fail,
    }
}

/// API client for AI VideoGen.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Arc<CredentialStore>,
    session: Arc<SessionCache>,
}

impl ApiClient {
    pub fn new(
        config: &ClientConfig,
        store: Arc<CredentialStore>,
        session: Arc<SessionCache>,
    ) -> Result<Self, ApiError> {
        let base_url = config.validated_base_url()?;
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url,
            store,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn session(&self) -> &Arc<SessionCache> {
        &self.session
    }

    fn auth_headers(token: Option<&str>) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::Config("Access token is not a valid header value".to_string()))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn execute(
        &self,
        request: &ApiRequest<'_>,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(Self::auth_headers(token)?);
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        debug!(method = %request.method, path = request.path, "Sending request");
        Ok(builder.send().await?)
    }

    /// Read the body and decode the envelope, mapping non-2xx statuses to errors.
    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<ApiResponse<T>, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &body));
        }
        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    /// Unwrap a successful envelope's data
    fn into_data<T>(envelope: ApiResponse<T>, fallback: &str) -> Result<T, ApiError> {
        if !envelope.success {
            return Err(ApiError::Declined(envelope.failure_message(fallback)));
        }
        envelope
            .data
            .ok_or_else(|| ApiError::InvalidResponse(format!("{}: response carried no data", fallback)))
    }

    fn into_ok<T>(envelope: ApiResponse<T>, fallback: &str) -> Result<Option<T>, ApiError> {
        if !envelope.success {
            return Err(ApiError::Declined(envelope.failure_message(fallback)));
        }
        Ok(envelope.data)
    }

    /// Clear credentials and session together, superseding in-flight transitions
    fn end_session(&self) {
        self.session.force(|session| {
            self.store.clear();
            session.reset();
        });
        info!("Session invalidated");
    }

    /// Send a request through the credential/refresh path.
    async fn send<T: DeserializeOwned>(
        &self,
        request: ApiRequest<'_>,
    ) -> Result<ApiResponse<T>, ApiError> {
        let mut attempt = 0;

        loop {
            let token = match request.auth {
                Auth::Bearer => self.store.access_token(),
                Auth::Token(token) => Some(token.to_string()),
                Auth::Public => None,
            };

            let response = self.execute(&request, token.as_deref()).await?;

            if response.status() != StatusCode::UNAUTHORIZED || request.auth != Auth::Bearer {
                return Self::decode(response).await;
            }

            let original = match Self::decode::<Empty>(response).await {
                Err(e) => e,
                Ok(_) => ApiError::Unauthorized("Unauthorized".to_string()),
            };

            match decide_on_unauthorized(attempt, self.store.refresh_token()) {
                RetryDecision::Refresh(refresh_token) => {
                    attempt += 1;
                    let epoch = self.session.epoch();
                    match self.refresh(&refresh_token).await {
                        Ok(pair) => {
                            let store = &self.store;
                            if !self.session.persist_if_unforced(epoch, || store.set(&pair)) {
                                // Signed out while the refresh was in flight
                                debug!(path = request.path, "Discarding refreshed credentials");
                                return Err(original);
                            }
                            debug!(path = request.path, "Access token refreshed, replaying request");
                        }
                        Err(e) => {
                            warn!(error = %e, path = request.path, "Token refresh failed");
                            if self.session.epoch() == epoch {
                                self.end_session();
                            }
                            return Err(original);
                        }
                    }
                }
                RetryDecision::Fail => {
                    warn!(path = request.path, attempt, "Unauthorized with no way to recover");
                    self.end_session();
                    return Err(original);
                }
            }
        }
    }

    // ===== Credential-issuing endpoints =====

    /// Exchange a refresh credential for a new pair.
    /// Sent without any bearer credential and never itself refreshed.
    pub async fn refresh(&self, refresh_token: &str) -> Result<CredentialPair, ApiError> {
        let request = ApiRequest::new(Method::POST, REFRESH_PATH, Auth::Public)
            .json(&RefreshRequest { refresh_token })?;
        let response = self.execute(&request, None).await?;
        let envelope: ApiResponse<TokenPayload> = Self::decode(response).await?;
        let payload = Self::into_data(envelope, "Token refresh failed")?;
        Ok(payload.credentials())
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthPayload, ApiError> {
        let request = ApiRequest::new(Method::POST, REGISTER_PATH, Auth::Public)
            .json(&RegisterRequest { name, email, password })?;
        Self::into_data(self.send(request).await?, "Registration failed")
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ApiError> {
        let request = ApiRequest::new(Method::POST, LOGIN_PATH, Auth::Public)
            .json(&LoginRequest { email, password })?;
        Self::into_data(self.send(request).await?, "Login failed")
    }

    /// Returns the challenge id when the server uses the code flow
    pub async fn forgot_password(&self, email: &str) -> Result<Option<String>, ApiError> {
        let request = ApiRequest::new(Method::POST, FORGOT_PASSWORD_PATH, Auth::Public)
            .json(&ForgotPasswordRequest { email })?;
        let payload: Option<ForgotPasswordPayload> =
            Self::into_ok(self.send(request).await?, "Password reset failed")?;
        Ok(payload.and_then(|p| p.challenge_id))
    }

    pub async fn verify_reset_code(&self, email: &str, code: &str) -> Result<(), ApiError> {
        let request = ApiRequest::new(Method::POST, VERIFY_RESET_CODE_PATH, Auth::Public)
            .json(&VerifyResetCodeRequest { email, code })?;
        Self::into_ok::<Empty>(self.send(request).await?, "Invalid verification code")?;
        Ok(())
    }

    pub async fn reset_password(&self, body: &ResetPasswordRequest) -> Result<AuthPayload, ApiError> {
        let request = ApiRequest::new(Method::POST, RESET_PASSWORD_PATH, Auth::Public).json(body)?;
        Self::into_data(self.send(request).await?, "Password reset failed")
    }

    pub async fn verify_email(&self, user_id: &str, code: &str) -> Result<TokenPayload, ApiError> {
        let request = ApiRequest::new(Method::POST, VERIFY_EMAIL_PATH, Auth::Public)
            .json(&VerifyEmailRequest { user_id, code })?;
        Self::into_data(self.send(request).await?, "Invalid verification code")
    }

    pub async fn resend_verification(&self, user_id: &str, email: &str) -> Result<(), ApiError> {
        let request = ApiRequest::new(Method::POST, RESEND_VERIFICATION_PATH, Auth::Public)
            .json(&ResendVerificationRequest { user_id, email })?;
        Self::into_ok::<Empty>(self.send(request).await?, "Failed to resend code")?;
        Ok(())
    }

    // ===== Authenticated endpoints =====

    /// Resolve the stored access credential into a user record
    pub async fn fetch_me(&self) -> Result<User, ApiError> {
        let request = ApiRequest::new(Method::GET, ME_PATH, Auth::Bearer);
        let payload: UserPayload = Self::into_data(self.send(request).await?, "Failed to load user")?;
        Ok(payload.user)
    }

    /// Resolve a freshly issued access credential that has not been stored yet
    pub async fn fetch_me_with_token(&self, access_token: &str) -> Result<User, ApiError> {
        let request = ApiRequest::new(Method::GET, ME_PATH, Auth::Token(access_token));
        let payload: UserPayload = Self::into_data(self.send(request).await?, "Failed to load user")?;
        Ok(payload.user)
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let request = ApiRequest::new(Method::POST, LOGOUT_PATH, Auth::Bearer);
        Self::into_ok::<Empty>(self.send(request).await?, "Logout failed")?;
        Ok(())
    }

    pub async fn update_profile(&self, name: &str) -> Result<User, ApiError> {
        let request = ApiRequest::new(Method::PUT, PROFILE_PATH, Auth::Bearer)
            .json(&UpdateProfileRequest { name })?;
        let payload: UserPayload = Self::into_data(self.send(request).await?, "Profile update failed")?;
        Ok(payload.user)
    }

    pub async fn change_password(&self, current_password: &str, new_password: &str) -> Result<(), ApiError> {
        let request = ApiRequest::new(Method::PUT, CHANGE_PASSWORD_PATH, Auth::Bearer).json(
            &ChangePasswordRequest {
                current_password,
                new_password,
            },
        )?;
        Self::into_ok::<Empty>(self.send(request).await?, "Password change failed")?;
        Ok(())
    }

    pub async fn delete_account(&self, password: &str) -> Result<(), ApiError> {
        let request = ApiRequest::new(Method::DELETE, ACCOUNT_PATH, Auth::Bearer)
            .json(&DeleteAccountRequest { password })?;
        Self::into_ok::<Empty>(self.send(request).await?, "Account deletion failed")?;
        Ok(())
    }

    /// Snapshot of the session this client reports into
    pub fn current_session(&self) -> Session {
        self.session.current()
    }
}
