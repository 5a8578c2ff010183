//! Session lifecycle coordinator.
//!
//! The only component (besides the transport's invalidation path) that moves
//! the session between `Unauthenticated`, `Loading` and `Authenticated`.
//! Credentials are always persisted before `Authenticated` is published.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{AuthPayload, ResetPasswordRequest, User};

use super::{CredentialPair, CredentialStore, Session, SessionCache, SessionStatus, Ticket};

pub struct SessionManager {
    api: ApiClient,
    store: Arc<CredentialStore>,
    cache: Arc<SessionCache>,
}

impl SessionManager {
    pub fn new(api: ApiClient) -> Self {
        let store = api.store().clone();
        let cache = api.session().clone();
        Self { api, store, cache }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> Session {
        self.cache.current()
    }

    pub fn current_user(&self) -> Option<User> {
        self.cache.identity()
    }

    pub fn is_authenticated(&self) -> bool {
        self.cache.current().is_authenticated()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<Session> {
        self.cache.subscribe()
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Resolve the stored credential (if any) into an identity.
    ///
    /// Never fails: an unusable credential ends in `Unauthenticated`. A
    /// transient failure also ends in `Unauthenticated` but keeps the stored
    /// credentials so a flaky network does not log the user out.
    pub async fn startup(&self) -> Session {
        let ticket = self.cache.begin_transition();

        if self.store.access_token().is_none() {
            debug!("No stored access token");
            self.cache.commit(ticket, Session::reset);
            return self.cache.current();
        }

        self.cache.commit(ticket, |s| s.status = SessionStatus::Loading);

        match self.api.fetch_me().await {
            Ok(user) => {
                let store = &self.store;
                let applied = self.cache.commit(ticket, |s| {
                    // The transport may have cleared the pair during a failed refresh
                    if store.get().is_some() {
                        *s = Session::authenticated(user);
                    } else {
                        s.reset();
                    }
                });
                if applied {
                    info!("Session restored");
                }
            }
            // A rejected credential, or a 2xx envelope refusing it
            Err(e @ (ApiError::Unauthorized(_) | ApiError::Declined(_))) => {
                debug!(error = %e, "Stored credentials rejected");
                self.clear_if_current(ticket);
            }
            Err(e) => {
                warn!(error = %e, "Startup identity check failed, keeping stored credentials");
                self.cache.commit(ticket, Session::reset);
            }
        }

        self.cache.current()
    }

    /// Re-fetch the identity and replace it wholesale
    pub async fn reload_identity(&self) -> Result<User, ApiError> {
        let ticket = self.cache.current_ticket();
        let user = self.api.fetch_me().await?;
        self.replace_identity(ticket, user)
    }

    // =========================================================================
    // Credential-issuing flows
    // =========================================================================

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let (ticket, previous) = self.begin_loading();
        let result = self.api.login(email, password).await;
        self.establish(ticket, previous, result.map(AuthPayload::into_parts))
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<User, ApiError> {
        let (ticket, previous) = self.begin_loading();
        let result = self.api.register(name, email, password).await;
        self.establish(ticket, previous, result.map(AuthPayload::into_parts))
    }

    /// Complete a password reset. Success signs the user in, exactly like login.
    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<User, ApiError> {
        let (ticket, previous) = self.begin_loading();
        let result = self.api.reset_password(request).await;
        self.establish(ticket, previous, result.map(AuthPayload::into_parts))
    }

    /// Confirm a signup with the emailed code; success signs the user in
    pub async fn verify_email(&self, user_id: &str, code: &str) -> Result<User, ApiError> {
        let (ticket, previous) = self.begin_loading();
        let result = async {
            let payload = self.api.verify_email(user_id, code).await?;
            let pair = payload.credentials();
            let user = match payload.user {
                Some(user) => user,
                None => self.api.fetch_me_with_token(&pair.access_token).await?,
            };
            Ok::<_, ApiError>((user, pair))
        }
        .await;
        self.establish(ticket, previous, result)
    }

    /// Ask the server to send a reset email or code
    pub async fn forgot_password(&self, email: &str) -> Result<Option<String>, ApiError> {
        self.api.forgot_password(email).await
    }

    pub async fn verify_reset_code(&self, email: &str, code: &str) -> Result<(), ApiError> {
        self.api.verify_reset_code(email, code).await
    }

    pub async fn resend_verification(&self, user_id: &str, email: &str) -> Result<(), ApiError> {
        self.api.resend_verification(user_id, email).await
    }

    // =========================================================================
    // Logout & account
    // =========================================================================

    /// Always ends `Unauthenticated` with an empty store, even if the server call fails
    pub async fn logout(&self) {
        // Anything still in flight is stale from here on
        self.cache.begin_transition();

        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "Server-side logout failed, clearing local session anyway");
        }

        let store = &self.store;
        self.cache.force(|s| {
            store.clear();
            s.reset();
        });
        info!("Logged out");
    }

    pub async fn update_profile(&self, name: &str) -> Result<User, ApiError> {
        let ticket = self.cache.current_ticket();
        let user = self.api.update_profile(name).await?;
        self.replace_identity(ticket, user)
    }

    pub async fn change_password(&self, current_password: &str, new_password: &str) -> Result<(), ApiError> {
        self.api.change_password(current_password, new_password).await
    }

    pub async fn delete_account(&self, password: &str) -> Result<(), ApiError> {
        self.api.delete_account(password).await?;
        let store = &self.store;
        self.cache.force(|s| {
            store.clear();
            s.reset();
        });
        info!("Account deleted");
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn begin_loading(&self) -> (Ticket, Session) {
        let ticket = self.cache.begin_transition();
        let previous = self.cache.current();
        self.cache.commit(ticket, |s| s.status = SessionStatus::Loading);
        (ticket, previous)
    }

    /// Finish a credential-issuing flow.
    ///
    /// Success persists the pair and publishes `Authenticated` in one commit.
    /// Failure restores the session as it was before the flow began and
    /// writes nothing.
    fn establish(
        &self,
        ticket: Ticket,
        previous: Session,
        result: Result<(User, CredentialPair), ApiError>,
    ) -> Result<User, ApiError> {
        match result {
            Ok((user, pair)) => {
                let store = &self.store;
                let session_user = user.clone();
                let applied = self.cache.commit(ticket, |s| {
                    store.set(&pair);
                    *s = Session::authenticated(session_user);
                });
                if !applied {
                    debug!("Discarding credentials from a superseded flow");
                    return Err(ApiError::Superseded);
                }
                info!(user_id = %user.id, "Signed in");
                Ok(user)
            }
            Err(e) => {
                debug!(error = %e, "Sign-in flow failed");
                self.cache.commit(ticket, |s| {
                    *s = match previous.status {
                        // An unresolved session stays signed out after a failed attempt
                        SessionStatus::Loading => Session::unauthenticated(),
                        _ => previous,
                    };
                });
                Err(e)
            }
        }
    }

    /// Swap in a fresh identity without starting a transition of our own,
    /// so a sign-in already in flight is left alone. Only an authenticated
    /// session takes the new identity.
    fn replace_identity(&self, ticket: Ticket, user: User) -> Result<User, ApiError> {
        let applied = self.cache.commit(ticket, |s| {
            if s.status == SessionStatus::Authenticated {
                s.identity = Some(user.clone());
            }
        });
        if !applied {
            return Err(ApiError::Superseded);
        }
        Ok(user)
    }

    fn clear_if_current(&self, ticket: Ticket) {
        let store = &self.store;
        self.cache.commit(ticket, |s| {
            store.clear();
            s.reset();
        });
    }
}
