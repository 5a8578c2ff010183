//! Shared fixtures for HTTP-level tests
//!
//! Wires a `SessionManager` to a wiremock server with in-memory credentials.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use videogen_core::auth::{CredentialPair, CredentialStore, SessionCache, SessionManager, SessionStatus};
use videogen_core::{ApiClient, ClientConfig};
use wiremock::MockServer;

pub struct Harness {
    pub server: MockServer,
    pub store: Arc<CredentialStore>,
    pub cache: Arc<SessionCache>,
    pub manager: SessionManager,
}

impl Harness {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(CredentialStore::in_memory());
        let cache = Arc::new(SessionCache::new());
        let api = ApiClient::new(&ClientConfig::new(server.uri()), store.clone(), cache.clone())
            .expect("Failed to build API client");
        let manager = SessionManager::new(api);
        Self {
            server,
            store,
            cache,
            manager,
        }
    }

    /// Start with a stored pair, as if a previous run had signed in
    pub async fn signed_in(access: &str, refresh: &str) -> Self {
        let harness = Self::start().await;
        harness.store.set(&CredentialPair::new(access, refresh));
        harness
    }

    pub fn api(&self) -> &ApiClient {
        self.manager.api()
    }

    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    /// Session/store consistency that must hold after every transition
    pub fn assert_consistent(&self) {
        let session = self.cache.current();
        match session.status {
            SessionStatus::Authenticated => {
                assert!(session.identity.is_some(), "authenticated without identity");
                assert!(self.store.get().is_some(), "authenticated without credentials");
            }
            SessionStatus::Unauthenticated => {
                assert!(session.identity.is_none(), "unauthenticated with identity");
            }
            SessionStatus::Loading => {}
        }
    }
}

pub fn user(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase()),
        "plan": "free",
        "isAdmin": false,
        "connectedPlatforms": [],
        "videosGenerated": 0
    })
}

pub fn user_envelope(id: &str, name: &str) -> Value {
    json!({
        "success": true,
        "message": "User data retrieved",
        "data": { "user": user(id, name) }
    })
}

pub fn auth_envelope(id: &str, name: &str, access: &str, refresh: &str) -> Value {
    json!({
        "success": true,
        "message": "Welcome",
        "data": {
            "user": user(id, name),
            "accessToken": access,
            "refreshToken": refresh
        }
    })
}

pub fn token_envelope(access: &str, refresh: &str) -> Value {
    json!({
        "success": true,
        "message": "Token refreshed",
        "data": { "accessToken": access, "refreshToken": refresh }
    })
}

pub fn failure(message: &str) -> Value {
    json!({ "success": false, "message": message })
}

pub fn ok_envelope() -> Value {
    json!({ "success": true, "message": "OK" })
}
