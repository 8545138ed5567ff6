//! services/client/src/adapters/auth.rs
//!
//! This module contains the identity-provider adapter, implementing the
//! `AuthService` port against the backend's token-based auth endpoints. The
//! adapter bridges sign-in/sign-out transitions into the auth-state stream
//! that the navigation presenter consumes.

use async_trait::async_trait;
use guestgo_core::domain::AuthUser;
use guestgo_core::ports::{AuthService, AuthStateStream, PortError, PortResult};
use serde::Deserialize;
use tokio::sync::{watch, RwLock};
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `AuthService` port over the backend's
/// REST auth API, restoring a session from a previously stored access token.
pub struct RestAuthAdapter {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: RwLock<Option<String>>,
    state: watch::Sender<Option<AuthUser>>,
}

impl RestAuthAdapter {
    pub fn new(base_url: &str, api_key: &str, access_token: Option<String>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token: RwLock::new(access_token),
            state,
        }
    }
}

#[derive(Deserialize)]
struct UserRecord {
    id: Uuid,
    email: Option<String>,
}

impl UserRecord {
    fn to_domain(self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: self.email.unwrap_or_default(),
        }
    }
}

//=========================================================================================
// `AuthService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthService for RestAuthAdapter {
    async fn current_user(&self) -> PortResult<Option<AuthUser>> {
        let token = self.access_token.read().await.clone();
        let Some(token) = token else {
            return Ok(None);
        };

        let response = self
            .http
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| PortError::Provider(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            // The stored token went stale; drop it and notify watchers.
            *self.access_token.write().await = None;
            self.state.send_replace(None);
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(PortError::Provider(format!(
                "user lookup returned {}",
                response.status()
            )));
        }

        let record: UserRecord = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let user = record.to_domain();
        self.state.send_replace(Some(user.clone()));
        Ok(Some(user))
    }

    fn on_auth_state_change(&self) -> AuthStateStream {
        let mut rx = self.state.subscribe();
        Box::pin(async_stream::stream! {
            while rx.changed().await.is_ok() {
                let user = rx.borrow_and_update().clone();
                yield user;
            }
        })
    }

    async fn sign_out(&self) -> PortResult<()> {
        let token = self.access_token.write().await.take();
        if let Some(token) = token {
            // Best effort; the local session is gone regardless.
            let result = self
                .http
                .post(format!("{}/auth/v1/logout", self.base_url))
                .header("apikey", &self.api_key)
                .bearer_auth(&token)
                .send()
                .await;
            if let Err(e) = result {
                warn!("Sign-out call failed: {:?}", e);
            }
        }
        self.state.send_replace(None);
        Ok(())
    }
}
