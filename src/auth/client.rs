use async_trait::async_trait;
use log::{info, warn};
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

use super::{AuthError, AuthUser, IdentityProvider, Result};

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: UserPayload,
}

#[derive(Deserialize)]
struct UserPayload {
    id: Uuid,
    email: String,
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(alias = "error_description", alias = "msg")]
    message: Option<String>,
}

/// HTTP client for a GoTrue-style auth endpoint (password grant). Holds
/// the bearer token for the active session; one client per user session,
/// passed into the components that need identity.
pub struct AuthClient {
    http: Client,
    base_url: String,
    anon_key: String,
    session: Mutex<Option<SessionState>>,
}

#[derive(Clone)]
struct SessionState {
    access_token: String,
    user: AuthUser,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            session: Mutex::new(None),
        }
    }

    /// Reads `AUTH_URL` and `AUTH_ANON_KEY` from the environment.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("AUTH_URL")
            .map_err(|_| AuthError::Request("AUTH_URL not set".to_string()))?;
        let anon_key = std::env::var("AUTH_ANON_KEY")
            .map_err(|_| AuthError::Request("AUTH_ANON_KEY not set".to_string()))?;
        Ok(Self::new(base_url, anon_key))
    }

    async fn provider_error(response: reqwest::Response) -> AuthError {
        let status = response.status();
        match response.json::<ErrorPayload>().await {
            Ok(payload) => {
                let message = payload
                    .message
                    .unwrap_or_else(|| format!("Auth provider returned {}", status));
                AuthError::Provider(message)
            }
            Err(_) => AuthError::Provider(format!("Auth provider returned {}", status)),
        }
    }
}

#[async_trait]
impl IdentityProvider for AuthClient {
    async fn current_user(&self) -> Result<Option<AuthUser>> {
        let token = {
            let session = self.session.lock();
            match session.as_ref() {
                Some(state) => state.access_token.clone(),
                None => return Ok(None),
            }
        };

        let response = self
            .http
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        if !response.status().is_success() {
            // Token expired or revoked; drop the local session.
            warn!("Session token rejected ({}); clearing local session", response.status());
            self.session.lock().take();
            return Ok(None);
        }

        let user: UserPayload = response
            .json()
            .await
            .map_err(|e| AuthError::Request(format!("Failed to parse user response: {}", e)))?;

        Ok(Some(AuthUser {
            id: user.id,
            email: user.email,
        }))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let response = self
            .http
            .post(format!("{}/auth/v1/token?grant_type=password", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::provider_error(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Request(format!("Failed to parse token response: {}", e)))?;

        let user = AuthUser {
            id: token.user.id,
            email: token.user.email,
        };

        *self.session.lock() = Some(SessionState {
            access_token: token.access_token,
            user: user.clone(),
        });

        info!("Signed in: {}", user.email);
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        let state = self.session.lock().take();

        if let Some(state) = state {
            let response = self
                .http
                .post(format!("{}/auth/v1/logout", self.base_url))
                .header("apikey", &self.anon_key)
                .header("Authorization", format!("Bearer {}", state.access_token))
                .send()
                .await
                .map_err(|e| AuthError::Request(e.to_string()))?;

            if !response.status().is_success() {
                // Local session is already gone; the server-side revoke failing
                // does not keep the user signed in.
                warn!("Sign-out request returned {}", response.status());
            }
            info!("Signed out: {}", state.user.email);
        }

        Ok(())
    }
}
