pub mod client;

pub use client::AuthClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Provider(String),
    #[error("Auth request failed: {0}")]
    Request(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// Identity provider boundary. The quiz core only ever needs the current
/// user's id and email; session handling lives behind this trait.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, or `None` when there is no active session.
    async fn current_user(&self) -> Result<Option<AuthUser>>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser>;

    async fn sign_out(&self) -> Result<()>;
}
