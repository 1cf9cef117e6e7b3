//! Access to the hosted table/storage/auth service.
//!
//! Every page talks to the store through [`Backend`]. The production
//! implementation is [`RemoteClient`], which speaks the PostgREST, storage and
//! GoTrue HTTP APIs; [`MemoryBackend`] implements the same contract in-process.

mod client;
mod error;
mod memory;
mod query;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use client::RemoteClient;
pub use error::ServiceError;
pub use memory::MemoryBackend;
pub use query::{Filter, Query};

/// Credentials attached to a single call.
#[derive(Debug, Clone, Copy)]
pub enum Access<'a> {
    /// Public key only; row-level security restricts this to reads.
    Anonymous,
    /// Access token of a signed-in admin.
    User(&'a str),
}

impl<'a> Access<'a> {
    pub fn token(self) -> Option<&'a str> {
        match self {
            Access::Anonymous => None,
            Access::User(token) => Some(token),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: AuthUser,
}

/// Fields sent to the provider's update-user endpoint. Empty fields are omitted.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait TableApi: Send + Sync {
    async fn select(&self, access: Access<'_>, query: &Query) -> Result<Vec<Value>, ServiceError>;

    async fn count(&self, access: Access<'_>, table: &str) -> Result<u64, ServiceError>;

    async fn insert(
        &self,
        access: Access<'_>,
        table: &str,
        rows: Vec<Value>,
    ) -> Result<Vec<Value>, ServiceError>;

    async fn update(
        &self,
        access: Access<'_>,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, ServiceError>;

    /// Returns the number of deleted rows.
    async fn delete(
        &self,
        access: Access<'_>,
        table: &str,
        filters: &[Filter],
    ) -> Result<usize, ServiceError>;
}

#[async_trait]
pub trait StorageApi: Send + Sync {
    async fn upload(
        &self,
        access: Access<'_>,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ServiceError>;

    fn public_url(&self, path: &str) -> String;

    /// Maps a public URL produced by [`StorageApi::public_url`] back to its object path.
    fn object_path(&self, public_url: &str) -> Option<String>;

    async fn remove(&self, access: Access<'_>, paths: &[String]) -> Result<(), ServiceError>;

    async fn download(&self, path: &str) -> Result<StoredObject, ServiceError>;
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ServiceError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), ServiceError>;

    /// `Ok(None)` when the token is unknown or expired.
    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>, ServiceError>;

    async fn update_user(
        &self,
        access_token: &str,
        update: &UserUpdate,
    ) -> Result<AuthUser, ServiceError>;
}

/// Full contract of a data service: tables, object storage and auth.
pub trait Backend: TableApi + StorageApi + AuthApi {
    fn backend_tag(&self) -> &'static str;
}
