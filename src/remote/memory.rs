use std::collections::{HashMap, HashSet};

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand_core::OsRng;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    Access, AuthApi, AuthUser, Backend, ServiceError, Session, StorageApi, StoredObject, TableApi,
    UserUpdate,
    client::object_path_under,
    query::{Filter, Query},
};

/// Owning relations between tables: `(child table, foreign key column, parent table)`.
/// Deleting a parent row deletes every child row pointing at it.
pub const FOREIGN_KEYS: &[(&str, &str, &str)] = &[
    ("groups", "level_id", "levels"),
    ("announcements", "level_id", "levels"),
    ("modules", "group_id", "groups"),
    ("module_sections", "module_id", "modules"),
    ("files", "section_id", "module_sections"),
];

const SESSION_TTL_SECONDS: i64 = 3600;

struct MemoryUser {
    id: String,
    email: String,
    password_hash: String,
}

impl MemoryUser {
    fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id.clone(),
            email: Some(self.email.clone()),
        }
    }
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Value>>,
    objects: HashMap<String, StoredObject>,
    users: Vec<MemoryUser>,
    sessions: HashMap<String, String>,
    last_timestamp: Option<DateTime<Utc>>,
    failing_inserts: HashSet<String>,
    failing_deletes: HashSet<String>,
    failing_selects: HashMap<String, ServiceError>,
    failing_removes: bool,
}

impl MemoryState {
    fn next_timestamp(&mut self) -> String {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn require_session(&self, access: Access<'_>) -> Result<(), ServiceError> {
        match access.token() {
            Some(token) if self.sessions.contains_key(token) => Ok(()),
            _ => Err(ServiceError::unauthorized(
                "new row violates row-level security policy",
            )
            .with_code("42501")),
        }
    }

    fn check_foreign_keys(&self, table: &str, row: &Value) -> Result<(), ServiceError> {
        for (child, column, parent) in FOREIGN_KEYS {
            if *child != table {
                continue;
            }
            let Some(reference) = row.get(*column).filter(|value| !value.is_null()) else {
                continue;
            };
            let exists = self
                .tables
                .get(*parent)
                .is_some_and(|rows| rows.iter().any(|candidate| candidate.get("id") == Some(reference)));
            if !exists {
                return Err(ServiceError::new(
                    409,
                    format!("insert or update on table \"{table}\" violates foreign key constraint on \"{column}\""),
                )
                .with_code("23503"));
            }
        }
        Ok(())
    }

    fn delete_cascading(&mut self, table: &str, filters: &[Filter]) -> usize {
        let rows = self.tables.entry(table.to_string()).or_default();
        let (removed, kept): (Vec<Value>, Vec<Value>) = rows
            .drain(..)
            .partition(|row| filters.iter().all(|filter| filter.matches(row)));
        *rows = kept;

        for row in &removed {
            let Some(id) = row.get("id").cloned() else {
                continue;
            };
            for (child, column, parent) in FOREIGN_KEYS {
                if *parent == table {
                    self.delete_cascading(child, &[Filter::eq(*column, id.clone())]);
                }
            }
        }

        removed.len()
    }
}

/// In-process implementation of the data service contract.
///
/// Foreign keys from [`FOREIGN_KEYS`] are checked on insert/update and
/// cascade on delete, the way the hosted store enforces them.
pub struct MemoryBackend {
    bucket: String,
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub async fn add_user(&self, email: &str, password: &str) -> Result<AuthUser, ServiceError> {
        let password_hash = hash_password(password)
            .map_err(|err| ServiceError::new(500, format!("failed to hash password: {err}")))?;
        let user = MemoryUser {
            id: Uuid::new_v4().to_string(),
            email: email.trim().to_lowercase(),
            password_hash,
        };
        let auth_user = user.to_auth_user();
        self.state.lock().await.users.push(user);
        Ok(auth_user)
    }
}

/// Failure injection and inspection used by tests.
#[cfg(test)]
impl MemoryBackend {
    /// Makes the next read of `table` fail once with `err`.
    pub async fn fail_next_select(&self, table: &str, err: ServiceError) {
        self.state
            .lock()
            .await
            .failing_selects
            .insert(table.to_string(), err);
    }

    /// Makes the next storage removal fail once.
    pub async fn fail_next_remove(&self) {
        self.state.lock().await.failing_removes = true;
    }

    /// Makes the next insert into `table` fail once.
    pub async fn fail_next_insert(&self, table: &str) {
        self.state
            .lock()
            .await
            .failing_inserts
            .insert(table.to_string());
    }

    /// Makes the next delete from `table` fail once.
    pub async fn fail_next_delete(&self, table: &str) {
        self.state
            .lock()
            .await
            .failing_deletes
            .insert(table.to_string());
    }

    pub async fn rows(&self, table: &str) -> Vec<Value> {
        self.state
            .lock()
            .await
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn object_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.state.lock().await.objects.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl TableApi for MemoryBackend {
    async fn select(&self, _access: Access<'_>, query: &Query) -> Result<Vec<Value>, ServiceError> {
        let mut state = self.state.lock().await;
        if let Some(err) = state.failing_selects.remove(&query.table) {
            return Err(err);
        }
        let rows = state
            .tables
            .get(&query.table)
            .map(|rows| query.apply(rows))
            .unwrap_or_default();
        Ok(rows)
    }

    async fn count(&self, _access: Access<'_>, table: &str) -> Result<u64, ServiceError> {
        let state = self.state.lock().await;
        Ok(state.tables.get(table).map_or(0, |rows| rows.len() as u64))
    }

    async fn insert(
        &self,
        access: Access<'_>,
        table: &str,
        rows: Vec<Value>,
    ) -> Result<Vec<Value>, ServiceError> {
        let mut state = self.state.lock().await;
        state.require_session(access)?;
        if state.failing_inserts.remove(table) {
            return Err(ServiceError::new(500, format!("insert into {table} failed")));
        }

        let mut prepared = Vec::with_capacity(rows.len());
        for row in rows {
            let Value::Object(mut fields) = row else {
                return Err(ServiceError::new(400, "rows must be JSON objects").with_code("PGRST102"));
            };
            fields
                .entry("id")
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
            if !fields.contains_key("created_at") {
                let created_at = state.next_timestamp();
                fields.insert("created_at".to_string(), Value::String(created_at));
            }
            let row = Value::Object(fields);
            state.check_foreign_keys(table, &row)?;
            prepared.push(row);
        }

        state
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(prepared.iter().cloned());
        Ok(prepared)
    }

    async fn update(
        &self,
        access: Access<'_>,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, ServiceError> {
        let mut state = self.state.lock().await;
        state.require_session(access)?;
        let Value::Object(patch) = patch else {
            return Err(ServiceError::new(400, "patch must be a JSON object").with_code("PGRST102"));
        };

        let mut candidates = Vec::new();
        if let Some(rows) = state.tables.get(table) {
            for (index, row) in rows.iter().enumerate() {
                if filters.iter().all(|filter| filter.matches(row)) {
                    let mut merged: Map<String, Value> =
                        row.as_object().cloned().unwrap_or_default();
                    merged.extend(patch.clone());
                    candidates.push((index, Value::Object(merged)));
                }
            }
        }

        for (_, row) in &candidates {
            state.check_foreign_keys(table, row)?;
        }

        let rows = state.tables.entry(table.to_string()).or_default();
        for (index, row) in &candidates {
            rows[*index] = row.clone();
        }
        Ok(candidates.into_iter().map(|(_, row)| row).collect())
    }

    async fn delete(
        &self,
        access: Access<'_>,
        table: &str,
        filters: &[Filter],
    ) -> Result<usize, ServiceError> {
        let mut state = self.state.lock().await;
        state.require_session(access)?;
        if state.failing_deletes.remove(table) {
            return Err(ServiceError::new(500, format!("delete from {table} failed")));
        }
        Ok(state.delete_cascading(table, filters))
    }
}

#[async_trait]
impl StorageApi for MemoryBackend {
    async fn upload(
        &self,
        access: Access<'_>,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        state.require_session(access)?;
        if state.objects.contains_key(path) {
            return Err(ServiceError::new(409, "The resource already exists").with_code("Duplicate"));
        }
        state.objects.insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "/local-storage/{}/{}",
            self.bucket,
            path.trim_start_matches('/')
        )
    }

    fn object_path(&self, public_url: &str) -> Option<String> {
        object_path_under(public_url, &self.public_url(""))
    }

    async fn remove(&self, access: Access<'_>, paths: &[String]) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        state.require_session(access)?;
        if std::mem::take(&mut state.failing_removes) {
            return Err(ServiceError::new(500, "storage removal failed"));
        }
        for path in paths {
            state.objects.remove(path);
        }
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<StoredObject, ServiceError> {
        self.state
            .lock()
            .await
            .objects
            .get(path)
            .cloned()
            .ok_or_else(|| ServiceError::new(404, "Object not found"))
    }
}

#[async_trait]
impl AuthApi for MemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ServiceError> {
        let mut state = self.state.lock().await;
        let email = email.trim().to_lowercase();
        let user = state
            .users
            .iter()
            .find(|user| user.email == email && verify_password(password, &user.password_hash))
            .map(MemoryUser::to_auth_user)
            .ok_or_else(|| {
                ServiceError::new(400, "Invalid login credentials").with_code("invalid_grant")
            })?;

        let access_token = Uuid::new_v4().to_string();
        state.sessions.insert(access_token.clone(), user.id.clone());
        Ok(Session {
            access_token,
            expires_in: Some(SESSION_TTL_SECONDS),
            user,
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ServiceError> {
        self.state.lock().await.sessions.remove(access_token);
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>, ServiceError> {
        let state = self.state.lock().await;
        let Some(user_id) = state.sessions.get(access_token) else {
            return Ok(None);
        };
        Ok(state
            .users
            .iter()
            .find(|user| &user.id == user_id)
            .map(MemoryUser::to_auth_user))
    }

    async fn update_user(
        &self,
        access_token: &str,
        update: &UserUpdate,
    ) -> Result<AuthUser, ServiceError> {
        let password_hash = match update.password.as_deref() {
            Some(password) => Some(hash_password(password).map_err(|err| {
                ServiceError::new(500, format!("failed to hash password: {err}"))
            })?),
            None => None,
        };

        let mut state = self.state.lock().await;
        let user_id = state
            .sessions
            .get(access_token)
            .cloned()
            .ok_or_else(|| ServiceError::unauthorized("invalid JWT"))?;
        let user = state
            .users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or_else(|| ServiceError::new(404, "User not found"))?;

        if let Some(email) = update.email.as_deref() {
            user.email = email.trim().to_lowercase();
        }
        if let Some(hash) = password_hash {
            user.password_hash = hash;
        }
        Ok(user.to_auth_user())
    }
}

impl Backend for MemoryBackend {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }
}

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}
