//! Typed operations over the content hierarchy.
//!
//! Level → Group → Module → Section → File, plus Level → Announcement and the
//! singleton site settings row. Every mutation returns `Result<_, ContentError>`
//! and leaves presentation to the caller.

pub mod account;
pub mod announcements;
pub mod files;
pub mod groups;
pub mod levels;
pub mod models;
pub mod modules;
pub mod settings;
pub mod stats;

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::remote::ServiceError;

pub const LEVELS: &str = "levels";
pub const GROUPS: &str = "groups";
pub const MODULES: &str = "modules";
pub const SECTIONS: &str = "module_sections";
pub const FILES: &str = "files";
pub const ANNOUNCEMENTS: &str = "announcements";
pub const SETTINGS: &str = "settings";

#[derive(Debug)]
pub enum ContentError {
    /// Input rejected before reaching the store. Carries a stable reason code.
    Invalid(&'static str),
    NotFound(&'static str),
    Service(ServiceError),
    /// A multi-step write failed after a side effect that could not be undone.
    Partial {
        step: &'static str,
        leftover: Leftover,
        source: ServiceError,
    },
}

/// What a failed multi-step write left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leftover {
    /// A module row exists without its default sections.
    ModuleWithoutSections,
    /// Uploaded objects are still in storage without a row pointing at them.
    StoredObjects,
}

impl ContentError {
    /// Short code used in admin redirects (`?error=<code>`).
    pub fn flash_code(&self) -> &'static str {
        match self {
            ContentError::Invalid(reason) => reason,
            ContentError::NotFound(_) => "not_found",
            ContentError::Service(_) => "service",
            ContentError::Partial {
                leftover: Leftover::ModuleWithoutSections,
                ..
            } => "partial_sections",
            ContentError::Partial {
                leftover: Leftover::StoredObjects,
                ..
            } => "partial_storage",
        }
    }

    /// Raw provider message, when there is one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ContentError::Service(err) | ContentError::Partial { source: err, .. } => {
                Some(err.message())
            }
            _ => None,
        }
    }
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentError::Invalid(reason) => write!(f, "invalid input: {reason}"),
            ContentError::NotFound(what) => write!(f, "{what} not found"),
            ContentError::Service(err) => write!(f, "data service error: {err}"),
            ContentError::Partial { step, source, .. } => {
                write!(f, "{step} failed after a partial write: {source}")
            }
        }
    }
}

impl std::error::Error for ContentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContentError::Service(err) | ContentError::Partial { source: err, .. } => Some(err),
            _ => None,
        }
    }
}

impl From<ServiceError> for ContentError {
    fn from(err: ServiceError) -> Self {
        ContentError::Service(err)
    }
}

pub type ContentResult<T> = Result<T, ContentError>;

pub(crate) fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> ContentResult<Vec<T>> {
    rows.into_iter().map(decode_row).collect()
}

pub(crate) fn decode_row<T: DeserializeOwned>(row: Value) -> ContentResult<T> {
    serde_json::from_value(row).map_err(|err| {
        ContentError::Service(ServiceError::new(
            500,
            format!("unexpected row shape: {err}"),
        ))
    })
}

/// Decodes the first row, reporting `what` as missing when there is none.
pub(crate) fn decode_single<T: DeserializeOwned>(
    rows: Vec<Value>,
    what: &'static str,
) -> ContentResult<T> {
    match rows.into_iter().next() {
        Some(row) => decode_row(row),
        None => Err(ContentError::NotFound(what)),
    }
}

/// Trims optional free text, mapping blank input to `None`.
pub(crate) fn clean_optional(input: Option<&str>) -> Option<String> {
    input
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::remote::MemoryBackend;

    pub const ADMIN_EMAIL: &str = "admin@example.com";
    pub const ADMIN_PASSWORD: &str = "change-me";

    /// Memory backend with one admin account and a live session token.
    pub async fn backend_with_admin() -> (Arc<MemoryBackend>, String) {
        use crate::remote::AuthApi;

        let backend = Arc::new(MemoryBackend::new("platform-files"));
        backend
            .add_user(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .expect("seed admin");
        let session = backend
            .sign_in_with_password(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .expect("sign in");
        (backend, session.access_token)
    }
}
