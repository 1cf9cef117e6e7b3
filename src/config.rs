use std::{env, fmt, str::FromStr};

use anyhow::{Result, bail};
use tracing::warn;

pub const PLACEHOLDER_URL: &str = "https://placeholder.supabase.co";
pub const PLACEHOLDER_KEY: &str = "placeholder-key";
pub const DEFAULT_BUCKET: &str = "platform-files";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_UPLOAD_MB: usize = 50;
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@apex.local";
pub const DEFAULT_ADMIN_PASSWORD: &str = "change-me";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Remote,
    Memory,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "remote" | "supabase" => Ok(BackendKind::Remote),
            "memory" | "local" => Ok(BackendKind::Memory),
            other => bail!("unknown PORTAL_BACKEND `{other}` (expected `remote` or `memory`)"),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Remote => f.write_str("remote"),
            BackendKind::Memory => f.write_str("memory"),
        }
    }
}

/// Credentials for the admin account created in the memory backend.
#[derive(Clone)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub backend: BackendKind,
    pub service_url: String,
    pub anon_key: String,
    pub bucket: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub seed_admin: SeedAdmin,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let backend = match read("PORTAL_BACKEND") {
            Some(value) => value.parse()?,
            None => BackendKind::Remote,
        };

        let (service_url, anon_key) = match (read("SUPABASE_URL"), read("SUPABASE_ANON_KEY")) {
            (Some(url), Some(key)) => (url, key),
            (url, key) => {
                if backend == BackendKind::Remote {
                    warn!(
                        url_present = url.is_some(),
                        key_present = key.is_some(),
                        "SUPABASE_URL / SUPABASE_ANON_KEY missing; data service calls will fail"
                    );
                }
                (
                    url.unwrap_or_else(|| PLACEHOLDER_URL.to_string()),
                    key.unwrap_or_else(|| PLACEHOLDER_KEY.to_string()),
                )
            }
        };

        let port = match read("PORT") {
            Some(value) => match value.parse() {
                Ok(port) => port,
                Err(_) => bail!("PORT must be a port number, got `{value}`"),
            },
            None => DEFAULT_PORT,
        };

        let max_upload_mb = match read("MAX_UPLOAD_MB") {
            Some(value) => match value.parse::<usize>() {
                Ok(mb) if mb > 0 => mb,
                _ => bail!("MAX_UPLOAD_MB must be a positive integer, got `{value}`"),
            },
            None => DEFAULT_MAX_UPLOAD_MB,
        };

        Ok(Self {
            backend,
            service_url,
            anon_key,
            bucket: read("STORAGE_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            port,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            seed_admin: SeedAdmin {
                email: read("PORTAL_ADMIN_EMAIL")
                    .unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_string()),
                password: read("PORTAL_ADMIN_PASSWORD")
                    .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string()),
            },
        })
    }
}
