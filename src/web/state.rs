use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::{
    config::{BackendKind, DEFAULT_ADMIN_PASSWORD, PortalConfig},
    remote::{Backend, MemoryBackend, RemoteClient},
    web::session::SessionRegistry,
};

#[derive(Clone)]
pub struct AppState {
    backend: Arc<dyn Backend>,
    config: Arc<PortalConfig>,
    sessions: SessionRegistry,
}

impl AppState {
    pub async fn new(config: PortalConfig) -> Result<Self> {
        let backend: Arc<dyn Backend> = match config.backend {
            BackendKind::Remote => Arc::new(RemoteClient::new(
                config.service_url.clone(),
                config.anon_key.clone(),
                config.bucket.clone(),
            )),
            BackendKind::Memory => Arc::new(seed_memory_backend(&config).await?),
        };
        info!(backend = backend.backend_tag(), bucket = %config.bucket, "data backend ready");

        Ok(Self::with_backend(backend, config))
    }

    pub fn with_backend(backend: Arc<dyn Backend>, config: PortalConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
            sessions: SessionRegistry::new(),
        }
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn serves_local_storage(&self) -> bool {
        self.config.backend == BackendKind::Memory
    }
}

async fn seed_memory_backend(config: &PortalConfig) -> Result<MemoryBackend> {
    let backend = MemoryBackend::new(config.bucket.clone());
    let admin = &config.seed_admin;
    backend
        .add_user(&admin.email, &admin.password)
        .await
        .context("failed to seed admin account")?;

    if admin.password == DEFAULT_ADMIN_PASSWORD {
        warn!(email = %admin.email, "seeded admin account uses the default password; set PORTAL_ADMIN_PASSWORD");
    } else {
        info!(email = %admin.email, "seeded admin account");
    }
    Ok(backend)
}
