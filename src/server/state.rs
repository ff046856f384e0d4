use axum::extract::FromRef;

use crate::background_jobs::JobLauncher;
use crate::catalog_store::CatalogStore;
use crate::server_store::ServerStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedCatalogStore = Arc<dyn CatalogStore>;
pub type GuardedServerStore = Arc<dyn ServerStore>;
pub type GuardedJobLauncher = Arc<JobLauncher>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub catalog_store: GuardedCatalogStore,
    pub server_store: GuardedServerStore,
    pub launcher: GuardedJobLauncher,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedCatalogStore {
    fn from_ref(input: &ServerState) -> Self {
        input.catalog_store.clone()
    }
}

impl FromRef<ServerState> for GuardedServerStore {
    fn from_ref(input: &ServerState) -> Self {
        input.server_store.clone()
    }
}

impl FromRef<ServerState> for GuardedJobLauncher {
    fn from_ref(input: &ServerState) -> Self {
        input.launcher.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
