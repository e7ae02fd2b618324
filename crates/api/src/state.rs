//! Shared application state.

use std::sync::Arc;

use tablecat_core::{CatalogService, Directory, TableCatalog};
use tablecat_domain::{Config, Result};
use tablecat_infra::database::DbClient;
use tablecat_infra::directory::StaticDirectory;

/// State shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub service: Arc<CatalogService>,
    pub directory: Arc<dyn Directory>,
}

/// Wire the service graph from configuration.
pub fn build_state(config: Config) -> Result<AppState> {
    let catalog: Arc<dyn TableCatalog> = Arc::new(DbClient::from_config(&config.database)?);
    let directory: Arc<dyn Directory> = Arc::new(StaticDirectory);
    let service = Arc::new(CatalogService::new(
        catalog,
        Arc::clone(&directory),
        config.auth.enforced(),
    ));

    Ok(AppState { config: Arc::new(config), service, directory })
}
