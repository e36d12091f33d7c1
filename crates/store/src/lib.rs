pub mod http;

use std::sync::Arc;

use confidant_core::config::{CrmBackend, CrmConfig};
use confidant_core::errors::StoreError;
use confidant_core::store::{CrmStore, InMemoryCrmStore};

pub use http::HttpCrmStore;

/// Builds the store selected by `crm.backend`.
pub fn connect(config: &CrmConfig) -> Result<Arc<dyn CrmStore>, StoreError> {
    match config.backend {
        CrmBackend::Http => Ok(Arc::new(HttpCrmStore::new(config)?)),
        CrmBackend::Memory => Ok(Arc::new(InMemoryCrmStore::new())),
    }
}
