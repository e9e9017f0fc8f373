//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::EngineConfig;
use crate::services::{FulfillmentService, ScanService};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: EngineConfig,
    pool: PgPool,
    fulfillment: FulfillmentService,
    scan: ScanService,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: EngineConfig, pool: PgPool) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                fulfillment: FulfillmentService::new(pool.clone()),
                scan: ScanService::new(pool.clone()),
                config,
                pool,
            }),
        }
    }

    /// Get a reference to the engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the fulfillment service.
    #[must_use]
    pub fn fulfillment(&self) -> &FulfillmentService {
        &self.inner.fulfillment
    }

    /// Get a reference to the scan service.
    #[must_use]
    pub fn scan(&self) -> &ScanService {
        &self.inner.scan
    }
}
