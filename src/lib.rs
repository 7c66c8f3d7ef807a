pub mod api;
pub mod chat;
pub mod checkout;
pub mod config;
pub mod db;
pub mod fraud;

pub use db::DbPool;

use chat::ConnectionRegistry;
use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    /// Live chat subscribers; one instance per process, threaded through
    /// every handler that needs it.
    pub registry: ConnectionRegistry,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, registry: ConnectionRegistry) -> Self {
        Self {
            config,
            db,
            registry,
            metrics_handle: None,
        }
    }

    /// Set the Prometheus metrics handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
