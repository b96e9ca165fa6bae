use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::Database;

/// What every handler gets: configuration plus the one store handle
/// opened at process start.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Database,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database) -> Self {
        Self {
            config: Arc::new(config),
            db,
        }
    }
}
