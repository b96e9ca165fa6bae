use chrono::Utc;
use tracing::{debug, info};

use shared_database::catalog;
use shared_models::catalog::{CatalogEntry, NewCatalogEntry};
use shared_utils::AppState;

use crate::models::MedicationError;

pub const MIN_SEARCH_LENGTH: usize = 2;
pub const SEARCH_LIMIT: usize = 50;

pub struct CatalogService {
    state: AppState,
}

impl CatalogService {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
        }
    }

    pub async fn list(&self) -> Result<Vec<CatalogEntry>, MedicationError> {
        let entries = self.state.db.run(|conn| catalog::list_catalog(conn)).await?;
        Ok(entries)
    }

    /// Short queries return nothing rather than the whole catalog.
    pub async fn search(&self, query: Option<String>) -> Result<Vec<CatalogEntry>, MedicationError> {
        let query = query.unwrap_or_default();
        if query.chars().count() < MIN_SEARCH_LENGTH {
            return Ok(Vec::new());
        }
        debug!("Searching medication catalog for '{}'", query);

        let entries = self
            .state
            .db
            .run(move |conn| catalog::search_catalog(conn, &query, SEARCH_LIMIT))
            .await?;
        Ok(entries)
    }

    pub async fn import(&self, entries: Vec<NewCatalogEntry>) -> Result<usize, MedicationError> {
        debug!("Importing {} catalog row(s)", entries.len());

        let imported = self
            .state
            .db
            .run(move |conn| catalog::replace_catalog(conn, &entries, Utc::now()))
            .await?;

        info!("Medication catalog replaced with {} entries", imported);
        Ok(imported)
    }
}
