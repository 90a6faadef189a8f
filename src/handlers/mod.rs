pub mod locations;
pub mod replacement_suggestions;

use std::sync::Arc;

use crate::clock::SystemClock;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::repositories::{DeviceRepository, LocationRepository, SuggestionRepository};
use crate::services::{
    locations::LocationService, replacement_suggestions::ReplacementSuggestionService,
    warranty_suggestions::WarrantySuggestionGenerator,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer used by HTTP handlers, the CLI and the background job
#[derive(Clone)]
pub struct AppServices {
    pub locations: Arc<LocationService>,
    pub suggestions: Arc<ReplacementSuggestionService>,
    pub warranty_generator: Arc<WarrantySuggestionGenerator>,
}

impl AppServices {
    /// Wires the sea-orm repositories into the services
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        let suggestion_repository = Arc::new(SuggestionRepository::new(db_pool.clone()));

        let locations = Arc::new(LocationService::new(Arc::new(LocationRepository::new(
            db_pool.clone(),
        ))));
        let suggestions = Arc::new(ReplacementSuggestionService::new(
            suggestion_repository.clone(),
        ));
        let warranty_generator = Arc::new(WarrantySuggestionGenerator::new(
            Arc::new(DeviceRepository::new(db_pool)),
            suggestion_repository,
            Arc::new(SystemClock::new(config.scheduler_offset())),
            config.storage_call_timeout(),
        ));

        Self {
            locations,
            suggestions,
            warranty_generator,
        }
    }
}
