//! Storage collaborators.
//!
//! The two core routines only see the traits declared here; the sea-orm
//! implementations live in the submodules and [`memory`] offers in-memory
//! versions for tests and tooling.

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::entities::replacement_suggestion;
use crate::errors::ServiceError;

pub mod device_repository;
pub mod location_repository;
pub mod memory;
pub mod suggestion_repository;

pub use device_repository::DeviceRepository;
pub use location_repository::LocationRepository;
pub use suggestion_repository::SuggestionRepository;

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Device as embedded in a location node
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeviceSummary {
    pub id: i64,
    #[schema(example = "SN-000123")]
    pub serial_number: String,
    #[schema(example = "active")]
    pub status: String,
}

/// Flat location row together with the devices currently placed there
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocationRecord {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub description: Option<String>,
    pub created_by: i64,
    pub devices: Vec<DeviceSummary>,
}

impl LocationRecord {
    /// Bare record without devices or description
    pub fn new(id: i64, name: impl Into<String>, parent_id: Option<i64>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id,
            description: None,
            created_by: 0,
            devices: Vec::new(),
        }
    }
}

/// What the warranty job needs to know about a device.
/// `part_type_id` is `None` when the device type could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceWarranty {
    pub device_id: i64,
    pub serial_number: String,
    pub part_type_id: Option<i64>,
    pub warranty_end: Option<NaiveDate>,
}

/// Filter for replacement suggestion lookups. Date bounds are inclusive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SuggestionFilter {
    pub part_type_id: Option<i64>,
    pub status: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl SuggestionFilter {
    /// Suggestions for one part type dated exactly `day`
    pub fn for_part_type_on(part_type_id: i64, day: NaiveDate) -> Self {
        Self {
            part_type_id: Some(part_type_id),
            status: None,
            date_from: Some(day),
            date_to: Some(day),
        }
    }

    /// True when `date_from` is after `date_to`, so nothing can match
    pub fn is_empty_range(&self) -> bool {
        matches!((self.date_from, self.date_to), (Some(from), Some(to)) if from > to)
    }

    pub fn matches(&self, suggestion: &replacement_suggestion::Model) -> bool {
        self.part_type_id
            .map_or(true, |id| suggestion.part_type_id == id)
            && self
                .status
                .as_deref()
                .map_or(true, |status| suggestion.status == status)
            && self
                .date_from
                .map_or(true, |from| suggestion.suggestion_date >= from)
            && self
                .date_to
                .map_or(true, |to| suggestion.suggestion_date <= to)
    }
}

/// Values for a suggestion about to be inserted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSuggestion {
    pub part_type_id: i64,
    pub suggestion_date: NaiveDate,
    pub forecast_replacement_date: NaiveDate,
    pub generated_by: String,
    pub status: String,
    pub comments: Option<String>,
}

#[async_trait]
pub trait LocationReader: Send + Sync {
    /// Every location with its devices, in storage order
    async fn fetch_all(&self) -> Result<Vec<LocationRecord>, ServiceError>;

    /// One location plus its direct children, or `None` when the id is unknown
    async fn fetch_one(
        &self,
        id: i64,
    ) -> Result<Option<(LocationRecord, Vec<LocationRecord>)>, ServiceError>;
}

#[async_trait]
pub trait DeviceReader: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<DeviceWarranty>, ServiceError>;
}

#[async_trait]
pub trait SuggestionStore: Send + Sync {
    async fn find(
        &self,
        filter: SuggestionFilter,
    ) -> Result<Vec<replacement_suggestion::Model>, ServiceError>;

    async fn create(
        &self,
        suggestion: NewSuggestion,
    ) -> Result<replacement_suggestion::Model, ServiceError>;
}
