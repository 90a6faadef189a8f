//! In-memory collaborators, used by tests and dry runs.

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

use super::{
    DeviceReader, DeviceWarranty, LocationReader, LocationRecord, NewSuggestion,
    SuggestionFilter, SuggestionStore,
};
use crate::entities::replacement_suggestion;
use crate::errors::ServiceError;

#[derive(Debug, Default, Clone)]
pub struct InMemoryLocationReader {
    records: Vec<LocationRecord>,
}

impl InMemoryLocationReader {
    pub fn new(records: Vec<LocationRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl LocationReader for InMemoryLocationReader {
    async fn fetch_all(&self) -> Result<Vec<LocationRecord>, ServiceError> {
        Ok(self.records.clone())
    }

    async fn fetch_one(
        &self,
        id: i64,
    ) -> Result<Option<(LocationRecord, Vec<LocationRecord>)>, ServiceError> {
        let Some(record) = self.records.iter().find(|r| r.id == id).cloned() else {
            return Ok(None);
        };
        let children = self
            .records
            .iter()
            .filter(|r| r.parent_id == Some(id))
            .cloned()
            .collect();
        Ok(Some((record, children)))
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryDeviceReader {
    devices: Vec<DeviceWarranty>,
}

impl InMemoryDeviceReader {
    pub fn new(devices: Vec<DeviceWarranty>) -> Self {
        Self { devices }
    }
}

#[async_trait]
impl DeviceReader for InMemoryDeviceReader {
    async fn fetch_all(&self) -> Result<Vec<DeviceWarranty>, ServiceError> {
        Ok(self.devices.clone())
    }
}

/// Suggestion store keeping rows in insertion order; ids start at 1
#[derive(Debug, Default)]
pub struct InMemorySuggestionStore {
    rows: Mutex<Vec<replacement_suggestion::Model>>,
}

impl InMemorySuggestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<replacement_suggestion::Model>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    /// Copy of every stored row
    pub fn snapshot(&self) -> Vec<replacement_suggestion::Model> {
        self.rows.lock().map(|rows| rows.clone()).unwrap_or_default()
    }

    fn rows(&self) -> Result<MutexGuard<'_, Vec<replacement_suggestion::Model>>, ServiceError> {
        self.rows
            .lock()
            .map_err(|_| ServiceError::InternalError("suggestion store lock poisoned".into()))
    }
}

#[async_trait]
impl SuggestionStore for InMemorySuggestionStore {
    async fn find(
        &self,
        filter: SuggestionFilter,
    ) -> Result<Vec<replacement_suggestion::Model>, ServiceError> {
        let mut found: Vec<_> = self
            .rows()?
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.suggestion_date
                .cmp(&a.suggestion_date)
                .then(b.id.cmp(&a.id))
        });
        Ok(found)
    }

    async fn create(
        &self,
        suggestion: NewSuggestion,
    ) -> Result<replacement_suggestion::Model, ServiceError> {
        let mut rows = self.rows()?;
        let id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let model = replacement_suggestion::Model {
            id,
            part_type_id: suggestion.part_type_id,
            suggestion_date: suggestion.suggestion_date,
            forecast_replacement_date: suggestion.forecast_replacement_date,
            generated_by: suggestion.generated_by,
            status: suggestion.status,
            comments: suggestion.comments,
        };
        rows.push(model.clone());
        Ok(model)
    }
}
