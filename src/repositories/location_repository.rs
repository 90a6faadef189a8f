use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::{BaseRepository, DeviceSummary, LocationReader, LocationRecord, Repository};
use crate::entities::{device, location};
use crate::errors::ServiceError;

/// sea-orm backed [`LocationReader`]
#[derive(Debug, Clone)]
pub struct LocationRepository {
    base: BaseRepository,
}

impl LocationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Devices grouped by location, restricted to `location_ids` when given
    async fn devices_by_location(
        &self,
        location_ids: Option<Vec<i64>>,
    ) -> Result<HashMap<i64, Vec<DeviceSummary>>, ServiceError> {
        let mut query = device::Entity::find()
            .filter(device::Column::CurrentLocationId.is_not_null())
            .order_by_asc(device::Column::Id);
        if let Some(ids) = location_ids {
            query = query.filter(device::Column::CurrentLocationId.is_in(ids));
        }

        let devices = query.all(self.base.get_db()).await?;

        let mut grouped: HashMap<i64, Vec<DeviceSummary>> = HashMap::new();
        for d in devices {
            if let Some(location_id) = d.current_location_id {
                grouped.entry(location_id).or_default().push(DeviceSummary {
                    id: d.id,
                    serial_number: d.serial_number,
                    status: d.status,
                });
            }
        }
        Ok(grouped)
    }
}

fn to_record(
    model: location::Model,
    devices: &mut HashMap<i64, Vec<DeviceSummary>>,
) -> LocationRecord {
    LocationRecord {
        devices: devices.remove(&model.id).unwrap_or_default(),
        id: model.id,
        name: model.name,
        parent_id: model.parent_id,
        description: model.description,
        created_by: model.created_by,
    }
}

#[async_trait]
impl LocationReader for LocationRepository {
    async fn fetch_all(&self) -> Result<Vec<LocationRecord>, ServiceError> {
        let locations = location::Entity::find()
            .order_by_asc(location::Column::Id)
            .all(self.base.get_db())
            .await?;
        let mut devices = self.devices_by_location(None).await?;

        debug!(locations = locations.len(), "Loaded locations");

        Ok(locations
            .into_iter()
            .map(|model| to_record(model, &mut devices))
            .collect())
    }

    async fn fetch_one(
        &self,
        id: i64,
    ) -> Result<Option<(LocationRecord, Vec<LocationRecord>)>, ServiceError> {
        let db = self.base.get_db();
        let Some(model) = location::Entity::find_by_id(id).one(db).await? else {
            return Ok(None);
        };

        let children = location::Entity::find()
            .filter(location::Column::ParentId.eq(id))
            .order_by_asc(location::Column::Id)
            .all(db)
            .await?;

        let mut ids: Vec<i64> = children.iter().map(|c| c.id).collect();
        ids.push(model.id);
        let mut devices = self.devices_by_location(Some(ids)).await?;

        let record = to_record(model, &mut devices);
        let children = children
            .into_iter()
            .map(|child| to_record(child, &mut devices))
            .collect();

        Ok(Some((record, children)))
    }
}
