use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use std::sync::Arc;

use super::{BaseRepository, DeviceReader, DeviceWarranty, Repository};
use crate::entities::{device, device_type};
use crate::errors::ServiceError;

/// sea-orm backed [`DeviceReader`]. Each device is joined with its device type
/// so the part type is resolved in a single query.
#[derive(Debug, Clone)]
pub struct DeviceRepository {
    base: BaseRepository,
}

impl DeviceRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl DeviceReader for DeviceRepository {
    async fn fetch_all(&self) -> Result<Vec<DeviceWarranty>, ServiceError> {
        let rows = device::Entity::find()
            .find_also_related(device_type::Entity)
            .order_by_asc(device::Column::Id)
            .all(self.base.get_db())
            .await?;

        Ok(rows
            .into_iter()
            .map(|(d, dt)| DeviceWarranty {
                device_id: d.id,
                serial_number: d.serial_number,
                part_type_id: dt.map(|t| t.part_type_id),
                warranty_end: d.warranty_end,
            })
            .collect())
    }
}
