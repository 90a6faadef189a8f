use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub serial_number: String,
    pub type_id: i64,
    pub purchase_date: Option<NaiveDate>,
    pub warranty_end: Option<NaiveDate>,
    pub current_location_id: Option<i64>,
    pub status: String,
    pub created_by: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::device_type::Entity",
        from = "Column::TypeId",
        to = "super::device_type::Column::Id"
    )]
    DeviceType,
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::CurrentLocationId",
        to = "super::location::Column::Id"
    )]
    CurrentLocation,
}

impl Related<super::device_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceType.def()
    }
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CurrentLocation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
