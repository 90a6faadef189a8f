use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Manufacturer/model combination. Each device type maps to exactly one part type.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "device_types")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub expected_lifetime_months: Option<i32>,
    pub part_type_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::part_type::Entity",
        from = "Column::PartTypeId",
        to = "super::part_type::Column::Id"
    )]
    PartType,
    #[sea_orm(has_many = "super::device::Entity")]
    Devices,
}

impl Related<super::part_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PartType.def()
    }
}

impl Related<super::device::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Devices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
