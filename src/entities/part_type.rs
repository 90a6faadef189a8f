use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "part_types")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub expected_failure_interval_days: Option<i32>,
    pub created_by: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::device_type::Entity")]
    DeviceTypes,
    #[sea_orm(has_many = "super::replacement_suggestion::Entity")]
    ReplacementSuggestions,
}

impl Related<super::device_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceTypes.def()
    }
}

impl Related<super::replacement_suggestion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReplacementSuggestions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
