use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Origin tag written by the expired-warranty job.
pub const GENERATED_BY_EXPIRED_WARRANTY: &str = "system:expired_warranty";

/// Initial workflow state of a suggestion.
pub const STATUS_PENDING: &str = "pending";

/// Recommendation that a part type is due for replacement. Suggestions are
/// keyed by part type, not by device.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "replacement_suggestions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub part_type_id: i64,
    pub suggestion_date: NaiveDate,
    pub forecast_replacement_date: NaiveDate,
    pub generated_by: String,
    pub status: String,
    pub comments: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::part_type::Entity",
        from = "Column::PartTypeId",
        to = "super::part_type::Column::Id"
    )]
    PartType,
}

impl Related<super::part_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PartType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
