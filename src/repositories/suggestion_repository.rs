use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::debug;

use super::{BaseRepository, NewSuggestion, Repository, SuggestionFilter, SuggestionStore};
use crate::entities::{part_type, replacement_suggestion};
use crate::errors::ServiceError;

use replacement_suggestion::Column;

/// sea-orm backed [`SuggestionStore`] with the read queries used by the API
#[derive(Debug, Clone)]
pub struct SuggestionRepository {
    base: BaseRepository,
}

fn apply_filter<Q>(query: Q, filter: &SuggestionFilter) -> Q
where
    Q: QueryFilter + QueryOrder,
{
    let mut query = query;
    if let Some(part_type_id) = filter.part_type_id {
        query = query.filter(Column::PartTypeId.eq(part_type_id));
    }
    if let Some(status) = &filter.status {
        query = query.filter(Column::Status.eq(status.clone()));
    }
    if let Some(from) = filter.date_from {
        query = query.filter(Column::SuggestionDate.gte(from));
    }
    if let Some(to) = filter.date_to {
        query = query.filter(Column::SuggestionDate.lte(to));
    }
    query
        .order_by_desc(Column::SuggestionDate)
        .order_by_desc(Column::Id)
}

impl SuggestionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Suggestions joined with their part type, newest first
    pub async fn find_with_part_type(
        &self,
        filter: &SuggestionFilter,
    ) -> Result<Vec<(replacement_suggestion::Model, Option<part_type::Model>)>, ServiceError> {
        let query = replacement_suggestion::Entity::find().find_also_related(part_type::Entity);
        let rows = apply_filter(query, filter).all(self.base.get_db()).await?;
        debug!(rows = rows.len(), "Loaded replacement suggestions");
        Ok(rows)
    }

    pub async fn find_part_type(&self, id: i64) -> Result<Option<part_type::Model>, ServiceError> {
        Ok(part_type::Entity::find_by_id(id)
            .one(self.base.get_db())
            .await?)
    }
}

#[async_trait]
impl SuggestionStore for SuggestionRepository {
    async fn find(
        &self,
        filter: SuggestionFilter,
    ) -> Result<Vec<replacement_suggestion::Model>, ServiceError> {
        let query = replacement_suggestion::Entity::find();
        Ok(apply_filter(query, &filter).all(self.base.get_db()).await?)
    }

    async fn create(
        &self,
        suggestion: NewSuggestion,
    ) -> Result<replacement_suggestion::Model, ServiceError> {
        let model = replacement_suggestion::ActiveModel {
            part_type_id: Set(suggestion.part_type_id),
            suggestion_date: Set(suggestion.suggestion_date),
            forecast_replacement_date: Set(suggestion.forecast_replacement_date),
            generated_by: Set(suggestion.generated_by),
            status: Set(suggestion.status),
            comments: Set(suggestion.comments),
            ..Default::default()
        };

        Ok(model.insert(self.base.get_db()).await?)
    }
}
