use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::entities::{part_type, replacement_suggestion};
use crate::errors::ServiceError;
use crate::repositories::{SuggestionFilter, SuggestionRepository};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PartTypeRef {
    pub id: i64,
    #[schema(example = "Power supply")]
    pub name: String,
}

/// Replacement suggestion with its part type resolved
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReplacementSuggestionView {
    pub id: i64,
    pub part_type_id: i64,
    pub part_type: Option<PartTypeRef>,
    pub suggestion_date: NaiveDate,
    pub forecast_replacement_date: NaiveDate,
    #[schema(example = "system:expired_warranty")]
    pub generated_by: String,
    #[schema(example = "pending")]
    pub status: String,
    pub comments: Option<String>,
}

impl ReplacementSuggestionView {
    fn from_parts(
        suggestion: replacement_suggestion::Model,
        part_type: Option<part_type::Model>,
    ) -> Self {
        Self {
            id: suggestion.id,
            part_type_id: suggestion.part_type_id,
            part_type: part_type.map(|pt| PartTypeRef {
                id: pt.id,
                name: pt.name,
            }),
            suggestion_date: suggestion.suggestion_date,
            forecast_replacement_date: suggestion.forecast_replacement_date,
            generated_by: suggestion.generated_by,
            status: suggestion.status,
            comments: suggestion.comments,
        }
    }
}

/// Read-side queries over replacement suggestions
#[derive(Clone)]
pub struct ReplacementSuggestionService {
    repository: Arc<SuggestionRepository>,
}

impl ReplacementSuggestionService {
    pub fn new(repository: Arc<SuggestionRepository>) -> Self {
        Self { repository }
    }

    /// Suggestions matching `filter`, newest first. An inverted date range
    /// yields an empty list.
    #[instrument(skip(self))]
    pub async fn find(
        &self,
        filter: SuggestionFilter,
    ) -> Result<Vec<ReplacementSuggestionView>, ServiceError> {
        if filter.is_empty_range() {
            debug!("date_from is after date_to; nothing to query");
            return Ok(Vec::new());
        }

        let rows = self.repository.find_with_part_type(&filter).await?;
        Ok(rows
            .into_iter()
            .map(|(s, pt)| ReplacementSuggestionView::from_parts(s, pt))
            .collect())
    }

    /// All suggestions for one part type; unknown part type is NotFound
    #[instrument(skip(self))]
    pub async fn list_for_part_type(
        &self,
        part_type_id: i64,
    ) -> Result<Vec<ReplacementSuggestionView>, ServiceError> {
        if self.repository.find_part_type(part_type_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!(
                "Part type {} not found",
                part_type_id
            )));
        }

        self.find(SuggestionFilter {
            part_type_id: Some(part_type_id),
            ..Default::default()
        })
        .await
    }
}
