use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::repositories::SuggestionFilter;
use crate::services::replacement_suggestions::ReplacementSuggestionView;

/// Query parameters for listing replacement suggestions
#[derive(Debug, Default, Deserialize, Validate, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct SuggestionQuery {
    /// Only suggestions for this part type
    pub part_type_id: Option<i64>,
    /// Workflow status, e.g. `pending`
    #[validate(length(min = 1, max = 20))]
    pub status: Option<String>,
    /// Earliest suggestion date (inclusive)
    pub date_from: Option<NaiveDate>,
    /// Latest suggestion date (inclusive)
    pub date_to: Option<NaiveDate>,
}

impl From<SuggestionQuery> for SuggestionFilter {
    fn from(query: SuggestionQuery) -> Self {
        Self {
            part_type_id: query.part_type_id,
            status: query.status,
            date_from: query.date_from,
            date_to: query.date_to,
        }
    }
}

/// Replacement suggestions, newest first
#[utoipa::path(
    get,
    path = "/api/v1/replacement-suggestions",
    params(SuggestionQuery),
    responses(
        (status = 200, description = "Matching suggestions", body = Vec<ReplacementSuggestionView>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "Replacement Suggestions"
)]
pub async fn list_suggestions(
    State(state): State<AppState>,
    Query(query): Query<SuggestionQuery>,
) -> Result<Json<Vec<ReplacementSuggestionView>>, ServiceError> {
    query.validate()?;
    let suggestions = state.services.suggestions.find(query.into()).await?;
    Ok(Json(suggestions))
}

/// Replacement suggestions for one part type
#[utoipa::path(
    get,
    path = "/api/v1/part-types/{id}/replacement-suggestions",
    params(
        ("id" = i64, Path, description = "Part type ID")
    ),
    responses(
        (status = 200, description = "Suggestions for the part type", body = Vec<ReplacementSuggestionView>),
        (status = 404, description = "Part type not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Replacement Suggestions"
)]
pub async fn list_part_type_suggestions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ReplacementSuggestionView>>, ServiceError> {
    let suggestions = state.services.suggestions.list_for_part_type(id).await?;
    Ok(Json(suggestions))
}
