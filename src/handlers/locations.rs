use axum::{
    extract::{Path, State},
    Json,
};

use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::locations::LocationNode;

/// Full location hierarchy
#[utoipa::path(
    get,
    path = "/api/v1/locations",
    responses(
        (status = 200, description = "Location forest, roots in storage order", body = Vec<LocationNode>,
            headers(
                ("X-Request-Id" = String, description = "Unique request identifier"),
            )
        ),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "Locations"
)]
pub async fn list_locations(
    State(state): State<AppState>,
) -> Result<Json<Vec<LocationNode>>, ServiceError> {
    let tree = state.services.locations.location_tree().await?;
    Ok(Json(tree))
}

/// One location with its direct children
#[utoipa::path(
    get,
    path = "/api/v1/locations/{id}",
    params(
        ("id" = i64, Path, description = "Location ID")
    ),
    responses(
        (status = 200, description = "Location with direct children", body = LocationNode),
        (status = 404, description = "Location not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Locations"
)]
pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LocationNode>, ServiceError> {
    let node = state.services.locations.get_location(id).await?;
    Ok(Json(node))
}
