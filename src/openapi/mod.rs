use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Asset Tracker API",
        version = "0.1.0",
        description = r#"
# Asset Tracker API

Read API for an equipment tracking backend.

## Features

- **Location hierarchy**: locations assembled into a tree, with the devices placed at each location
- **Replacement suggestions**: part types due for replacement, produced daily from expired device warranties

## Error Handling

Errors share one response format:

```json
{
  "error": "Not Found",
  "message": "Not found: Location 42 not found",
  "request_id": "1c6b0e0a-5f8e-4a8b-9b43-3f3f1f0c2a11",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

Every response carries an `x-request-id` header; a caller-supplied value is echoed back.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Locations", description = "Location hierarchy endpoints"),
        (name = "Replacement Suggestions", description = "Replacement suggestion endpoints"),
        (name = "Health", description = "Health and status endpoints")
    ),
    paths(
        // Locations
        crate::handlers::locations::list_locations,
        crate::handlers::locations::get_location,

        // Replacement suggestions
        crate::handlers::replacement_suggestions::list_suggestions,
        crate::handlers::replacement_suggestions::list_part_type_suggestions,

        // Status & health
        crate::api_status,
        crate::health_check,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::StatusInfo,

            // Locations
            crate::services::locations::LocationNode,
            crate::repositories::DeviceSummary,

            // Replacement suggestions
            crate::services::replacement_suggestions::ReplacementSuggestionView,
            crate::services::replacement_suggestions::PartTypeRef,
            crate::handlers::replacement_suggestions::SuggestionQuery,

            // Health
            crate::health::HealthInfo,
            crate::health::HealthDetail,
            crate::health::HealthStatus,
            crate::jobs::expired_warranty::WarrantyJobStatus,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_the_read_api() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Asset Tracker API"));
        assert!(json.contains("/api/v1/locations"));
        assert!(json.contains("LocationNode"));
    }

    #[test]
    fn path_parameters_are_templated() {
        let openapi = ApiDocV1::openapi();
        let paths = &openapi.paths.paths;

        assert!(paths.contains_key("/api/v1/locations/{id}"));
        assert!(paths.contains_key("/api/v1/part-types/{id}/replacement-suggestions"));
        assert!(paths.keys().all(|path| !path.contains("/:")));
    }
}
