//! Asset tracker library
//!
//! Equipment tracking backend: location hierarchy views and the daily
//! expired-warranty replacement suggestion job.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod clock;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod jobs;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod tracing;

use axum::{extract::State, middleware, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer};
use utoipa::ToSchema;

use crate::health::{HealthInfo, HealthState};
use crate::jobs::expired_warranty::WarrantyJobState;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub health: Arc<HealthState>,
}

impl AppState {
    /// Builds services and health state on top of an existing pool
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config);
        let job_state = WarrantyJobState::new(config.warranty_job_enabled);
        let health = Arc::new(HealthState::new(db.clone(), job_state));
        Self {
            db,
            config,
            services,
            health,
        }
    }

    pub fn warranty_job_state(&self) -> WarrantyJobState {
        self.health.warranty_job.clone()
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Service and build information
#[derive(Serialize, ToSchema)]
pub struct StatusInfo {
    pub status: String,
    pub service: String,
    pub version: String,
    pub git: String,
    pub build_time: String,
    pub environment: String,
    pub timestamp: String,
}

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        // Location hierarchy
        .route("/locations", get(handlers::locations::list_locations))
        .route("/locations/:id", get(handlers::locations::get_location))
        // Replacement suggestions
        .route(
            "/replacement-suggestions",
            get(handlers::replacement_suggestions::list_suggestions),
        )
        .route(
            "/part-types/:id/replacement-suggestions",
            get(handlers::replacement_suggestions::list_part_type_suggestions),
        )
}

/// Full application router: API, probes, docs, and the shared middleware stack
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let health_routes = health::health_routes(state.health.clone());

    Router::new()
        .route("/", get(|| async { "asset-tracker is running" }))
        .nest("/api/v1", api_v1_routes().with_state(state))
        .nest("/health", health_routes)
        .merge(openapi::swagger_ui())
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(crate::tracing::configure_http_tracing())
        .layer(middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
}

#[utoipa::path(
    get,
    path = "/api/v1/status",
    responses(
        (status = 200, description = "Service status", body = ApiResponse<StatusInfo>)
    ),
    tag = "Health"
)]
pub async fn api_status(State(state): State<AppState>) -> ApiResult<StatusInfo> {
    let status = StatusInfo {
        status: "ok".to_string(),
        service: "asset-tracker".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
        environment: state.config.environment.clone(),
        timestamp: Utc::now().to_rfc3339(),
    };

    Ok(Json(ApiResponse::success(status)))
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Database and warranty job health", body = ApiResponse<HealthInfo>)
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResult<HealthInfo> {
    let info = state.health.collect().await;
    Ok(Json(ApiResponse::success(info)))
}

pub mod prelude {
    pub use crate::clock::*;
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::repositories::*;
    pub use crate::services::locations::{build_location_tree, LocationNode, LocationService};
    pub use crate::services::replacement_suggestions::*;
    pub use crate::services::warranty_suggestions::*;
}
