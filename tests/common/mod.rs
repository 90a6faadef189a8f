#![allow(dead_code)]

use std::sync::Arc;

use asset_tracker::{
    config::AppConfig,
    db,
    entities::{device, device_type, location, part_type, replacement_suggestion},
    AppState,
};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Application backed by a fresh file-based SQLite database in a temp dir
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub db: Arc<DatabaseConnection>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("asset_tracker_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "development".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.warranty_job_enabled = false;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let state = AppState::new(db_arc.clone(), cfg.clone());
        let cors = asset_tracker::middleware_helpers::cors_layer_from_config(&cfg)
            .expect("development cors");
        let router = asset_tracker::build_router(state.clone(), cors);

        Self {
            router,
            state,
            db: db_arc,
            _dir: dir,
        }
    }

    pub async fn get(&self, uri: &str) -> axum::response::Response {
        self.get_with_headers(uri, &[]).await
    }

    pub async fn get_with_headers(
        &self,
        uri: &str,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method("GET").uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::empty()).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// GET and decode the JSON body, asserting the status
    pub async fn get_json(&self, uri: &str, expected: StatusCode) -> Value {
        let response = self.get(uri).await;
        assert_eq!(response.status(), expected, "unexpected status for {uri}");
        response_json(response).await
    }

    pub async fn seed_part_type(&self, name: &str) -> part_type::Model {
        part_type::ActiveModel {
            name: Set(name.to_string()),
            description: Set(None),
            expected_failure_interval_days: Set(Some(365)),
            created_by: Set(1),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed part type")
    }

    pub async fn seed_device_type(&self, part_type_id: i64) -> device_type::Model {
        device_type::ActiveModel {
            manufacturer: Set(Some("Acme".to_string())),
            model: Set(Some(format!("Model-{part_type_id}"))),
            expected_lifetime_months: Set(Some(36)),
            part_type_id: Set(part_type_id),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed device type")
    }

    pub async fn seed_location(&self, name: &str, parent_id: Option<i64>) -> location::Model {
        location::ActiveModel {
            name: Set(name.to_string()),
            parent_id: Set(parent_id),
            description: Set(None),
            created_by: Set(1),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed location")
    }

    pub async fn set_parent(&self, location: location::Model, parent_id: Option<i64>) {
        let mut active: location::ActiveModel = location.into();
        active.parent_id = Set(parent_id);
        active
            .update(self.db.as_ref())
            .await
            .expect("update location parent");
    }

    pub async fn seed_device(
        &self,
        serial: &str,
        type_id: i64,
        warranty_end: Option<NaiveDate>,
        location_id: Option<i64>,
    ) -> device::Model {
        device::ActiveModel {
            serial_number: Set(serial.to_string()),
            type_id: Set(type_id),
            purchase_date: Set(None),
            warranty_end: Set(warranty_end),
            current_location_id: Set(location_id),
            status: Set("active".to_string()),
            created_by: Set(1),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed device")
    }

    pub async fn seed_suggestion(
        &self,
        part_type_id: i64,
        day: NaiveDate,
        status: &str,
    ) -> replacement_suggestion::Model {
        replacement_suggestion::ActiveModel {
            part_type_id: Set(part_type_id),
            suggestion_date: Set(day),
            forecast_replacement_date: Set(day),
            generated_by: Set("manual".to_string()),
            status: Set(status.to_string()),
            comments: Set(None),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed suggestion")
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&body).expect("response body is json")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}
