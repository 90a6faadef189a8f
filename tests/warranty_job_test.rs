mod common;

use std::sync::Arc;
use std::time::Duration;

use asset_tracker::{
    clock::FixedClock,
    entities::replacement_suggestion::{GENERATED_BY_EXPIRED_WARRANTY, STATUS_PENDING},
    jobs::expired_warranty::{run_once, WarrantyJobState},
    repositories::{DeviceRepository, SuggestionFilter, SuggestionRepository, SuggestionStore},
    services::warranty_suggestions::{suggestion_comment, WarrantySuggestionGenerator},
};
use common::{date, TestApp};

fn generator_on(app: &TestApp, today: chrono::NaiveDate) -> WarrantySuggestionGenerator {
    WarrantySuggestionGenerator::new(
        Arc::new(DeviceRepository::new(app.db.clone())),
        Arc::new(SuggestionRepository::new(app.db.clone())),
        Arc::new(FixedClock(today)),
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn two_expired_devices_of_one_part_type_yield_one_suggestion() {
    let app = TestApp::new().await;
    let today = date(2024, 6, 1);
    let part = app.seed_part_type("Power supply").await;
    let kind = app.seed_device_type(part.id).await;
    let first = app
        .seed_device("PSU-1", kind.id, Some(date(2024, 5, 1)), None)
        .await;
    app.seed_device("PSU-2", kind.id, Some(today), None).await;
    app.seed_device("PSU-3", kind.id, Some(date(2024, 6, 2)), None)
        .await;
    app.seed_device("PSU-4", kind.id, None, None).await;

    let report = generator_on(&app, today).run().await.unwrap();

    assert_eq!(report.devices_scanned, 4);
    assert_eq!(report.expired_devices, 2);
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.skipped_existing, 1);
    assert_eq!(report.failed, 0);

    let created = &report.created[0];
    assert_eq!(created.part_type_id, part.id);
    assert_eq!(created.suggestion_date, today);
    assert_eq!(created.forecast_replacement_date, today);
    assert_eq!(created.generated_by, GENERATED_BY_EXPIRED_WARRANTY);
    assert_eq!(created.status, STATUS_PENDING);
    assert_eq!(
        created.comments.as_deref(),
        Some(suggestion_comment(first.id, date(2024, 5, 1)).as_str())
    );
}

#[tokio::test]
async fn existing_suggestion_for_the_day_blocks_a_new_one() {
    let app = TestApp::new().await;
    let today = date(2024, 6, 1);
    let part = app.seed_part_type("Fan").await;
    let kind = app.seed_device_type(part.id).await;
    app.seed_device("FAN-1", kind.id, Some(date(2023, 1, 1)), None)
        .await;
    app.seed_suggestion(part.id, today, "approved").await;

    let report = generator_on(&app, today).run().await.unwrap();

    assert!(report.created.is_empty());
    assert_eq!(report.skipped_existing, 1);
}

#[tokio::test]
async fn each_day_gets_its_own_suggestion_and_reruns_are_no_ops() {
    let app = TestApp::new().await;
    let part = app.seed_part_type("Disk").await;
    let kind = app.seed_device_type(part.id).await;
    app.seed_device("DSK-1", kind.id, Some(date(2024, 1, 1)), None)
        .await;

    let monday = generator_on(&app, date(2024, 6, 3));
    assert_eq!(monday.run().await.unwrap().created.len(), 1);
    assert!(monday.run().await.unwrap().created.is_empty());

    let tuesday = generator_on(&app, date(2024, 6, 4));
    assert_eq!(tuesday.run().await.unwrap().created.len(), 1);

    let store = SuggestionRepository::new(app.db.clone());
    let rows = store
        .find(SuggestionFilter {
            part_type_id: Some(part.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn no_expired_devices_creates_nothing() {
    let app = TestApp::new().await;
    let part = app.seed_part_type("Screen").await;
    let kind = app.seed_device_type(part.id).await;
    app.seed_device("SCR-1", kind.id, Some(date(2030, 1, 1)), None)
        .await;

    let report = generator_on(&app, date(2024, 6, 1)).run().await.unwrap();

    assert_eq!(report.expired_devices, 0);
    assert!(report.created.is_empty());
}

#[tokio::test]
async fn job_run_updates_status_and_api_sees_the_suggestion() {
    let app = TestApp::new().await;
    let today = date(2024, 6, 1);
    let part = app.seed_part_type("Battery").await;
    let kind = app.seed_device_type(part.id).await;
    app.seed_device("BAT-1", kind.id, Some(date(2024, 1, 1)), None)
        .await;

    let state = WarrantyJobState::new(true);
    run_once(&generator_on(&app, today), &state).await;

    let status = state.snapshot().await;
    assert_eq!(status.last_run_date, Some(today));
    assert_eq!(status.last_run_ok, Some(true));
    assert_eq!(status.last_created, Some(1));

    let body = app
        .get_json(
            &format!("/api/v1/part-types/{}/replacement-suggestions", part.id),
            axum::http::StatusCode::OK,
        )
        .await;
    assert_eq!(body[0]["generated_by"], GENERATED_BY_EXPIRED_WARRANTY);
    assert_eq!(body[0]["suggestion_date"], "2024-06-01");
}
