use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use async_trait::async_trait;
use crime_insights_analytics_models::{GroupCount, GroupKey};
use crime_insights_database::{DbError, IncidentStore, MemoryStore};
use crime_insights_database_models::{IncidentFilter, PageRequest};
use crime_insights_incident_models::{IncidentPatch, IncidentRecord, NewIncident};
use crime_insights_server::{AppState, configure};
use serde_json::{Value, json};

macro_rules! app {
    ($incidents:expr) => {
        app_with_store!(MemoryStore::with_incidents($incidents))
    };
}

macro_rules! app_with_store {
    ($store:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(Arc::new($store))))
                .configure(configure),
        )
        .await
    };
}

/// A store whose every operation fails.
struct UnavailableStore;

fn unavailable() -> DbError {
    DbError::Conversion {
        message: "connection refused".to_string(),
    }
}

#[async_trait]
impl IncidentStore for UnavailableStore {
    async fn create(&self, _: &NewIncident) -> Result<IncidentRecord, DbError> {
        Err(unavailable())
    }

    async fn get(&self, _: i64) -> Result<Option<IncidentRecord>, DbError> {
        Err(unavailable())
    }

    async fn update(&self, _: i64, _: &IncidentPatch) -> Result<Option<IncidentRecord>, DbError> {
        Err(unavailable())
    }

    async fn delete(&self, _: i64) -> Result<Option<IncidentRecord>, DbError> {
        Err(unavailable())
    }

    async fn count(&self, _: &IncidentFilter) -> Result<u64, DbError> {
        Err(unavailable())
    }

    async fn find(
        &self,
        _: &IncidentFilter,
        _: &PageRequest,
    ) -> Result<Vec<IncidentRecord>, DbError> {
        Err(unavailable())
    }

    async fn aggregate(&self, _: &IncidentFilter, _: GroupKey) -> Result<Vec<GroupCount>, DbError> {
        Err(unavailable())
    }

    async fn insert_many(&self, _: &[NewIncident]) -> Result<u64, DbError> {
        Err(unavailable())
    }

    async fn clear(&self) -> Result<u64, DbError> {
        Err(unavailable())
    }
}

fn incident(offense: &str, ward: &str, report_dat: &str) -> NewIncident {
    NewIncident {
        offense: Some(offense.to_string()),
        ward: Some(ward.to_string()),
        report_dat: Some(report_dat.parse().unwrap()),
        ..NewIncident::default()
    }
}

fn sample() -> Vec<NewIncident> {
    vec![
        incident("THEFT/OTHER", "2", "2025-03-07T22:15:00Z"),
        incident("THEFT/OTHER", "2", "2025-03-14T22:40:00Z"),
        incident("ROBBERY", "6", "2025-04-01T08:00:00Z"),
        incident("HOMICIDE", "8", "2024-12-30T23:59:00Z"),
    ]
}

#[actix_web::test]
async fn root_and_health_respond() {
    let app = app!(Vec::new());

    let root: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(root["ok"], json!(true));
    assert!(root["time"].is_string());

    let health: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/health").to_request(),
    )
    .await;
    assert_eq!(health["healthy"], json!(true));
}

#[actix_web::test]
async fn create_then_fetch_round_trip() {
    let app = app!(Vec::new());

    let req = test::TestRequest::post()
        .uri("/api/crimes")
        .set_json(json!({
            "OFFENSE": "BURGLARY",
            "WARD": "3",
            "REPORT_DAT": "2025-05-01T10:00:00Z"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["ok"], json!(true));
    assert_eq!(created["doc"]["OFFENSE"], json!("BURGLARY"));
    let id = created["doc"]["id"].as_i64().unwrap();

    let fetched: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri(&format!("/api/crimes/{id}")).to_request(),
    )
    .await;
    assert_eq!(fetched["doc"]["WARD"], json!("3"));
    assert_eq!(fetched["doc"]["SHIFT"], Value::Null);
}

#[actix_web::test]
async fn create_rejects_malformed_bodies() {
    let app = app!(Vec::new());

    let req = test::TestRequest::post()
        .uri("/api/crimes")
        .set_json(json!({ "REPORT_DAT": "not a date" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["ok"], json!(false));
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn missing_and_malformed_ids() {
    let app = app!(sample());

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/api/crimes/99").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "ok": false, "error": "Not found" }));

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/api/crimes/abc").to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp =
        test::call_service(&app, test::TestRequest::delete().uri("/api/crimes/99").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn update_distinguishes_null_from_omitted() {
    let app = app!(sample());

    let req = test::TestRequest::put()
        .uri("/api/crimes/1")
        .set_json(json!({ "WARD": null, "METHOD": "GUN" }))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(updated["doc"]["WARD"], Value::Null);
    assert_eq!(updated["doc"]["METHOD"], json!("GUN"));
    assert_eq!(updated["doc"]["OFFENSE"], json!("THEFT/OTHER"));
}

#[actix_web::test]
async fn delete_reports_removed_id() {
    let app = app!(sample());

    let deleted: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::delete().uri("/api/crimes/2").to_request(),
    )
    .await;
    assert_eq!(deleted, json!({ "ok": true, "deleted": 2 }));

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/api/crimes/2").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn list_filters_sorts_and_pages() {
    let app = app!(sample());

    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/api/crimes?OFFENSE=THEFT%2FOTHER&limit=1&page=2")
            .to_request(),
    )
    .await;

    assert_eq!(body["total"], json!(2));
    assert_eq!(body["page"], json!(2));
    assert_eq!(body["limit"], json!(1));
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], json!(1));

    let defaults: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/crimes?page=abc&limit=-5").to_request(),
    )
    .await;
    assert_eq!(defaults["page"], json!(1));
    assert_eq!(defaults["limit"], json!(1));
    assert_eq!(defaults["total"], json!(4));
    assert_eq!(defaults["rows"][0]["id"], json!(3));
}

#[actix_web::test]
async fn single_question_answers() {
    let app = app!(sample());

    let ward: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/questions/top-ward").to_request(),
    )
    .await;
    assert_eq!(ward["question"], json!("Which WARD has the highest number of incidents?"));
    assert_eq!(ward["answer"], json!({ "WARD": "2", "count": 2 }));

    let offenses: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/questions/top5-offense-2025").to_request(),
    )
    .await;
    assert_eq!(
        offenses["answer"],
        json!([
            { "offense": "THEFT/OTHER", "count": 2 },
            { "offense": "ROBBERY", "count": 1 }
        ])
    );

    let last_year: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/api/questions/top5-offense-2025?year=2024")
            .to_request(),
    )
    .await;
    assert_eq!(last_year["answer"], json!([{ "offense": "HOMICIDE", "count": 1 }]));

    let weekday: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/questions/most-common-weekday").to_request(),
    )
    .await;
    assert_eq!(weekday["answer"], json!({ "weekday": "Friday", "count": 2 }));
}

#[actix_web::test]
async fn empty_store_yields_null_and_empty_answers() {
    let app = app!(Vec::new());

    let month: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/questions/top-month").to_request(),
    )
    .await;
    assert_eq!(month["answer"], Value::Null);

    let methods: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/questions/method-fractions").to_request(),
    )
    .await;
    assert_eq!(methods["answer"], json!([]));
}

#[actix_web::test]
async fn unknown_question_is_not_found() {
    let app = app!(Vec::new());

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/questions/favorite-color").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn all_questions_in_catalog_order() {
    let app = app!(sample());

    let body: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/questions").to_request(),
    )
    .await;

    let answers = body.as_array().unwrap();
    assert_eq!(answers.len(), 8);
    assert!(answers[0]["question"].as_str().unwrap().contains("2025"));
    assert_eq!(answers[3]["answer"]["WARD"], json!("2"));
    assert_eq!(answers[6]["answer"], json!([{ "SHIFT": "UNKNOWN", "count": 4 }]));
}

#[actix_web::test]
async fn store_failures_return_generic_errors() {
    let app = app_with_store!(UnavailableStore);

    for (uri, message) in [
        ("/api/questions", "Failed to answer questions"),
        ("/api/questions/top-ward", "Failed to answer question"),
        ("/api/crimes", "Failed to count incidents"),
        ("/api/crimes/1", "Failed to load incident"),
    ] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": message }), "{uri}");
    }
}

#[actix_web::test]
async fn blank_wards_never_win_top_ward() {
    let app = app!(vec![
        incident("THEFT/OTHER", "", "2025-01-01T00:00:00Z"),
        incident("THEFT/OTHER", " ", "2025-01-02T00:00:00Z"),
        incident("THEFT/OTHER", "7", "2025-01-03T00:00:00Z"),
    ]);

    let ward: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/questions/top-ward").to_request(),
    )
    .await;
    assert_eq!(ward["answer"], json!({ "WARD": "7", "count": 1 }));
}
