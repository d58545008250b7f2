//! REST integration test macro for storage backends.
//!
//! The `rest_integration_tests!` macro generates HTTP-level tests that run
//! full round trips through the router built by `ServerBuilder`:
//! JSON → HTTP request → handler → service → store → HTTP response → JSON.
//!
//! # Generated Tests
//!
//! - `test_rest_create_and_get`: POST 201 with ETag and Location, GET 200
//! - `test_rest_get_not_modified`: GET with the current ETag → 304
//! - `test_rest_update_preconditions`: PUT without If-Match 428, stale 412, current 200
//! - `test_rest_delete`: DELETE 204, then GET 404
//! - `test_rest_list_total_count`: `totalCount=true` sets `Total-Count`
//! - `test_rest_field_selection`: `fields=` projection on a single record
//! - `test_rest_grading_period_dates`: equal dates → 400 with message
//! - `test_rest_errors`: invalid id, unknown filter, malformed body

/// Generate a REST integration test suite for a storage backend.
///
/// `$factory` must evaluate to an `Arc<dyn ResourceStore>` over empty tables.
#[macro_export]
macro_rules! rest_integration_tests {
    ($factory:expr) => {
        mod rest_integration_tests {
            use super::*;
            use axum::http::{HeaderValue, StatusCode, header};
            use axum_test::{TestResponse, TestServer};
            use serde_json::{Value, json};

            async fn make_server() -> TestServer {
                let store = $factory;
                TestServer::new(build_router(store))
            }

            fn etag_of(response: &TestResponse) -> String {
                response
                    .headers()
                    .get(header::ETAG)
                    .expect("ETag header")
                    .to_str()
                    .unwrap()
                    .to_string()
            }

            async fn create_school(server: &TestServer, school_id: i64) -> TestResponse {
                server
                    .post("/schools")
                    .json(&json!({
                        "schoolId": school_id,
                        "nameOfInstitution": format!("School {}", school_id),
                    }))
                    .await
            }

            #[tokio::test]
            async fn test_rest_create_and_get() {
                let server = make_server().await;

                let created = create_school(&server, 255901001).await;
                created.assert_status(StatusCode::CREATED);
                let etag = etag_of(&created);
                let body: Value = created.json();
                let id = body["id"].as_str().unwrap().to_string();
                assert_eq!(body["_etag"], etag.as_str());
                assert_eq!(
                    created.headers().get(header::LOCATION).unwrap(),
                    format!("/schools/{}", id).as_str()
                );

                let fetched = server.get(&format!("/schools/{}", id)).await;
                fetched.assert_status(StatusCode::OK);
                assert_eq!(etag_of(&fetched), etag);
                let body: Value = fetched.json();
                assert_eq!(body["schoolId"], 255901001);
            }

            #[tokio::test]
            async fn test_rest_client_supplied_id() {
                let server = make_server().await;
                let id = uuid::Uuid::new_v4();

                let created = server
                    .post("/schools")
                    .json(&json!({
                        "id": id.to_string(),
                        "schoolId": 3,
                        "nameOfInstitution": "Three",
                    }))
                    .await;
                created.assert_status(StatusCode::CREATED);
                let body: Value = created.json();
                assert_eq!(body["id"], id.to_string());
            }

            #[tokio::test]
            async fn test_rest_get_not_modified() {
                let server = make_server().await;
                let created = create_school(&server, 1).await;
                let etag = etag_of(&created);
                let id = created.json::<Value>()["id"].as_str().unwrap().to_string();

                let response = server
                    .get(&format!("/schools/{}", id))
                    .add_header(header::IF_NONE_MATCH, HeaderValue::from_str(&etag).unwrap())
                    .await;
                response.assert_status(StatusCode::NOT_MODIFIED);
                assert_eq!(etag_of(&response), etag);
            }

            #[tokio::test]
            async fn test_rest_update_preconditions() {
                let server = make_server().await;
                let created = create_school(&server, 2).await;
                let etag = etag_of(&created);
                let id = created.json::<Value>()["id"].as_str().unwrap().to_string();
                let path = format!("/schools/{}", id);
                let body = json!({ "schoolId": 2, "nameOfInstitution": "Renamed" });

                let missing = server.put(&path).json(&body).await;
                missing.assert_status(StatusCode::PRECONDITION_REQUIRED);
                assert_eq!(missing.json::<Value>()["code"], "PRECONDITION_REQUIRED");

                let stale = server
                    .put(&path)
                    .add_header(
                        header::IF_MATCH,
                        HeaderValue::from_static("\"2000-01-01T00:00:00.000Z\""),
                    )
                    .json(&body)
                    .await;
                stale.assert_status(StatusCode::PRECONDITION_FAILED);

                let ok = server
                    .put(&path)
                    .add_header(header::IF_MATCH, HeaderValue::from_str(&etag).unwrap())
                    .json(&body)
                    .await;
                ok.assert_status(StatusCode::OK);
                assert_eq!(ok.json::<Value>()["nameOfInstitution"], "Renamed");
            }

            #[tokio::test]
            async fn test_rest_delete() {
                let server = make_server().await;
                let created = create_school(&server, 4).await;
                let id = created.json::<Value>()["id"].as_str().unwrap().to_string();
                let path = format!("/schools/{}", id);

                server
                    .delete(&path)
                    .await
                    .assert_status(StatusCode::PRECONDITION_REQUIRED);

                server
                    .delete(&path)
                    .add_header(header::IF_MATCH, HeaderValue::from_static("*"))
                    .await
                    .assert_status(StatusCode::NO_CONTENT);

                let gone = server.get(&path).await;
                gone.assert_status(StatusCode::NOT_FOUND);
                assert_eq!(gone.json::<Value>()["code"], "RESOURCE_NOT_FOUND");
            }

            #[tokio::test]
            async fn test_rest_list_total_count() {
                let server = make_server().await;
                for school_id in 1..=3 {
                    create_school(&server, school_id).await;
                }

                let response = server.get("/schools?limit=2&totalCount=true").await;
                response.assert_status(StatusCode::OK);
                assert_eq!(response.headers().get("total-count").unwrap(), "3");
                assert_eq!(response.json::<Value>().as_array().unwrap().len(), 2);

                let plain = server.get("/schools").await;
                assert!(plain.headers().get("total-count").is_none());
            }

            #[tokio::test]
            async fn test_rest_field_selection() {
                let server = make_server().await;
                let created = create_school(&server, 5).await;
                let id = created.json::<Value>()["id"].as_str().unwrap().to_string();

                let response = server
                    .get(&format!("/schools/{}?fields=schoolId,schoolId", id))
                    .await;
                response.assert_status(StatusCode::OK);
                let body: Value = response.json();
                let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
                assert_eq!(keys.len(), 2);
                assert_eq!(body["schoolId"], 5);
                assert!(body.get("_etag").is_some());

                server
                    .get(&format!("/schools/{}?fields=", id))
                    .await
                    .assert_status(StatusCode::BAD_REQUEST);
            }

            #[tokio::test]
            async fn test_rest_grading_period_dates() {
                let server = make_server().await;
                create_school(&server, SCHOOL_ID).await;
                server
                    .post("/descriptors")
                    .json(&json!({
                        "namespace": PERIOD_NAMESPACE,
                        "codeValue": PERIOD_CODE,
                        "shortDescription": PERIOD_CODE,
                    }))
                    .await
                    .assert_status(StatusCode::CREATED);

                let mut period = json!({
                    "gradingPeriodDescriptor": PERIOD_DESCRIPTOR,
                    "periodSequence": 1,
                    "schoolId": SCHOOL_ID,
                    "schoolYear": 2025,
                    "beginDate": "2024-08-26",
                    "endDate": "2024-08-26",
                    "totalInstructionalDays": 29,
                });

                let rejected = server.post("/gradingPeriods").json(&period).await;
                rejected.assert_status(StatusCode::BAD_REQUEST);
                assert_eq!(
                    rejected.json::<Value>()["message"],
                    "End date must be after begin date"
                );

                period["endDate"] = json!("2024-10-04");
                server
                    .post("/gradingPeriods")
                    .json(&period)
                    .await
                    .assert_status(StatusCode::CREATED);
            }

            #[tokio::test]
            async fn test_rest_errors() {
                let server = make_server().await;

                let bad_id = server.get("/schools/not-a-uuid").await;
                bad_id.assert_status(StatusCode::BAD_REQUEST);
                assert_eq!(bad_id.json::<Value>()["code"], "INVALID_RESOURCE_ID");

                let bad_filter = server.get("/schools?mascot=owls").await;
                bad_filter.assert_status(StatusCode::BAD_REQUEST);
                assert_eq!(bad_filter.json::<Value>()["code"], "INVALID_FILTER_FIELD");

                let bad_body = server
                    .post("/schools")
                    .json(&json!({ "schoolId": "not a number" }))
                    .await;
                bad_body.assert_status(StatusCode::BAD_REQUEST);
                assert_eq!(bad_body.json::<Value>()["code"], "INVALID_BODY");

                let invalid = server
                    .post("/schools")
                    .json(&json!({ "schoolId": -1, "nameOfInstitution": " " }))
                    .await;
                invalid.assert_status(StatusCode::BAD_REQUEST);
                assert_eq!(invalid.json::<Value>()["code"], "VALIDATION_ERROR");

                server.get("/health").await.assert_status_ok();
            }
        }
    };
}
