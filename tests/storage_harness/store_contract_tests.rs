//! Macro-generated contract suite for `ResourceStore` implementations.
//!
//! The `store_contract_tests!` macro drives the resource services over a
//! store and checks the behaviour every backend must share:
//!
//! ## Creation
//! - grading period round trip with version token
//! - equal begin/end dates rejected, nothing stored
//! - unresolved school or descriptor reference rejected
//! - duplicate natural key rejected; `If-None-Match` on it is a failed precondition
//! - reused id rejected
//! - natural key reusable after soft delete
//! - concurrent creates of one natural key: exactly one wins
//!
//! ## Conditional writes
//! - update without / with stale / with current `If-Match`
//! - natural key immutable on update
//! - delete with `*`, delete with a stale token, delete of a missing record
//! - repository delete: absence reported as `false`, soft-delete stamps
//!
//! ## Cache
//! - a read that fetched before a committed delete does not repopulate the cache
//!
//! ## Reads
//! - paging window, id ordering and total count
//! - equality and repeated-parameter filters, unknown filter field
//! - field selection on users
//! - composite-key lookup

/// Generate the contract suite.
///
/// `$factory` must evaluate to an `Arc<dyn ResourceStore>` over empty tables.
/// It is re-evaluated for each test.
#[macro_export]
macro_rules! store_contract_tests {
    ($factory:expr) => {
        mod store_contract_tests {
            use super::*;
            use chrono::Duration as ChronoDuration;
            use eduapi::core::error::ApiError;
            use eduapi::core::etag::{VersionToken, WILDCARD};
            use eduapi::core::field::FieldValue;
            use eduapi::core::resource::{RecordStatus, Resource};
            use eduapi::core::query::QueryOptions;
            use std::collections::BTreeSet;
            use std::sync::Arc;
            use uuid::Uuid;

            fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
                raw.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            }

            fn keys(value: &serde_json::Value) -> BTreeSet<String> {
                value
                    .as_object()
                    .map(|map| map.keys().cloned().collect())
                    .unwrap_or_default()
            }

            fn assert_bad_request(err: &ApiError, message: &str) {
                assert_eq!(err.error_code(), "BAD_REQUEST", "got {:?}", err);
                assert!(
                    err.to_string().contains(message),
                    "expected '{}' in '{}'",
                    message,
                    err
                );
            }

            // ==================================================================
            // Creation
            // ==================================================================

            #[tokio::test]
            async fn test_create_grading_period_and_read_back() {
                let services = services($factory);
                seed_period_references(&services).await;

                let created = services
                    .periods
                    .create(None, period_input("2024-08-26", "2024-10-04"), None)
                    .await
                    .unwrap();
                assert_eq!(created.status(), RecordStatus::Active);
                assert_eq!(created.create_date(), created.last_modified_date());

                let read = services.periods.get(created.id(), None).await.unwrap();
                assert_eq!(read.etag, created.etag());
                assert_eq!(read.body["_etag"], created.etag().as_str());
                assert_eq!(read.body["beginDate"], "2024-08-26");
                assert_eq!(read.body["schoolId"], SCHOOL_ID);
                assert_eq!(
                    VersionToken::parse(read.etag.as_str()).unwrap(),
                    created.last_modified_date()
                );
            }

            #[tokio::test]
            async fn test_equal_dates_are_rejected() {
                let services = services($factory);
                seed_period_references(&services).await;

                let err = services
                    .periods
                    .create(None, period_input("2024-08-26", "2024-08-26"), None)
                    .await
                    .unwrap_err();
                assert_bad_request(&err, "End date must be after begin date");

                let listing = services.periods.list_query(&[]).await.unwrap();
                assert_eq!(listing.body, serde_json::json!([]));
            }

            #[tokio::test]
            async fn test_missing_school_is_rejected() {
                let services = services($factory);
                services
                    .descriptors
                    .create(None, descriptor_input(PERIOD_NAMESPACE, PERIOD_CODE), None)
                    .await
                    .unwrap();

                let err = services
                    .periods
                    .create(None, period_input("2024-08-26", "2024-10-04"), None)
                    .await
                    .unwrap_err();
                assert_bad_request(
                    &err,
                    "Referenced schoolId '255901001' does not exist in schools",
                );
            }

            #[tokio::test]
            async fn test_missing_descriptor_is_rejected() {
                let services = services($factory);
                services
                    .schools
                    .create(None, school_input(SCHOOL_ID), None)
                    .await
                    .unwrap();

                let err = services
                    .periods
                    .create(None, period_input("2024-08-26", "2024-10-04"), None)
                    .await
                    .unwrap_err();
                assert_bad_request(&err, "does not exist in descriptors");
            }

            #[tokio::test]
            async fn test_deleted_reference_does_not_resolve() {
                let services = services($factory);
                seed_period_references(&services).await;
                let school = services
                    .schools
                    .repository()
                    .find_by_composite_key(&[FieldValue::Integer(SCHOOL_ID)])
                    .await
                    .unwrap()
                    .unwrap();
                services
                    .schools
                    .delete(school.id(), Some(WILDCARD))
                    .await
                    .unwrap();

                let err = services
                    .periods
                    .create(None, period_input("2024-08-26", "2024-10-04"), None)
                    .await
                    .unwrap_err();
                assert_bad_request(&err, "does not exist in schools");
            }

            #[tokio::test]
            async fn test_duplicate_natural_key_is_rejected() {
                let services = services($factory);
                seed_period_references(&services).await;
                services
                    .periods
                    .create(None, period_input("2024-08-26", "2024-10-04"), None)
                    .await
                    .unwrap();

                let err = services
                    .periods
                    .create(None, period_input("2024-08-27", "2024-10-05"), None)
                    .await
                    .unwrap_err();
                assert_bad_request(&err, "same natural key");
            }

            #[tokio::test]
            async fn test_if_none_match_on_existing_key_fails_precondition() {
                let services = services($factory);
                seed_period_references(&services).await;
                let first = services
                    .periods
                    .create(None, period_input("2024-08-26", "2024-10-04"), None)
                    .await
                    .unwrap();

                let err = services
                    .periods
                    .create(
                        None,
                        period_input("2024-08-26", "2024-10-04"),
                        Some(first.etag().as_str()),
                    )
                    .await
                    .unwrap_err();
                assert_eq!(err.error_code(), "PRECONDITION_FAILED");
                assert_eq!(err.status_code().as_u16(), 412);
            }

            #[tokio::test]
            async fn test_reused_id_is_rejected() {
                let services = services($factory);
                let id = Uuid::new_v4();
                services
                    .schools
                    .create(Some(id), school_input(1), None)
                    .await
                    .unwrap();

                let err = services
                    .schools
                    .create(Some(id), school_input(2), None)
                    .await
                    .unwrap_err();
                assert_bad_request(&err, "already exists");
            }

            #[tokio::test]
            async fn test_natural_key_reusable_after_delete() {
                let services = services($factory);
                let first = services
                    .schools
                    .create(None, school_input(7), None)
                    .await
                    .unwrap();
                services
                    .schools
                    .delete(first.id(), Some(WILDCARD))
                    .await
                    .unwrap();

                let second = services
                    .schools
                    .create(None, school_input(7), None)
                    .await
                    .unwrap();
                assert_ne!(first.id(), second.id());

                let live = services
                    .schools
                    .repository()
                    .find_by_composite_key(&[FieldValue::Integer(7)])
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(live.id(), second.id());
            }

            #[tokio::test]
            async fn test_concurrent_creates_of_one_key() {
                let services = Arc::new(services($factory));

                let handles: Vec<_> = (0..4)
                    .map(|_| {
                        let services = services.clone();
                        tokio::spawn(async move {
                            services.schools.create(None, school_input(42), None).await
                        })
                    })
                    .collect();

                let mut created = 0;
                for handle in handles {
                    if handle.await.unwrap().is_ok() {
                        created += 1;
                    }
                }
                assert_eq!(created, 1);

                let listing = services
                    .schools
                    .list_query(&pairs(&[("schoolId", "42"), ("totalCount", "true")]))
                    .await
                    .unwrap();
                assert_eq!(listing.total_count, Some(1));
            }

            // ==================================================================
            // Conditional writes
            // ==================================================================

            #[tokio::test]
            async fn test_update_if_match_matrix() {
                let services = services($factory);
                let school = services
                    .schools
                    .create(None, school_input(9), None)
                    .await
                    .unwrap();

                let mut renamed = school_input(9);
                renamed.name_of_institution = "Grand Bend High".to_string();

                let err = services
                    .schools
                    .update(school.id(), renamed.clone(), None)
                    .await
                    .unwrap_err();
                assert_eq!(err.error_code(), "PRECONDITION_REQUIRED");

                let stale =
                    VersionToken::generate(school.last_modified_date() - ChronoDuration::days(1));
                let err = services
                    .schools
                    .update(school.id(), renamed.clone(), Some(stale.as_str()))
                    .await
                    .unwrap_err();
                assert_eq!(err.error_code(), "PRECONDITION_FAILED");

                let updated = services
                    .schools
                    .update(school.id(), renamed, Some(school.etag().as_str()))
                    .await
                    .unwrap();
                assert!(updated.last_modified_date() >= school.last_modified_date());
                assert_eq!(updated.create_date(), school.create_date());

                let read = services.schools.get(school.id(), None).await.unwrap();
                assert_eq!(read.body["nameOfInstitution"], "Grand Bend High");
                assert_eq!(read.etag, updated.etag());
            }

            #[tokio::test]
            async fn test_update_cannot_change_natural_key() {
                let services = services($factory);
                let school = services
                    .schools
                    .create(None, school_input(10), None)
                    .await
                    .unwrap();

                let err = services
                    .schools
                    .update(school.id(), school_input(11), Some(WILDCARD))
                    .await
                    .unwrap_err();
                assert_bad_request(&err, "cannot be changed");
            }

            #[tokio::test]
            async fn test_update_missing_record_is_not_found() {
                let services = services($factory);
                let err = services
                    .schools
                    .update(Uuid::new_v4(), school_input(1), None)
                    .await
                    .unwrap_err();
                assert_eq!(err.error_code(), "RESOURCE_NOT_FOUND");
            }

            #[tokio::test]
            async fn test_delete_with_wildcard() {
                let services = services($factory);
                seed_period_references(&services).await;
                let period = services
                    .periods
                    .create(None, period_input("2024-08-26", "2024-10-04"), None)
                    .await
                    .unwrap();

                services
                    .periods
                    .delete(period.id(), Some(WILDCARD))
                    .await
                    .unwrap();

                let err = services.periods.get(period.id(), None).await.unwrap_err();
                assert_eq!(err.error_code(), "RESOURCE_NOT_FOUND");

                let listing = services.periods.list_query(&[]).await.unwrap();
                assert_eq!(listing.body, serde_json::json!([]));

                let all = services
                    .periods
                    .repository()
                    .find_all_including_deleted(&QueryOptions::new(0, 10), &[])
                    .await
                    .unwrap();
                assert_eq!(all.records.len(), 1);
                assert!(all.records[0].is_deleted());
                assert!(all.records[0].delete_date().is_some());
            }

            #[tokio::test]
            async fn test_delete_with_stale_token_leaves_record() {
                let services = services($factory);
                seed_period_references(&services).await;
                let period = services
                    .periods
                    .create(None, period_input("2024-08-26", "2024-10-04"), None)
                    .await
                    .unwrap();

                let stale =
                    VersionToken::generate(period.last_modified_date() - ChronoDuration::seconds(1));
                let err = services
                    .periods
                    .delete(period.id(), Some(stale.as_str()))
                    .await
                    .unwrap_err();
                assert_eq!(err.error_code(), "PRECONDITION_FAILED");

                let read = services.periods.get(period.id(), None).await.unwrap();
                assert_eq!(read.etag, period.etag());
            }

            #[tokio::test]
            async fn test_delete_missing_record_is_not_found() {
                let services = services($factory);
                let err = services
                    .periods
                    .delete(Uuid::new_v4(), Some(WILDCARD))
                    .await
                    .unwrap_err();
                assert_eq!(err.error_code(), "RESOURCE_NOT_FOUND");
            }

            #[tokio::test]
            async fn test_repository_delete_stamps_and_reports_absence() {
                let services = services($factory);
                let repository = services.schools.repository();
                assert!(!repository.delete(Uuid::new_v4()).await.unwrap());

                let school = services
                    .schools
                    .create(None, school_input(7), None)
                    .await
                    .unwrap();
                let mut latest = school.clone();
                for _ in 0..3 {
                    latest = services
                        .schools
                        .update(school.id(), school_input(7), Some(WILDCARD))
                        .await
                        .unwrap();
                }

                assert!(repository.delete(school.id()).await.unwrap());
                let stored = repository.find_by_id(school.id()).await.unwrap().unwrap();
                assert_eq!(stored.status(), RecordStatus::Deleted);
                assert_eq!(stored.delete_date(), Some(stored.last_modified_date()));
                assert!(stored.last_modified_date() > latest.last_modified_date());
                assert_eq!(stored.create_date(), school.create_date());

                assert!(!repository.delete(school.id()).await.unwrap());
                let unchanged = repository.find_by_id(school.id()).await.unwrap().unwrap();
                assert_eq!(unchanged.last_modified_date(), stored.last_modified_date());
            }

            #[tokio::test]
            async fn test_delete_right_after_update_advances_version() {
                let services = services($factory);
                let school = services
                    .schools
                    .create(None, school_input(8), None)
                    .await
                    .unwrap();
                let updated = services
                    .schools
                    .update(school.id(), school_input(8), Some(school.etag().as_str()))
                    .await
                    .unwrap();
                services
                    .schools
                    .delete(school.id(), Some(updated.etag().as_str()))
                    .await
                    .unwrap();

                let stored = services
                    .schools
                    .repository()
                    .find_by_id(school.id())
                    .await
                    .unwrap()
                    .unwrap();
                assert!(stored.last_modified_date() > updated.last_modified_date());
                assert_ne!(stored.etag(), updated.etag());
            }

            // ==================================================================
            // Cache
            // ==================================================================

            #[tokio::test]
            async fn test_listing_fetched_before_delete_is_not_cached() {
                let gated = GatedStore::new($factory);
                let services = Arc::new(services(gated.clone()));
                let school = services
                    .schools
                    .create(None, school_input(9), None)
                    .await
                    .unwrap();

                gated.arm();
                let reader = {
                    let services = services.clone();
                    tokio::spawn(async move { services.schools.list_query(&[]).await })
                };
                gated.wait_for_read().await;
                services
                    .schools
                    .delete(school.id(), Some(WILDCARD))
                    .await
                    .unwrap();
                gated.release();

                let raced = reader.await.unwrap().unwrap();
                assert_eq!(raced.body.as_array().unwrap().len(), 1);

                let listing = services.schools.list_query(&[]).await.unwrap();
                assert_eq!(listing.body, serde_json::json!([]));
            }

            #[tokio::test]
            async fn test_lookup_fetched_before_delete_is_not_cached() {
                let gated = GatedStore::new($factory);
                let services = Arc::new(services(gated.clone()));
                let school = services
                    .schools
                    .create(None, school_input(10), None)
                    .await
                    .unwrap();

                gated.arm();
                let reader = {
                    let services = services.clone();
                    let id = school.id();
                    tokio::spawn(async move { services.schools.get(id, None).await })
                };
                gated.wait_for_read().await;
                services
                    .schools
                    .delete(school.id(), Some(WILDCARD))
                    .await
                    .unwrap();
                gated.release();

                assert!(reader.await.unwrap().is_ok());

                let err = services.schools.get(school.id(), None).await.unwrap_err();
                assert_eq!(err.error_code(), "RESOURCE_NOT_FOUND");
            }

            // ==================================================================
            // Reads
            // ==================================================================

            #[tokio::test]
            async fn test_paging_window_and_total_count() {
                let services = services($factory);
                for school_id in 1..=5 {
                    services
                        .schools
                        .create(None, school_input(school_id), None)
                        .await
                        .unwrap();
                }

                let all = services.schools.list_query(&[]).await.unwrap();
                let ids: Vec<String> = all
                    .body
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|item| item["id"].as_str().unwrap().to_string())
                    .collect();
                let mut sorted = ids.clone();
                sorted.sort();
                assert_eq!(ids, sorted);
                assert_eq!(all.total_count, None);

                let page = services
                    .schools
                    .list_query(&pairs(&[
                        ("offset", "1"),
                        ("limit", "2"),
                        ("totalCount", "true"),
                    ]))
                    .await
                    .unwrap();
                let page_ids: Vec<String> = page
                    .body
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|item| item["id"].as_str().unwrap().to_string())
                    .collect();
                assert_eq!(page_ids, ids[1..3].to_vec());
                assert_eq!(page.total_count, Some(5));

                let beyond = services
                    .schools
                    .list_query(&pairs(&[("offset", "10"), ("totalCount", "true")]))
                    .await
                    .unwrap();
                assert_eq!(beyond.body, serde_json::json!([]));
                assert_eq!(beyond.total_count, Some(5));
            }

            #[tokio::test]
            async fn test_filters() {
                let services = services($factory);
                for school_id in 1..=4 {
                    services
                        .schools
                        .create(None, school_input(school_id), None)
                        .await
                        .unwrap();
                }

                let one = services
                    .schools
                    .list_query(&pairs(&[("schoolId", "3")]))
                    .await
                    .unwrap();
                assert_eq!(one.body.as_array().unwrap().len(), 1);
                assert_eq!(one.body[0]["nameOfInstitution"], "School 3");

                let two = services
                    .schools
                    .list_query(&pairs(&[
                        ("schoolId", "1"),
                        ("schoolId", "4"),
                        ("totalCount", "true"),
                    ]))
                    .await
                    .unwrap();
                assert_eq!(two.total_count, Some(2));

                let err = services
                    .schools
                    .list_query(&pairs(&[("principal", "x")]))
                    .await
                    .unwrap_err();
                assert_eq!(err.error_code(), "INVALID_FILTER_FIELD");
            }

            #[tokio::test]
            async fn test_users_field_selection() {
                let services = services($factory);
                services
                    .users
                    .create(None, user_input("jdoe"), None)
                    .await
                    .unwrap();

                let listing = services
                    .users
                    .list_query(&pairs(&[("fields", "username,email")]))
                    .await
                    .unwrap();
                let expected: BTreeSet<String> = ["_etag", "email", "username"]
                    .into_iter()
                    .map(String::from)
                    .collect();
                assert_eq!(keys(&listing.body[0]), expected);
                assert_eq!(listing.body[0]["username"], "jdoe");

                let fallback = services
                    .users
                    .list_query(&pairs(&[("fields", "username,bogus")]))
                    .await
                    .unwrap();
                assert!(keys(&fallback.body[0]).contains("firstName"));
                assert!(keys(&fallback.body[0]).contains("id"));

                let err = services
                    .users
                    .list_query(&pairs(&[("fields", "user-name")]))
                    .await
                    .unwrap_err();
                assert_eq!(err.error_code(), "INVALID_FILTER_FIELD");

                let err = services
                    .users
                    .list_query(&pairs(&[("fields", "  ")]))
                    .await
                    .unwrap_err();
                assert_eq!(err.error_code(), "INVALID_SELECTION_FIELD");
            }

            #[tokio::test]
            async fn test_user_staff_reference() {
                let services = services($factory);
                let mut linked = user_input("alovelace");
                linked.staff_unique_id = Some("207219".to_string());

                let err = services
                    .users
                    .create(None, linked.clone(), None)
                    .await
                    .unwrap_err();
                assert_bad_request(&err, "does not exist in staffs");

                services
                    .staff
                    .create(None, staff_input("207219"), None)
                    .await
                    .unwrap();
                let user = services.users.create(None, linked, None).await.unwrap();
                assert_eq!(user.staff_unique_id.as_deref(), Some("207219"));
            }

            #[tokio::test]
            async fn test_composite_key_lookup() {
                let services = services($factory);
                seed_period_references(&services).await;
                let period = services
                    .periods
                    .create(None, period_input("2024-08-26", "2024-10-04"), None)
                    .await
                    .unwrap();

                let key = vec![
                    FieldValue::from(PERIOD_DESCRIPTOR),
                    FieldValue::Integer(1),
                    FieldValue::Integer(SCHOOL_ID),
                    FieldValue::Integer(2025),
                ];
                let found = services
                    .periods
                    .repository()
                    .find_by_composite_key(&key)
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(found.id(), period.id());

                let missing = services
                    .periods
                    .repository()
                    .find_by_composite_key(&[
                        FieldValue::from(PERIOD_DESCRIPTOR),
                        FieldValue::Integer(2),
                        FieldValue::Integer(SCHOOL_ID),
                        FieldValue::Integer(2025),
                    ])
                    .await
                    .unwrap();
                assert!(missing.is_none());
            }
        }
    };
}
