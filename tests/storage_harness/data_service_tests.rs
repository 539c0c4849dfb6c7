//! Macro-generated test suite for `DataService<Purchase>` contract validation.
//!
//! The `data_service_tests!` macro generates a test module that validates any
//! `DataService<Purchase>` implementation against the full contract: CRUD,
//! paginated sorted reads, filter evaluation, counting, summaries and
//! concurrent access.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//! use tally::storage::InMemoryDataService;
//!
//! data_service_tests!(InMemoryDataService::<Purchase>::new());
//! ```
//!
//! # Generated Tests
//!
//! ## CRUD
//! - `test_create_and_get` — create then retrieve, verify all fields
//! - `test_get_nonexistent` — get with random UUID returns None
//! - `test_get_many_skips_missing` — unknown ids are absent from the result
//! - `test_update_existing` / `test_update_nonexistent`
//! - `test_delete_existing` / `test_delete_nonexistent`
//!
//! ## Reads
//! - `test_find_page_sorts_newest_first` — created_at desc with id tiebreak
//! - `test_find_page_skip_and_limit` — pages partition the matching set, any skip past the end is empty
//! - `test_contains_is_case_insensitive` / `test_contains_treats_needle_literally`
//! - `test_eq_on_foreign_key` / `test_between_is_inclusive`
//! - `test_count_ignores_pagination` / `test_summarize_totals` / `test_summarize_empty_set`
//!
//! ## Edge Cases
//! - `test_concurrent_access` — parallel creates from spawned tasks

/// Generate a full `DataService<Purchase>` conformance test suite.
///
/// `$factory` must be an expression that evaluates to an instance implementing
/// `DataService<Purchase>`. It is re-evaluated for each test to ensure
/// isolation. For the concurrent access test, the returned service must also
/// implement `Clone + 'static` (shared state via Arc pattern).
#[macro_export]
macro_rules! data_service_tests {
    ($factory:expr) => {
        mod data_service_contract_tests {
            use super::*;
            use chrono::Duration;
            use tally::core::descriptor::{SortDirection, SortOrder};
            use tally::core::entity::{Data, Entity};
            use tally::core::field::FieldValue;
            use tally::core::filter::Filter;
            use tally::core::service::DataService;
            use tally::entities::Purchase;
            use uuid::Uuid;

            fn newest_first() -> SortOrder {
                SortOrder::default()
            }

            fn sum_fields() -> Vec<String> {
                vec!["grand_total".to_string(), "due".to_string()]
            }

            async fn seed<S: DataService<Purchase>>(service: &S, purchases: Vec<Purchase>) {
                for purchase in purchases {
                    service.create(purchase).await.unwrap();
                }
            }

            // ==================================================================
            // CRUD
            // ==================================================================

            #[tokio::test]
            async fn test_create_and_get() {
                let service = $factory;
                let branch = Uuid::new_v4();
                let entity = purchase("INV-2024-0001", Some(branch), 120.5, 3);
                let original_id = entity.id;

                let created = service.create(entity.clone()).await.unwrap();
                assert_eq!(created.id(), original_id);

                let retrieved = service.get(&original_id).await.unwrap();
                assert_eq!(retrieved, Some(entity));
            }

            #[tokio::test]
            async fn test_get_nonexistent() {
                let service = $factory;
                let result = service.get(&Uuid::new_v4()).await.unwrap();
                assert!(result.is_none());
            }

            #[tokio::test]
            async fn test_get_many_skips_missing() {
                let service = $factory;
                let a = purchase("A", None, 1.0, 1);
                let b = purchase("B", None, 2.0, 2);
                seed(&service, vec![a.clone(), b.clone()]).await;

                let mut found = service
                    .get_many(&[a.id, Uuid::new_v4(), b.id])
                    .await
                    .unwrap();
                found.sort_by(|x, y| x.reference.cmp(&y.reference));
                assert_eq!(references(&found), vec!["A", "B"]);

                assert!(service.get_many(&[]).await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_update_existing() {
                let service = $factory;
                let mut entity = purchase("PO-1", None, 50.0, 4);
                service.create(entity.clone()).await.unwrap();

                entity.payment_status = "due".to_string();
                entity.due = 50.0;
                entity.paid = 0.0;
                service.update(&entity.id, entity.clone()).await.unwrap();

                let stored = service.get(&entity.id).await.unwrap().unwrap();
                assert_eq!(stored.payment_status, "due");
                assert!((stored.due - 50.0).abs() < f64::EPSILON);
            }

            #[tokio::test]
            async fn test_update_nonexistent() {
                let service = $factory;
                let entity = purchase("PO-404", None, 1.0, 1);
                let result = service.update(&entity.id, entity.clone()).await;
                assert!(result.is_err(), "update of an unknown id must fail");
            }

            #[tokio::test]
            async fn test_delete_existing() {
                let service = $factory;
                let entity = purchase("PO-2", None, 1.0, 1);
                service.create(entity.clone()).await.unwrap();

                service.delete(&entity.id).await.unwrap();
                assert!(service.get(&entity.id).await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_delete_nonexistent() {
                let service = $factory;
                let _ = service.delete(&Uuid::new_v4()).await;
            }

            // ==================================================================
            // Paginated reads
            // ==================================================================

            #[tokio::test]
            async fn test_find_page_sorts_newest_first() {
                let service = $factory;
                seed(&service, twelve_purchases(Uuid::new_v4(), Uuid::new_v4())).await;

                let page = service
                    .find_page(&Filter::All, &newest_first(), 0, 3)
                    .await
                    .unwrap();
                assert_eq!(
                    references(&page),
                    vec!["INV-2024-0012", "po-2023-0011", "INV-2024-0010"]
                );
            }

            #[tokio::test]
            async fn test_find_page_ties_break_on_id() {
                let service = $factory;
                let same_day: Vec<Purchase> = (0..4)
                    .map(|i| purchase(&format!("T-{}", i), None, 1.0, 7))
                    .collect();
                let mut expected: Vec<Uuid> = same_day.iter().map(|p| p.id).collect();
                expected.sort();
                seed(&service, same_day).await;

                let first: Vec<Uuid> = service
                    .find_page(&Filter::All, &newest_first(), 0, 4)
                    .await
                    .unwrap()
                    .iter()
                    .map(|p| p.id)
                    .collect();
                let second: Vec<Uuid> = service
                    .find_page(&Filter::All, &newest_first(), 0, 4)
                    .await
                    .unwrap()
                    .iter()
                    .map(|p| p.id)
                    .collect();
                assert_eq!(first, second);
                assert_eq!(first, expected);
            }

            #[tokio::test]
            async fn test_find_page_skip_and_limit() {
                let service = $factory;
                seed(&service, twelve_purchases(Uuid::new_v4(), Uuid::new_v4())).await;
                let sort = SortOrder {
                    field: "grand_total".to_string(),
                    direction: SortDirection::Asc,
                };

                let mut seen = Vec::new();
                for skip in [0u64, 5, 10] {
                    let page = service.find_page(&Filter::All, &sort, skip, 5).await.unwrap();
                    seen.extend(page.into_iter().map(|p| p.grand_total as i64));
                }
                assert_eq!(seen, (1..=12).map(|d| d * 10).collect::<Vec<i64>>());

                let past_end = service.find_page(&Filter::All, &sort, 40, 5).await.unwrap();
                assert!(past_end.is_empty());

                let far_past_end = service
                    .find_page(&Filter::All, &sort, u64::MAX, 5)
                    .await
                    .unwrap();
                assert!(far_past_end.is_empty());
            }

            // ==================================================================
            // Filters
            // ==================================================================

            #[tokio::test]
            async fn test_contains_is_case_insensitive() {
                let service = $factory;
                seed(&service, twelve_purchases(Uuid::new_v4(), Uuid::new_v4())).await;

                let filter = Filter::Contains {
                    field: "reference".to_string(),
                    needle: "inv-2024".to_string(),
                };
                let page = service.find_page(&filter, &newest_first(), 0, 50).await.unwrap();
                assert_count(&page, 6);
                assert!(page.iter().all(|p| p.reference.starts_with("INV-2024")));
            }

            #[tokio::test]
            async fn test_contains_treats_needle_literally() {
                let service = $factory;
                seed(
                    &service,
                    vec![
                        purchase("A.B(1)", None, 1.0, 1),
                        purchase("AxB(1)", None, 1.0, 2),
                        purchase("A*B", None, 1.0, 3),
                    ],
                )
                .await;

                let dot = Filter::Contains {
                    field: "reference".to_string(),
                    needle: "a.b(1".to_string(),
                };
                let page = service.find_page(&dot, &newest_first(), 0, 10).await.unwrap();
                assert_eq!(references(&page), vec!["A.B(1)"]);

                let star = Filter::Contains {
                    field: "reference".to_string(),
                    needle: "*".to_string(),
                };
                assert_eq!(service.count(&star).await.unwrap(), 1);
            }

            #[tokio::test]
            async fn test_or_matches_any_field() {
                let service = $factory;
                let mut by_supplier = purchase("PO-77", None, 1.0, 1);
                by_supplier.supplier_name = "Northwind Traders".to_string();
                seed(
                    &service,
                    vec![by_supplier, purchase("NORTH-1", None, 1.0, 2), purchase("PO-78", None, 1.0, 3)],
                )
                .await;

                let filter = Filter::any_of(vec![
                    Filter::Contains {
                        field: "reference".to_string(),
                        needle: "north".to_string(),
                    },
                    Filter::Contains {
                        field: "supplier_name".to_string(),
                        needle: "north".to_string(),
                    },
                ]);
                assert_eq!(service.count(&filter).await.unwrap(), 2);
            }

            #[tokio::test]
            async fn test_eq_on_foreign_key() {
                let service = $factory;
                let b1 = Uuid::new_v4();
                let mut purchases = twelve_purchases(b1, Uuid::new_v4());
                purchases.push(purchase("ORPHAN", None, 5.0, 13));
                seed(&service, purchases).await;

                let filter = Filter::Eq {
                    field: "branch_id".to_string(),
                    value: FieldValue::Uuid(b1),
                };
                let page = service.find_page(&filter, &newest_first(), 0, 50).await.unwrap();
                assert_eq!(
                    references(&page),
                    vec!["po-2023-0009", "po-2023-0005", "INV-2024-0002"]
                );
                assert!(page.iter().all(|p| p.branch_id == Some(b1)));
            }

            #[tokio::test]
            async fn test_eq_on_status() {
                let service = $factory;
                let mut cancelled = purchase("PO-C", None, 1.0, 1);
                cancelled.status = "cancelled".to_string();
                seed(&service, vec![cancelled, purchase("PO-R", None, 1.0, 2)]).await;

                let filter = Filter::Eq {
                    field: "status".to_string(),
                    value: FieldValue::String("cancelled".to_string()),
                };
                let page = service.find_page(&filter, &newest_first(), 0, 10).await.unwrap();
                assert_eq!(references(&page), vec!["PO-C"]);
            }

            #[tokio::test]
            async fn test_between_is_inclusive() {
                let service = $factory;
                seed(&service, twelve_purchases(Uuid::new_v4(), Uuid::new_v4())).await;

                let filter = Filter::Between {
                    field: "purchase_date".to_string(),
                    start: jan(3),
                    end: jan(5),
                };
                assert_eq!(service.count(&filter).await.unwrap(), 3);

                let just_after = Filter::Between {
                    field: "purchase_date".to_string(),
                    start: jan(5) + Duration::seconds(1),
                    end: jan(6) - Duration::seconds(1),
                };
                assert_eq!(service.count(&just_after).await.unwrap(), 0);
            }

            #[tokio::test]
            async fn test_conjunction_of_predicates() {
                let service = $factory;
                let b1 = Uuid::new_v4();
                seed(&service, twelve_purchases(b1, Uuid::new_v4())).await;

                let filter = Filter::all_of(vec![
                    Filter::Eq {
                        field: "branch_id".to_string(),
                        value: FieldValue::Uuid(b1),
                    },
                    Filter::Contains {
                        field: "reference".to_string(),
                        needle: "INV".to_string(),
                    },
                ]);
                let page = service.find_page(&filter, &newest_first(), 0, 10).await.unwrap();
                assert_eq!(references(&page), vec!["INV-2024-0002"]);
            }

            // ==================================================================
            // Count and summary
            // ==================================================================

            #[tokio::test]
            async fn test_count_ignores_pagination() {
                let service = $factory;
                seed(&service, twelve_purchases(Uuid::new_v4(), Uuid::new_v4())).await;

                assert_eq!(service.count(&Filter::All).await.unwrap(), 12);
                let page = service
                    .find_page(&Filter::All, &newest_first(), 10, 10)
                    .await
                    .unwrap();
                assert_count(&page, 2);
            }

            #[tokio::test]
            async fn test_summarize_totals() {
                let service = $factory;
                let b1 = Uuid::new_v4();
                let mut purchases = twelve_purchases(b1, Uuid::new_v4());
                purchases[1].due = 5.5;
                seed(&service, purchases).await;

                let filter = Filter::Eq {
                    field: "branch_id".to_string(),
                    value: FieldValue::Uuid(b1),
                };
                let summary = service.summarize(&filter, &sum_fields()).await.unwrap();
                assert_eq!(summary.count, 3);
                assert!((summary.total("grand_total") - 160.0).abs() < 1e-9);
                assert!((summary.total("due") - 5.5).abs() < 1e-9);

                let everything = service.summarize(&Filter::All, &sum_fields()).await.unwrap();
                assert_eq!(everything.count, 12);
                assert!((everything.total("grand_total") - 780.0).abs() < 1e-9);
            }

            #[tokio::test]
            async fn test_summarize_empty_set() {
                let service = $factory;
                seed(&service, vec![purchase("PO-1", None, 10.0, 1)]).await;

                let filter = Filter::Contains {
                    field: "reference".to_string(),
                    needle: "nothing-like-this".to_string(),
                };
                let summary = service.summarize(&filter, &sum_fields()).await.unwrap();
                assert_eq!(summary.count, 0);
                assert_eq!(summary.totals.len(), 2);
                assert_eq!(summary.total("grand_total"), 0.0);
            }

            // ==================================================================
            // Concurrency
            // ==================================================================

            #[tokio::test]
            async fn test_concurrent_access() {
                let service = $factory;
                let mut handles = Vec::new();

                for day in 1..=10u32 {
                    let svc = service.clone();
                    handles.push(tokio::spawn(async move {
                        svc.create(purchase(&format!("C-{}", day), None, 1.0, day))
                            .await
                            .unwrap();
                    }));
                }

                for handle in handles {
                    handle.await.unwrap();
                }

                assert_eq!(service.count(&Filter::All).await.unwrap(), 10);
                let title = service
                    .find_page(&Filter::All, &newest_first(), 0, 1)
                    .await
                    .unwrap()[0]
                    .display_title();
                assert_eq!(title, "C-10");
            }
        }
    };
}
