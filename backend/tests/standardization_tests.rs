//! Standardization service tests
//!
//! Runs the catalog merge and the dependent-table cascade against an
//! in-memory store.

mod common;

use common::{settings, InMemoryStore};
use qms_maintenance::services::{
    ChangeAction, RunScope, StandardizationService, TableStatus,
};
use qms_maintenance::AppError;
use qms_shared::{VehicleTypeNormalizer, HSCK_LABEL};

fn service(store: InMemoryStore, dry_run: bool) -> StandardizationService<InMemoryStore> {
    StandardizationService::new(store, VehicleTypeNormalizer::standard(), settings(dry_run))
}

fn messy_catalog() -> InMemoryStore {
    InMemoryStore::new()
        .with_product(1, "kdm35")
        .with_product(2, "KDM 35")
        .with_product(3, "Kdm 35 ")
        .with_product(4, "AGA6000")
        .with_product(5, "hsc")
}

// =============================================================================
// Catalog merge
// =============================================================================

mod product_merge {
    use super::*;

    #[tokio::test]
    async fn duplicates_collapse_into_first_row() {
        let service = service(messy_catalog(), false);
        let outcome = service.merge_products().await.unwrap();

        assert_eq!(outcome.scanned, 5);
        assert_eq!(outcome.renamed, 2);
        assert_eq!(outcome.deleted, 2);
        assert_eq!(outcome.unchanged, 1);
        assert_eq!(outcome.errors, 0);

        let products = service.store().products();
        let ids: Vec<_> = products.iter().map(|p| p.id.to_string()).collect();
        assert_eq!(ids, vec!["1", "4", "5"]);
        assert_eq!(
            service.store().product_labels(),
            vec!["KDM 35".to_string(), "AGA6000".to_string(), HSCK_LABEL.to_string()]
        );
        assert!(products
            .iter()
            .all(|p| p.product_code == p.product_name));
    }

    #[tokio::test]
    async fn changes_record_deletions_before_rename() {
        let service = service(messy_catalog(), false);
        let outcome = service.merge_products().await.unwrap();

        let first_group: Vec<_> = outcome
            .changes
            .iter()
            .take(3)
            .map(|c| (c.id.to_string(), c.action))
            .collect();
        assert_eq!(
            first_group,
            vec![
                ("2".to_string(), ChangeAction::Deleted),
                ("3".to_string(), ChangeAction::Deleted),
                ("1".to_string(), ChangeAction::Renamed),
            ]
        );
        assert!(outcome.changes.iter().take(3).all(|c| c.to == "KDM 35"));
    }

    #[tokio::test]
    async fn second_run_changes_nothing() {
        let service = service(messy_catalog(), false);
        service.merge_products().await.unwrap();
        let writes = service.store().writes();

        let again = service.merge_products().await.unwrap();
        assert_eq!(again.renamed, 0);
        assert_eq!(again.deleted, 0);
        assert_eq!(again.unchanged, 3);
        assert_eq!(service.store().writes(), writes);
    }

    #[tokio::test]
    async fn code_only_rows_get_both_columns() {
        let store = InMemoryStore::new().with_product_columns(7, Some("kdm80"), None);
        let service = service(store, false);
        let outcome = service.merge_products().await.unwrap();

        assert_eq!(outcome.renamed, 1);
        let product = &service.store().products()[0];
        assert_eq!(product.product_code.as_deref(), Some("KDM 80"));
        assert_eq!(product.product_name.as_deref(), Some("KDM 80"));
    }

    #[tokio::test]
    async fn unlabeled_rows_are_left_alone() {
        let store = InMemoryStore::new()
            .with_product_columns(8, None, Some("   "))
            .with_product(9, "AGA2100");
        let service = service(store, false);
        let outcome = service.merge_products().await.unwrap();

        assert_eq!(outcome.unlabeled, 1);
        assert_eq!(outcome.deleted, 0);
        assert_eq!(service.store().products().len(), 2);
    }

    #[tokio::test]
    async fn unmatched_labels_are_reported_not_rewritten() {
        let store = InMemoryStore::new()
            .with_product(1, "Forklift")
            .with_product(2, "HSC Hidrolik Platform");
        let service = service(store, false);
        let outcome = service.merge_products().await.unwrap();

        assert_eq!(outcome.renamed, 0);
        assert_eq!(outcome.unmatched.get("Forklift"), Some(&1));
        assert_eq!(outcome.unmatched.get("HSC Hidrolik Platform"), Some(&1));
        assert_eq!(service.store().writes(), 0);
    }

    #[tokio::test]
    async fn unmatched_row_keeps_its_code() {
        let store = InMemoryStore::new().with_product_columns(1, Some("FRK-01"), Some("Forklift-A"));
        let service = service(store, false);
        let outcome = service.merge_products().await.unwrap();

        assert_eq!(outcome.renamed, 0);
        assert_eq!(outcome.unchanged, 1);
        let product = &service.store().products()[0];
        assert_eq!(product.product_code.as_deref(), Some("FRK-01"));
        assert_eq!(product.product_name.as_deref(), Some("Forklift-A"));
        assert_eq!(service.store().writes(), 0);
    }

    #[tokio::test]
    async fn canonical_row_keeps_its_code() {
        let store = InMemoryStore::new()
            .with_product_columns(1, Some("VT-07"), Some("KDM 70"))
            .with_product_columns(2, Some("VT-08"), Some(" KDM 80 "));
        let service = service(store, false);
        let outcome = service.merge_products().await.unwrap();

        assert_eq!(outcome.renamed, 0);
        let codes: Vec<_> = service
            .store()
            .products()
            .into_iter()
            .filter_map(|p| p.product_code)
            .collect();
        assert_eq!(codes, vec!["VT-07".to_string(), "VT-08".to_string()]);
    }

    #[tokio::test]
    async fn variant_name_is_relabeled_in_both_columns() {
        let store = InMemoryStore::new().with_product_columns(1, Some("VT-07"), Some("kdm70"));
        let service = service(store, false);
        let outcome = service.merge_products().await.unwrap();

        assert_eq!(outcome.renamed, 1);
        let product = &service.store().products()[0];
        assert_eq!(product.product_code.as_deref(), Some("KDM 70"));
        assert_eq!(product.product_name.as_deref(), Some("KDM 70"));
    }

    #[tokio::test]
    async fn failed_row_is_counted_and_run_continues() {
        let store = messy_catalog().with_failing_product(2);
        let service = service(store, false);
        let outcome = service.merge_products().await.unwrap();

        assert_eq!(outcome.errors, 2);
        assert_eq!(outcome.deleted, 1);
        // hsc still renamed after the KDM 35 group failed
        assert!(service
            .store()
            .product_labels()
            .contains(&HSCK_LABEL.to_string()));
    }

    #[tokio::test]
    async fn missing_category_aborts() {
        let service = service(InMemoryStore::without_category(), false);
        let err = service.merge_products().await.unwrap_err();
        assert!(matches!(err, AppError::CategoryNotFound(code) if code == "VEHICLE_TYPES"));
    }

    #[tokio::test]
    async fn dry_run_plans_without_writing() {
        let service = service(messy_catalog(), true);
        let outcome = service.merge_products().await.unwrap();

        assert_eq!(outcome.renamed, 2);
        assert_eq!(outcome.deleted, 2);
        assert_eq!(service.store().writes(), 0);
        assert_eq!(service.store().products().len(), 5);
    }
}

// =============================================================================
// Dependent-table cascade
// =============================================================================

mod cascade {
    use super::*;

    fn registry_store() -> InMemoryStore {
        InMemoryStore::new()
            .with_reference("quality_costs", 1, Some("kdm 70"))
            .with_reference("quality_costs", 2, Some("KDM 70"))
            .with_reference("quality_costs", 3, Some("  "))
            .with_reference("quality_costs", 4, Some("Forklift"))
            .with_reference("quality_costs", 5, None)
            .with_reference("deviations", 1, Some("hsck"))
            .with_reference("deviations", 2, Some("aga 6000 yeni"))
            .with_missing_table("kaizen_entries")
    }

    #[tokio::test]
    async fn rewrites_variants_and_keeps_the_rest() {
        let service = service(registry_store(), false);
        let outcome = service.cascade_references().await.unwrap();

        let costs = &outcome.tables[0];
        assert_eq!(costs.target.table, "quality_costs");
        assert_eq!(costs.status, TableStatus::Processed);
        assert_eq!(costs.scanned, 4);
        assert_eq!(costs.updated, 1);
        assert_eq!(costs.unchanged, 2);
        assert_eq!(costs.blank, 1);
        assert_eq!(costs.unmatched.get("Forklift"), Some(&1));

        assert_eq!(
            service.store().values("quality_costs"),
            vec![
                Some("KDM 70".to_string()),
                Some("KDM 70".to_string()),
                Some("  ".to_string()),
                Some("Forklift".to_string()),
                None,
            ]
        );
        assert_eq!(
            service.store().values("deviations"),
            vec![Some(HSCK_LABEL.to_string()), Some("AGA6000".to_string())]
        );
        assert_eq!(outcome.total_updated(), 3);
    }

    #[tokio::test]
    async fn missing_table_is_skipped() {
        let service = service(registry_store(), false);
        let outcome = service.cascade_references().await.unwrap();

        let skipped: Vec<_> = outcome.skipped_tables().map(|t| t.target.table.as_str()).collect();
        assert_eq!(skipped, vec!["kaizen_entries"]);
        assert_eq!(outcome.total_errors(), 0);
        assert_eq!(outcome.tables.len(), 4);
    }

    #[tokio::test]
    async fn unreadable_table_fails_alone() {
        let store = registry_store().with_unreadable_table("deviations");
        let service = service(store, false);
        let outcome = service.cascade_references().await.unwrap();

        let deviations = &outcome.tables[1];
        assert_eq!(deviations.status, TableStatus::Failed);
        assert!(deviations.message.is_some());
        assert_eq!(outcome.tables[0].updated, 1);
        assert_eq!(outcome.total_errors(), 1);
    }

    #[tokio::test]
    async fn row_failure_is_counted() {
        let store = registry_store().with_failing_row("deviations", 1);
        let service = service(store, false);
        let outcome = service.cascade_references().await.unwrap();

        let deviations = &outcome.tables[1];
        assert_eq!(deviations.errors, 1);
        assert_eq!(deviations.updated, 1);
        assert_eq!(
            service.store().values("deviations"),
            vec![Some("hsck".to_string()), Some("AGA6000".to_string())]
        );
    }

    #[tokio::test]
    async fn pages_through_large_tables() {
        let mut store = InMemoryStore::new();
        for id in 1..=7 {
            store = store.with_reference("kaizen_entries", id, Some("kdm80"));
        }
        let mut settings = settings(false);
        settings.page_size = 3;
        let service =
            StandardizationService::new(store, VehicleTypeNormalizer::standard(), settings);

        let outcome = service.cascade_references().await.unwrap();
        let kaizen = outcome
            .tables
            .iter()
            .find(|t| t.target.table == "kaizen_entries")
            .unwrap();
        assert_eq!(kaizen.scanned, 7);
        assert_eq!(kaizen.updated, 7);
        assert!(service
            .store()
            .values("kaizen_entries")
            .iter()
            .all(|v| v.as_deref() == Some("KDM 80")));
    }

    #[tokio::test]
    async fn server_row_cap_does_not_end_the_scan() {
        let mut store = InMemoryStore::new().with_page_cap(1000);
        for id in 1..=2500 {
            store = store.with_reference("quality_costs", id, Some("kdm80"));
        }
        let mut settings = settings(false);
        settings.page_size = 5000;
        let service =
            StandardizationService::new(store, VehicleTypeNormalizer::standard(), settings);

        let outcome = service.cascade_references().await.unwrap();
        let costs = &outcome.tables[0];
        assert_eq!(costs.scanned, 2500);
        assert_eq!(costs.updated, 2500);
        assert!(service
            .store()
            .values("quality_costs")
            .iter()
            .all(|v| v.as_deref() == Some("KDM 80")));
    }

    #[tokio::test]
    async fn rows_without_id_do_not_shorten_paging() {
        let mut store = InMemoryStore::new().with_idless_rows("deviations", 2);
        for id in 1..=5 {
            store = store.with_reference("deviations", id, Some("hsck"));
        }
        let mut settings = settings(false);
        settings.page_size = 3;
        let service =
            StandardizationService::new(store, VehicleTypeNormalizer::standard(), settings);

        let outcome = service.cascade_references().await.unwrap();
        let deviations = &outcome.tables[1];
        assert_eq!(deviations.scanned, 5);
        assert_eq!(deviations.updated, 5);
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let service = service(registry_store(), true);
        let outcome = service.cascade_references().await.unwrap();

        assert_eq!(outcome.total_updated(), 3);
        assert_eq!(service.store().writes(), 0);
        assert_eq!(
            service.store().values("deviations"),
            vec![Some("hsck".to_string()), Some("aga 6000 yeni".to_string())]
        );
    }
}

// =============================================================================
// Full runs
// =============================================================================

mod full_run {
    use super::*;

    #[tokio::test]
    async fn run_covers_both_phases() {
        let store = messy_catalog().with_reference("quality_inspections", 10, Some("AGA 3000"));
        let service = service(store, false);
        let report = service.run(RunScope::All).await.unwrap();

        assert!(report.products.is_some());
        let references = report.references.as_ref().unwrap();
        assert_eq!(references.total_updated(), 1);
        assert_eq!(report.total_errors(), 0);
        assert!(!report.dry_run);
        assert!(report.finished_at >= report.started_at);
    }

    #[tokio::test]
    async fn scoped_runs_skip_the_other_phase() {
        let service = service(messy_catalog(), false);

        let report = service.run(RunScope::References).await.unwrap();
        assert!(report.products.is_none());
        assert_eq!(service.store().products().len(), 5);

        let report = service.run(RunScope::Products).await.unwrap();
        assert!(report.references.is_none());
        assert_eq!(service.store().products().len(), 3);
    }

    #[tokio::test]
    async fn rerun_is_a_noop() {
        let store = messy_catalog()
            .with_reference("quality_costs", 1, Some("kdm 35"))
            .with_reference("deviations", 1, Some("HSC"));
        let service = service(store, false);
        service.run(RunScope::All).await.unwrap();
        let writes = service.store().writes();

        let report = service.run(RunScope::All).await.unwrap();
        assert_eq!(report.references.as_ref().unwrap().total_updated(), 0);
        assert_eq!(report.products.as_ref().unwrap().renamed, 0);
        assert_eq!(service.store().writes(), writes);
    }

    #[tokio::test]
    async fn report_lists_unmatched_labels() {
        let store = InMemoryStore::new()
            .with_product(1, "Vinç")
            .with_reference("quality_costs", 1, Some("Vinç"))
            .with_reference("quality_costs", 2, Some("Vinç"));
        let service = service(store, false);
        let report = service.run(RunScope::All).await.unwrap();

        let entries = report.unmatched_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].source, "products");
        assert_eq!(entries[1].source, "quality_costs.vehicle_type");
        assert_eq!(entries[1].occurrences, 2);
    }
}
