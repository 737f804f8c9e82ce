//! Vehicle-type standardization service
//! Merges duplicate catalog rows and cascades canonical labels into dependent tables

use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;

use qms_shared::{
    plan_merge, Duplicate, MatchKind, MergeGroup, RowId, TableColumn, VehicleTypeNormalizer,
};

use crate::config::StandardizationConfig;
use crate::error::AppResult;
use crate::report::StandardizationReport;
use crate::store::{fetch_all_references, CatalogStore};

/// Knobs for a standardization run
#[derive(Debug, Clone)]
pub struct StandardizationSettings {
    pub category_code: String,
    pub page_size: usize,
    pub tables: Vec<TableColumn>,
    /// Compute and report changes without writing them
    pub dry_run: bool,
    pub parts_category_code: String,
    pub part_tables: Vec<TableColumn>,
}

impl StandardizationSettings {
    pub fn from_config(config: &StandardizationConfig, dry_run: bool) -> Self {
        Self {
            category_code: config.category_code.clone(),
            page_size: config.page_size,
            tables: config.tables.clone(),
            dry_run,
            parts_category_code: config.parts_category_code.clone(),
            part_tables: config.part_tables.clone(),
        }
    }
}

/// Which phases a run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunScope {
    /// Catalog merge followed by the cascade
    All,
    Products,
    References,
}

impl RunScope {
    fn includes_products(self) -> bool {
        matches!(self, RunScope::All | RunScope::Products)
    }

    fn includes_references(self) -> bool {
        matches!(self, RunScope::All | RunScope::References)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Renamed,
    Deleted,
}

/// One catalog row change, applied or (in a dry run) planned
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductChange {
    pub id: RowId,
    pub from: String,
    pub to: String,
    pub action: ChangeAction,
}

/// Result of the catalog merge phase
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductMergeOutcome {
    pub scanned: usize,
    pub renamed: usize,
    pub deleted: usize,
    /// Groups whose survivor already carried the canonical label
    pub unchanged: usize,
    pub unlabeled: usize,
    pub errors: usize,
    pub changes: Vec<ProductChange>,
    /// Labels no alias or rule matched, with their row counts
    pub unmatched: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Processed,
    /// Table does not exist
    Skipped,
    /// Rows could not be read
    Failed,
}

/// Result of cascading into one dependent table
#[derive(Debug, Clone, Serialize)]
pub struct TableOutcome {
    pub target: TableColumn,
    pub status: TableStatus,
    pub scanned: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub blank: usize,
    pub errors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub unmatched: BTreeMap<String, usize>,
}

impl TableOutcome {
    fn new(target: TableColumn, status: TableStatus, message: Option<String>) -> Self {
        Self {
            target,
            status,
            scanned: 0,
            updated: 0,
            unchanged: 0,
            blank: 0,
            errors: 0,
            message,
            unmatched: BTreeMap::new(),
        }
    }
}

/// Result of the cascade phase
#[derive(Debug, Clone, Default, Serialize)]
pub struct CascadeOutcome {
    pub tables: Vec<TableOutcome>,
}

impl CascadeOutcome {
    pub fn total_updated(&self) -> usize {
        self.tables.iter().map(|t| t.updated).sum()
    }

    pub fn total_errors(&self) -> usize {
        self.tables
            .iter()
            .map(|t| t.errors + usize::from(t.status == TableStatus::Failed))
            .sum()
    }

    pub fn skipped_tables(&self) -> impl Iterator<Item = &TableOutcome> {
        self.tables.iter().filter(|t| t.status == TableStatus::Skipped)
    }
}

/// Standardization service
pub struct StandardizationService<S> {
    store: S,
    normalizer: VehicleTypeNormalizer,
    settings: StandardizationSettings,
}

impl<S: CatalogStore> StandardizationService<S> {
    pub fn new(store: S, normalizer: VehicleTypeNormalizer, settings: StandardizationSettings) -> Self {
        Self {
            store,
            normalizer,
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &StandardizationSettings {
        &self.settings
    }

    /// Run the requested phases in order and collect a report
    pub async fn run(&self, scope: RunScope) -> AppResult<StandardizationReport> {
        let started_at = Utc::now();
        if self.settings.dry_run {
            tracing::info!("Dry run: no rows will be written");
        }

        let products = if scope.includes_products() {
            Some(self.merge_products().await?)
        } else {
            None
        };

        let references = if scope.includes_references() {
            Some(self.cascade_references().await?)
        } else {
            None
        };

        Ok(StandardizationReport {
            started_at,
            finished_at: Utc::now(),
            dry_run: self.settings.dry_run,
            products,
            references,
        })
    }

    /// Collapse catalog rows sharing a canonical label into one row
    ///
    /// Failing to find the category or list its rows aborts the run; failures
    /// on individual rows are logged and counted.
    pub async fn merge_products(&self) -> AppResult<ProductMergeOutcome> {
        let category_id = self
            .store
            .find_category_id(&self.settings.category_code)
            .await?;
        let products = self.store.list_products(&category_id).await?;
        tracing::info!(
            "Found {} vehicle types in category {}",
            products.len(),
            self.settings.category_code
        );

        let plan = plan_merge(&self.normalizer, &products);
        tracing::info!(
            "{} canonical groups, {} renames, {} duplicates",
            plan.groups.len(),
            plan.rename_count(),
            plan.deletion_count()
        );

        let mut outcome = ProductMergeOutcome {
            scanned: products.len(),
            unlabeled: plan.unlabeled.len(),
            ..Default::default()
        };
        for id in &plan.unlabeled {
            tracing::warn!("Product {} has neither code nor name, leaving it alone", id);
        }

        for group in &plan.groups {
            if group.kind == MatchKind::Unmatched {
                tracing::warn!("No rule matches vehicle type {:?}", group.canonical);
                *outcome.unmatched.entry(group.canonical.clone()).or_default() +=
                    1 + group.duplicates.len();
            }

            // Duplicates go first so the survivor's new label cannot collide
            // with a unique code still held by one of them.
            for duplicate in &group.duplicates {
                self.delete_duplicate(group, duplicate, &mut outcome).await;
            }

            if group.rename {
                self.rename_survivor(group, &mut outcome).await;
            } else {
                outcome.unchanged += 1;
            }
        }

        Ok(outcome)
    }

    async fn delete_duplicate(
        &self,
        group: &MergeGroup,
        duplicate: &Duplicate,
        outcome: &mut ProductMergeOutcome,
    ) {
        if !self.settings.dry_run {
            if let Err(err) = self.store.delete_product(&duplicate.id).await {
                tracing::error!("Could not delete {} ({}): {}", duplicate.label, duplicate.id, err);
                outcome.errors += 1;
                return;
            }
        }

        tracing::info!(
            "Deleted {} (merged into {})",
            duplicate.label,
            group.canonical
        );
        outcome.deleted += 1;
        outcome.changes.push(ProductChange {
            id: duplicate.id.clone(),
            from: duplicate.label.clone(),
            to: group.canonical.clone(),
            action: ChangeAction::Deleted,
        });
    }

    async fn rename_survivor(&self, group: &MergeGroup, outcome: &mut ProductMergeOutcome) {
        if !self.settings.dry_run {
            if let Err(err) = self
                .store
                .update_product_label(&group.survivor, &group.canonical)
                .await
            {
                tracing::error!(
                    "Could not rename {} -> {}: {}",
                    group.survivor_label,
                    group.canonical,
                    err
                );
                outcome.errors += 1;
                return;
            }
        }

        tracing::info!("{} -> {}", group.survivor_label, group.canonical);
        outcome.renamed += 1;
        outcome.changes.push(ProductChange {
            id: group.survivor.clone(),
            from: group.survivor_label.clone(),
            to: group.canonical.clone(),
            action: ChangeAction::Renamed,
        });
    }

    /// Rewrite every registry column to its canonical labels
    pub async fn cascade_references(&self) -> AppResult<CascadeOutcome> {
        let mut outcome = CascadeOutcome::default();
        for target in &self.settings.tables {
            outcome.tables.push(self.cascade_table(target).await);
        }
        Ok(outcome)
    }

    async fn cascade_table(&self, target: &TableColumn) -> TableOutcome {
        let rows = match fetch_all_references(&self.store, target, self.settings.page_size).await {
            Ok(rows) => rows,
            Err(err) if err.is_missing_table() => {
                tracing::info!("Table {} not found, skipping", target.table);
                return TableOutcome::new(target.clone(), TableStatus::Skipped, Some(err.to_string()));
            }
            Err(err) => {
                tracing::error!("Could not read {}: {}", target, err);
                return TableOutcome::new(target.clone(), TableStatus::Failed, Some(err.to_string()));
            }
        };

        let mut table = TableOutcome::new(target.clone(), TableStatus::Processed, None);
        table.scanned = rows.len();

        for row in rows {
            let Some(stored) = row.value.as_deref() else {
                table.blank += 1;
                continue;
            };

            let normalized = self.normalizer.classify(stored);
            match normalized.kind {
                MatchKind::Blank => {
                    table.blank += 1;
                    continue;
                }
                MatchKind::Unmatched => {
                    *table.unmatched.entry(normalized.label.clone()).or_default() += 1;
                }
                MatchKind::Alias | MatchKind::Rule => {}
            }

            if normalized.label == stored {
                table.unchanged += 1;
                continue;
            }

            if !self.settings.dry_run {
                if let Err(err) = self
                    .store
                    .update_reference(target, &row.id, &normalized.label)
                    .await
                {
                    tracing::warn!("{} row {} could not be updated: {}", target, row.id, err);
                    table.errors += 1;
                    continue;
                }
            }

            tracing::debug!("{} row {}: {:?} -> {:?}", target, row.id, stored, normalized.label);
            table.updated += 1;
        }

        if table.updated > 0 {
            tracing::info!("{}: {} rows updated", target, table.updated);
        } else {
            tracing::info!("{}: nothing to update", target);
        }
        table
    }
}
