//! Catalog seeding service
//! Registers vehicle types and part codes that only exist as free text in
//! dependent tables

use serde::Serialize;
use std::collections::HashSet;

use qms_shared::{MatchKind, RowId, VehicleTypeNormalizer, STATIC_VEHICLE_TYPES};

use crate::error::AppResult;
use crate::services::standardization::StandardizationSettings;
use crate::store::{fetch_all_references, CatalogStore};

/// Result of a seeding run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedOutcome {
    /// Category code the entries were added to
    pub category: String,
    pub dry_run: bool,
    /// Distinct entries considered
    pub candidates: usize,
    pub inserted: usize,
    /// Candidates the catalog already had
    pub existing: usize,
    pub errors: usize,
    pub added: Vec<String>,
    pub skipped_tables: Vec<String>,
}

impl SeedOutcome {
    fn new(category: &str, dry_run: bool) -> Self {
        Self {
            category: category.to_string(),
            dry_run,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy)]
enum EntryKind {
    VehicleType,
    Part,
}

/// Part-code additions logged individually before switching to a summary
const LOGGED_PART_ADDITIONS: usize = 10;

/// Catalog seeding service
pub struct SeedingService<S> {
    store: S,
    normalizer: VehicleTypeNormalizer,
    settings: StandardizationSettings,
}

impl<S: CatalogStore> SeedingService<S> {
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

    /// Insert every known vehicle type the catalog is missing, in canonical form
    pub async fn seed(&self) -> AppResult<SeedOutcome> {
        let category_id = self
            .store
            .find_category_id(&self.settings.category_code)
            .await?;
        let products = self.store.list_products(&category_id).await?;

        let mut known: HashSet<String> = products
            .iter()
            .filter_map(|p| p.label())
            .map(|label| self.normalizer.normalize(label))
            .collect();

        let mut outcome = SeedOutcome::new(&self.settings.category_code, self.settings.dry_run);
        let candidates = self.collect_candidates(&mut outcome).await;
        outcome.candidates = candidates.len();
        tracing::info!("{} distinct vehicle types found", candidates.len());

        self.insert_missing(&category_id, EntryKind::VehicleType, candidates, &mut known, &mut outcome)
            .await;
        Ok(outcome)
    }

    /// Register every distinct part code found in the part registry
    ///
    /// Codes are trimmed but otherwise kept verbatim; the code doubles as
    /// product name and part number.
    pub async fn seed_parts(&self) -> AppResult<SeedOutcome> {
        let category_code = &self.settings.parts_category_code;
        let category_id = self.store.find_category_id(category_code).await?;
        let products = self.store.list_products(&category_id).await?;

        let mut known: HashSet<String> = products
            .iter()
            .filter_map(|p| p.product_code.as_deref())
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect();

        let mut outcome = SeedOutcome::new(category_code, self.settings.dry_run);
        let candidates = self.collect_part_codes(&mut outcome).await;
        outcome.candidates = candidates.len();
        tracing::info!("{} distinct part codes found", candidates.len());

        self.insert_missing(&category_id, EntryKind::Part, candidates, &mut known, &mut outcome)
            .await;
        if outcome.inserted > LOGGED_PART_ADDITIONS {
            tracing::info!(
                "... and {} more part codes",
                outcome.inserted - LOGGED_PART_ADDITIONS
            );
        }
        Ok(outcome)
    }

    async fn insert_missing(
        &self,
        category_id: &RowId,
        kind: EntryKind,
        candidates: Vec<String>,
        known: &mut HashSet<String>,
        outcome: &mut SeedOutcome,
    ) {
        for entry in candidates {
            if known.contains(&entry) {
                outcome.existing += 1;
                continue;
            }

            if !self.settings.dry_run {
                let result = match kind {
                    EntryKind::VehicleType => self.store.insert_product(category_id, &entry).await,
                    EntryKind::Part => self.store.insert_part(category_id, &entry).await,
                };
                match result {
                    Ok(()) => {}
                    Err(err) if err.is_duplicate() => {
                        tracing::info!("{} already registered", entry);
                        outcome.existing += 1;
                        known.insert(entry);
                        continue;
                    }
                    Err(err) => {
                        tracing::error!("Could not add {}: {}", entry, err);
                        outcome.errors += 1;
                        continue;
                    }
                }
            }

            outcome.inserted += 1;
            match kind {
                EntryKind::Part if outcome.inserted > LOGGED_PART_ADDITIONS => {
                    tracing::debug!("Added {}", entry)
                }
                _ => tracing::info!("Added {}", entry),
            }
            outcome.added.push(entry.clone());
            known.insert(entry);
        }
    }

    /// Static product lines plus every distinct label in the registry, normalized
    async fn collect_candidates(&self, outcome: &mut SeedOutcome) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        let mut push = |label: &str| {
            let normalized = self.normalizer.classify(label);
            if normalized.kind != MatchKind::Blank && seen.insert(normalized.label.clone()) {
                candidates.push(normalized.label);
            }
        };

        for label in STATIC_VEHICLE_TYPES {
            push(label);
        }

        for target in &self.settings.tables {
            match fetch_all_references(&self.store, target, self.settings.page_size).await {
                Ok(rows) => {
                    for value in rows.iter().filter_map(|r| r.value.as_deref()) {
                        push(value);
                    }
                }
                Err(err) if err.is_missing_table() => {
                    tracing::info!("Table {} not found, skipping", target.table);
                    outcome.skipped_tables.push(target.table.clone());
                }
                Err(err) => {
                    tracing::error!("Could not read {}: {}", target, err);
                    outcome.errors += 1;
                }
            }
        }

        candidates
    }

    /// Distinct trimmed, non-blank values of the part registry columns
    async fn collect_part_codes(&self, outcome: &mut SeedOutcome) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut codes = Vec::new();

        for target in &self.settings.part_tables {
            match fetch_all_references(&self.store, target, self.settings.page_size).await {
                Ok(rows) => {
                    for code in rows
                        .iter()
                        .filter_map(|r| r.value.as_deref())
                        .map(str::trim)
                        .filter(|code| !code.is_empty())
                    {
                        if seen.insert(code.to_string()) {
                            codes.push(code.to_string());
                        }
                    }
                }
                Err(err) if err.is_missing_table() => {
                    tracing::info!("Table {} not found, skipping", target.table);
                    outcome.skipped_tables.push(target.table.clone());
                }
                Err(err) => {
                    tracing::error!("Could not read {}: {}", target, err);
                    outcome.errors += 1;
                }
            }
        }

        codes
    }
}
