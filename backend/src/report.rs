//! Run reports: console summary, JSON output and the manual-review CSV

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::error::AppResult;
use crate::services::{
    CascadeOutcome, ProductMergeOutcome, SeedOutcome, TableOutcome, TableStatus,
};

const RULE: &str = "================================================";

/// Outcome of a standardization run
#[derive(Debug, Clone, Serialize)]
pub struct StandardizationReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<ProductMergeOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<CascadeOutcome>,
}

/// A label left unchanged because nothing matched it
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UnmatchedEntry {
    pub source: String,
    pub label: String,
    pub occurrences: usize,
}

impl StandardizationReport {
    pub fn total_errors(&self) -> usize {
        self.products.as_ref().map(|p| p.errors).unwrap_or(0)
            + self
                .references
                .as_ref()
                .map(CascadeOutcome::total_errors)
                .unwrap_or(0)
    }

    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Unmatched labels per source, products first, then registry order
    pub fn unmatched_entries(&self) -> Vec<UnmatchedEntry> {
        let mut entries = Vec::new();
        if let Some(products) = &self.products {
            entries.extend(products.unmatched.iter().map(|(label, count)| UnmatchedEntry {
                source: "products".to_string(),
                label: label.clone(),
                occurrences: *count,
            }));
        }
        if let Some(references) = &self.references {
            for table in &references.tables {
                entries.extend(table.unmatched.iter().map(|(label, count)| UnmatchedEntry {
                    source: table.target.to_string(),
                    label: label.clone(),
                    occurrences: *count,
                }));
            }
        }
        entries
    }

    /// Write unmatched labels as `source,label,occurrences`; returns the row count
    pub fn write_unmatched_csv(&self, path: &Path) -> AppResult<usize> {
        let entries = self.unmatched_entries();
        let mut writer = csv::Writer::from_path(path)?;
        for entry in &entries {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        Ok(entries.len())
    }
}

impl fmt::Display for StandardizationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        if self.dry_run {
            writeln!(f, "Standardization dry run (nothing was written)")?;
        } else {
            writeln!(f, "Standardization complete")?;
        }

        if let Some(products) = &self.products {
            writeln!(
                f,
                "  Products: {} renamed, {} deleted, {} unchanged, {} errors",
                products.renamed, products.deleted, products.unchanged, products.errors
            )?;
            if products.unlabeled > 0 {
                writeln!(f, "    {} rows without code or name left alone", products.unlabeled)?;
            }
        }

        if let Some(references) = &self.references {
            writeln!(
                f,
                "  References: {} rows updated",
                references.total_updated()
            )?;
            for table in &references.tables {
                write_table_line(f, table)?;
            }
        }

        let unmatched = self.unmatched_entries();
        if !unmatched.is_empty() {
            writeln!(f, "  Unmatched labels (left unchanged, review manually):")?;
            for entry in &unmatched {
                writeln!(
                    f,
                    "    {:?} in {} ({} rows)",
                    entry.label, entry.source, entry.occurrences
                )?;
            }
        }

        let elapsed = self.finished_at - self.started_at;
        writeln!(
            f,
            "  Duration: {:.2}s",
            elapsed.num_milliseconds() as f64 / 1000.0
        )
    }
}

fn write_table_line(f: &mut fmt::Formatter<'_>, table: &TableOutcome) -> fmt::Result {
    match table.status {
        TableStatus::Processed => writeln!(
            f,
            "    {}: {} updated, {} unchanged, {} errors",
            table.target, table.updated, table.unchanged, table.errors
        ),
        TableStatus::Skipped => writeln!(f, "    {}: skipped (table not found)", table.target),
        TableStatus::Failed => writeln!(
            f,
            "    {}: failed ({})",
            table.target,
            table.message.as_deref().unwrap_or("unknown error")
        ),
    }
}

impl fmt::Display for SeedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        if self.dry_run {
            writeln!(f, "{} seeding dry run (nothing was written)", self.category)?;
        } else {
            writeln!(f, "{} seeding complete", self.category)?;
        }
        writeln!(
            f,
            "  {} entries considered: {} added, {} already present, {} errors",
            self.candidates, self.inserted, self.existing, self.errors
        )?;
        for label in &self.added {
            writeln!(f, "    + {}", label)?;
        }
        for table in &self.skipped_tables {
            writeln!(f, "  {} skipped (table not found)", table)?;
        }
        Ok(())
    }
}
