//! Vehicle-type label normalization
//!
//! Maps free-text vehicle-type labels onto the canonical spellings of the
//! catalog. Lookup order:
//! 1. exact match of the normalized key against the alias table
//! 2. first fallback rule (in priority order) whose tokens the key contains
//! 3. the trimmed input, otherwise untouched

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::catalog::{CatalogError, VehicleTypeCatalog};

/// Comparison key: trimmed, inner whitespace collapsed, lowercased
pub fn normalize_key(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// How a label reached its normalized form
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Key found in the alias table
    Alias,
    /// Key matched a fallback rule
    Rule,
    /// Nothing matched; the trimmed input is kept
    Unmatched,
    /// Input was empty or whitespace only
    Blank,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchKind::Alias => "alias",
            MatchKind::Rule => "rule",
            MatchKind::Unmatched => "unmatched",
            MatchKind::Blank => "blank",
        };
        f.write_str(name)
    }
}

/// Result of normalizing one label
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Normalized {
    pub label: String,
    pub kind: MatchKind,
}

impl Normalized {
    pub fn is_unmatched(&self) -> bool {
        self.kind == MatchKind::Unmatched
    }
}

/// Substring fallback: every `all_of` token present, no `none_of` token present
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FallbackRule {
    pub canonical: String,
    pub all_of: Vec<String>,
    #[serde(default)]
    pub none_of: Vec<String>,
}

impl FallbackRule {
    pub fn new(canonical: impl Into<String>, all_of: &[&str]) -> Self {
        Self {
            canonical: canonical.into(),
            all_of: all_of.iter().map(|t| t.to_string()).collect(),
            none_of: Vec::new(),
        }
    }

    pub fn excluding(mut self, none_of: &[&str]) -> Self {
        self.none_of = none_of.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Test against an already normalized key
    pub fn matches(&self, key: &str) -> bool {
        self.all_of.iter().all(|t| key.contains(t.as_str()))
            && !self.none_of.iter().any(|t| key.contains(t.as_str()))
    }

    fn normalized(&self) -> Self {
        let tokens = |list: &[String]| -> Vec<String> {
            list.iter()
                .map(|t| normalize_key(t))
                .filter(|t| !t.is_empty())
                .collect()
        };
        Self {
            canonical: self.canonical.clone(),
            all_of: tokens(&self.all_of),
            none_of: tokens(&self.none_of),
        }
    }
}

/// Maps labels to canonical vehicle types
#[derive(Debug, Clone)]
pub struct VehicleTypeNormalizer {
    canonical: Vec<String>,
    aliases: HashMap<String, String>,
    rules: Vec<FallbackRule>,
}

impl VehicleTypeNormalizer {
    /// Build from a catalog, rejecting catalogs that would break idempotency
    pub fn from_catalog(catalog: VehicleTypeCatalog) -> Result<Self, CatalogError> {
        catalog.validate()?;
        Ok(Self::assemble(catalog))
    }

    /// Normalizer over the built-in catalog
    pub fn standard() -> Self {
        Self::assemble(VehicleTypeCatalog::default())
    }

    fn assemble(catalog: VehicleTypeCatalog) -> Self {
        let mut aliases = HashMap::new();
        // Canonical labels map to themselves before any alias is considered.
        for label in &catalog.canonical {
            aliases
                .entry(normalize_key(label))
                .or_insert_with(|| label.clone());
        }
        for (alias, canonical) in &catalog.aliases {
            aliases
                .entry(normalize_key(alias))
                .or_insert_with(|| canonical.clone());
        }

        let rules = catalog.rules.iter().map(FallbackRule::normalized).collect();

        Self {
            canonical: catalog.canonical,
            aliases,
            rules,
        }
    }

    /// Normalize a label and report which stage matched
    pub fn classify(&self, label: &str) -> Normalized {
        let key = normalize_key(label);
        if key.is_empty() {
            return Normalized {
                label: label.trim().to_string(),
                kind: MatchKind::Blank,
            };
        }

        if let Some(canonical) = self.aliases.get(&key) {
            return Normalized {
                label: canonical.clone(),
                kind: MatchKind::Alias,
            };
        }

        if let Some(rule) = self.rules.iter().find(|rule| rule.matches(&key)) {
            return Normalized {
                label: rule.canonical.clone(),
                kind: MatchKind::Rule,
            };
        }

        Normalized {
            label: label.trim().to_string(),
            kind: MatchKind::Unmatched,
        }
    }

    /// Canonical form of `label`, or the trimmed input when nothing matches
    pub fn normalize(&self, label: &str) -> String {
        self.classify(label).label
    }

    pub fn is_canonical(&self, label: &str) -> bool {
        self.canonical.iter().any(|c| c == label)
    }

    pub fn canonical_labels(&self) -> &[String] {
        &self.canonical
    }

    /// Alias table sorted by key
    pub fn aliases(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .aliases
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort();
        entries
    }

    pub fn rules(&self) -> &[FallbackRule] {
        &self.rules
    }
}

impl Default for VehicleTypeNormalizer {
    fn default() -> Self {
        Self::standard()
    }
}
