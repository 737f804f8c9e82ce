//! The vehicle-type catalog: canonical labels, aliases and fallback rules

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::normalize::{normalize_key, FallbackRule};

/// Long-form label of the hydraulic compaction garbage truck line
pub const HSCK_LABEL: &str = "HSCK (Hidrolik Sıkıştırmalı Çöp Kamyonu)";

/// Approved vehicle-type spellings
pub const CANONICAL_VEHICLE_TYPES: [&str; 7] = [
    "AGA6000",
    "AGA2100",
    "AGA3000",
    "KDM 35",
    "KDM 70",
    "KDM 80",
    HSCK_LABEL,
];

/// Known variants whose normalized key differs from the canonical key
const DEFAULT_ALIASES: [(&str, &str); 6] = [
    ("kdm35", "KDM 35"),
    ("kdm70", "KDM 70"),
    ("kdm80", "KDM 80"),
    ("hsck", HSCK_LABEL),
    ("hsc", HSCK_LABEL),
    ("hsc k", HSCK_LABEL),
];

/// Product lines registered in the catalog before any data was imported
pub const STATIC_VEHICLE_TYPES: [&str; 17] = [
    "FTH-240",
    "Çelik-2000",
    "AGA2100",
    "AGA3000",
    "AGA6000",
    "Kompost Makinesi",
    "Çay Toplama Makinesi",
    "KDM 35",
    "KDM 70",
    "KDM 80",
    "Rusya Motor Odası",
    "Ural",
    "HSCK",
    HSCK_LABEL,
    "Traktör Kabin",
    "Genel Hurda",
    "Diğer",
];

/// Catalog definition errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Canonical label is blank")]
    BlankCanonical,

    #[error("Canonical label {0:?} has surrounding whitespace")]
    UntrimmedCanonical(String),

    #[error("Alias for {canonical} is blank")]
    BlankAlias { canonical: String },

    #[error("{target} is not a canonical vehicle type (referenced by {referrer})")]
    UnknownCanonical { referrer: String, target: String },

    #[error("Alias {alias:?} maps to both {first} and {second}")]
    ConflictingAlias {
        alias: String,
        first: String,
        second: String,
    },

    #[error("Fallback rule for {0} has no tokens")]
    EmptyRule(String),
}

/// Definition consumed by [`crate::VehicleTypeNormalizer`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VehicleTypeCatalog {
    pub canonical: Vec<String>,
    pub aliases: Vec<(String, String)>,
    /// Evaluated in order; the first match wins
    pub rules: Vec<FallbackRule>,
}

impl Default for VehicleTypeCatalog {
    fn default() -> Self {
        let rules = vec![
            FallbackRule::new("AGA6000", &["aga", "6000"]),
            FallbackRule::new("AGA2100", &["aga", "2100"]),
            FallbackRule::new("AGA3000", &["aga", "3000"]),
            FallbackRule::new("KDM 35", &["kdm", "35"]),
            FallbackRule::new("KDM 70", &["kdm", "70"]),
            FallbackRule::new("KDM 80", &["kdm", "80"]),
            FallbackRule::new(HSCK_LABEL, &["hsck"]),
            FallbackRule::new(HSCK_LABEL, &["hsc"]).excluding(&["hidrolik"]),
        ];

        Self {
            canonical: CANONICAL_VEHICLE_TYPES.iter().map(|c| c.to_string()).collect(),
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|(a, c)| (a.to_string(), c.to_string()))
                .collect(),
            rules,
        }
    }
}

impl VehicleTypeCatalog {
    pub fn with_alias(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.aliases.push((alias.into(), canonical.into()));
        self
    }

    pub fn with_aliases<I, A, C>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = (A, C)>,
        A: Into<String>,
        C: Into<String>,
    {
        self.aliases
            .extend(aliases.into_iter().map(|(a, c)| (a.into(), c.into())));
        self
    }

    /// Every target must be canonical and no key may resolve two ways
    pub fn validate(&self) -> Result<(), CatalogError> {
        let canonical: HashSet<&str> = self.canonical.iter().map(String::as_str).collect();
        let mut keys: HashMap<String, &str> = HashMap::new();

        for label in &self.canonical {
            if label.trim().is_empty() {
                return Err(CatalogError::BlankCanonical);
            }
            if label.trim() != label {
                return Err(CatalogError::UntrimmedCanonical(label.clone()));
            }
            register_key(&mut keys, normalize_key(label), label)?;
        }

        for (alias, target) in &self.aliases {
            let key = normalize_key(alias);
            if key.is_empty() {
                return Err(CatalogError::BlankAlias {
                    canonical: target.clone(),
                });
            }
            if !canonical.contains(target.as_str()) {
                return Err(CatalogError::UnknownCanonical {
                    referrer: alias.clone(),
                    target: target.clone(),
                });
            }
            register_key(&mut keys, key, target)?;
        }

        for rule in &self.rules {
            if !canonical.contains(rule.canonical.as_str()) {
                return Err(CatalogError::UnknownCanonical {
                    referrer: format!("rule {}", rule.all_of.join("+")),
                    target: rule.canonical.clone(),
                });
            }
            if rule.all_of.iter().all(|t| normalize_key(t).is_empty()) {
                return Err(CatalogError::EmptyRule(rule.canonical.clone()));
            }
        }

        Ok(())
    }
}

fn register_key<'a>(
    keys: &mut HashMap<String, &'a str>,
    key: String,
    target: &'a str,
) -> Result<(), CatalogError> {
    match keys.get(&key) {
        Some(existing) if *existing != target => Err(CatalogError::ConflictingAlias {
            alias: key,
            first: existing.to_string(),
            second: target.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            keys.insert(key, target);
            Ok(())
        }
    }
}
