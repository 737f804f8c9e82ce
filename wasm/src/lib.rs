//! WebAssembly module for the Quality Management Platform
//!
//! Client-side vehicle-type normalization, so entry forms can show the
//! canonical label before a record is saved.

use serde::Serialize;
use std::sync::OnceLock;
use wasm_bindgen::prelude::*;

use qms_shared::{MatchKind, VehicleTypeNormalizer};

// Re-export shared types for use in JavaScript
pub use qms_shared::catalog::*;
pub use qms_shared::validation::*;

fn normalizer() -> &'static VehicleTypeNormalizer {
    static NORMALIZER: OnceLock<VehicleTypeNormalizer> = OnceLock::new();
    NORMALIZER.get_or_init(VehicleTypeNormalizer::standard)
}

#[derive(Serialize)]
struct Classification<'a> {
    label: &'a str,
    kind: MatchKind,
}

/// Canonical form of a vehicle-type label (trimmed input when unknown)
#[wasm_bindgen]
pub fn normalize_vehicle_type(label: &str) -> String {
    normalizer().normalize(label)
}

/// Normalized label plus how it matched, as `{"label": ..., "kind": ...}`
#[wasm_bindgen]
pub fn classify_vehicle_type(label: &str) -> Result<String, JsValue> {
    let normalized = normalizer().classify(label);
    serde_json::to_string(&Classification {
        label: &normalized.label,
        kind: normalized.kind,
    })
    .map_err(|e| JsValue::from_str(&format!("Serialization failed: {}", e)))
}

#[wasm_bindgen]
pub fn is_canonical_vehicle_type(label: &str) -> bool {
    normalizer().is_canonical(label)
}

/// Approved labels as a JSON array
#[wasm_bindgen]
pub fn canonical_vehicle_types() -> Result<String, JsValue> {
    serde_json::to_string(normalizer().canonical_labels())
        .map_err(|e| JsValue::from_str(&format!("Serialization failed: {}", e)))
}
