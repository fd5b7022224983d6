//! Opioid Rotation Core Library
//!
//! Equianalgesic dose conversion for opioid rotation.
//!
//! # Architecture
//!
//! ```text
//! (opioid, route, dose) ──► Validation ──► Canonical conversion
//!                                                │
//!                                   [PIVOT: morphine mg + route class]
//!                                                │
//!                 ┌──────────────────┬───────────┴──────┬──────────────────┐
//!                 │                  │                  │                  │
//!                 ▼                  ▼                  ▼                  ▼
//!            Patch band       Methadone band    Methadone reverse    Linear factor
//!           (mcg/h label)       (4 / 8 / 12)          (×5)          (ratio once on
//!                                                                  class change)
//! ```
//!
//! # Core Principle
//!
//! **One pivot, one ratio application.** Every dose passes through morphine
//! milligrams, and the oral/parenteral ratio is applied only where the route
//! class actually changes.
//!
//! # Modules
//!
//! - [`models`]: Domain types (Opioid, Route, ConversionRequest, etc.)
//! - [`table`]: Potency table, patch and methadone bands, JSON loading
//! - [`convert`]: Conversion engine (canonical converter + target resolver)

pub mod convert;
pub mod models;
pub mod table;

// Re-export commonly used types
pub use convert::{ConversionError, ConversionResult, Converter, FailureKind, Normalizer};
pub use models::{
    AppliedRule, ConversionOutcome, ConversionRequest, DoseUnit, MorphineEquivalent, Opioid,
    OralParenteralRatio, PatchStrength, Route, RouteClass, TargetDose,
};
pub use table::{ConversionTable, TableError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::Arc;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum OpioidRotationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported combination: {0}")]
    UnsupportedCombination(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Below methadone minimum: {0}")]
    BelowMethadoneMinimum(String),

    #[error("Invalid table: {0}")]
    InvalidTable(String),
}

impl From<ConversionError> for OpioidRotationError {
    fn from(e: ConversionError) -> Self {
        let message = e.to_string();
        match e.kind() {
            FailureKind::InvalidInput => OpioidRotationError::InvalidInput(message),
            FailureKind::UnsupportedCombination => {
                OpioidRotationError::UnsupportedCombination(message)
            }
            FailureKind::OutOfRange => OpioidRotationError::OutOfRange(message),
            FailureKind::BelowMethadoneMinimum => {
                OpioidRotationError::BelowMethadoneMinimum(message)
            }
        }
    }
}

impl From<TableError> for OpioidRotationError {
    fn from(e: TableError) -> Self {
        OpioidRotationError::InvalidTable(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Core over the built-in potency table.
#[uniffi::export]
pub fn open_standard() -> Arc<OpioidRotationCore> {
    Arc::new(OpioidRotationCore {
        table: ConversionTable::standard().clone(),
    })
}

/// Core over an institution-specific table in JSON form.
#[uniffi::export]
pub fn open_table_json(json: String) -> Result<Arc<OpioidRotationCore>, OpioidRotationError> {
    let table = ConversionTable::from_json(&json)?;
    Ok(Arc::new(OpioidRotationCore { table }))
}

/// Convert with the built-in table.
#[uniffi::export]
pub fn convert_dose(
    source_opioid: String,
    source_route: String,
    target_opioid: String,
    target_route: String,
    dose: f64,
    oral_parenteral_ratio: f64,
) -> Result<FfiConversionResult, OpioidRotationError> {
    let outcome = Converter::standard().convert_names(
        &source_opioid,
        &source_route,
        &target_opioid,
        &target_route,
        dose,
        oral_parenteral_ratio,
    )?;
    Ok(outcome.into())
}

// =========================================================================
// Main API Object
// =========================================================================

/// Immutable conversion engine for FFI. Safe to share across threads.
#[derive(uniffi::Object)]
pub struct OpioidRotationCore {
    table: ConversionTable,
}

#[uniffi::export]
impl OpioidRotationCore {
    /// Convert a dose to the requested opioid and route.
    pub fn convert_dose(
        &self,
        source_opioid: String,
        source_route: String,
        target_opioid: String,
        target_route: String,
        dose: f64,
        oral_parenteral_ratio: f64,
    ) -> Result<FfiConversionResult, OpioidRotationError> {
        let outcome = Converter::new(&self.table).convert_names(
            &source_opioid,
            &source_route,
            &target_opioid,
            &target_route,
            dose,
            oral_parenteral_ratio,
        )?;
        Ok(outcome.into())
    }

    /// All opioids with the routes each supports.
    pub fn list_opioids(&self) -> Vec<FfiOpioid> {
        Opioid::ALL
            .into_iter()
            .map(|opioid| FfiOpioid {
                id: opioid.id().to_string(),
                name: opioid.english_name().to_string(),
                routes: route_ids(&self.table, opioid),
            })
            .collect()
    }

    /// Routes available for one opioid (for filtering a route picker).
    pub fn supported_routes(&self, opioid: String) -> Result<Vec<String>, OpioidRotationError> {
        let opioid = Normalizer::new().parse_opioid(&opioid)?;
        Ok(route_ids(&self.table, opioid))
    }

    /// Export the table in the format accepted by `open_table_json`.
    pub fn export_table_json(&self) -> Result<String, OpioidRotationError> {
        Ok(self.table.to_json()?)
    }
}

fn route_ids(table: &ConversionTable, opioid: Opioid) -> Vec<String> {
    table
        .supported_routes(opioid)
        .into_iter()
        .map(|r| r.id().to_string())
        .collect()
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe conversion result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiConversionResult {
    /// "dose" or "patch"
    pub kind: String,
    pub amount: f64,
    /// "mg" or "mcg/h"
    pub unit: String,
    /// Display label, e.g. "12.5 mg" or "50 mcg/h"
    pub label: String,
    pub omme_mg: f64,
    pub rule: String,
}

impl From<ConversionOutcome> for FfiConversionResult {
    fn from(outcome: ConversionOutcome) -> Self {
        let kind = match outcome.target {
            TargetDose::Dose { .. } => "dose",
            TargetDose::Patch(_) => "patch",
        };
        Self {
            kind: kind.to_string(),
            amount: outcome.target.amount(),
            unit: outcome.target.unit().to_string(),
            label: outcome.target.label(),
            omme_mg: outcome.omme_mg,
            rule: outcome.rule.to_string(),
        }
    }
}

/// FFI-safe opioid description.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiOpioid {
    pub id: String,
    pub name: String,
    pub routes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_dose_ffi() {
        let result = convert_dose(
            "morfina".into(),
            "oral".into(),
            "fentanilo".into(),
            "patch".into(),
            90.0,
            2.0,
        )
        .unwrap();

        assert_eq!(result.kind, "patch");
        assert_eq!(result.label, "25 mcg/h");
        assert_eq!(result.unit, "mcg/h");
        assert_eq!(result.omme_mg, 90.0);
    }

    #[test]
    fn test_ffi_error_kinds() {
        let err = convert_dose(
            "buprenorfina".into(),
            "oral".into(),
            "morfina".into(),
            "oral".into(),
            10.0,
            2.0,
        )
        .unwrap_err();
        assert!(matches!(err, OpioidRotationError::UnsupportedCombination(_)));

        let err = convert_dose(
            "morfina".into(),
            "oral".into(),
            "metadona".into(),
            "oral".into(),
            20.0,
            2.0,
        )
        .unwrap_err();
        assert!(matches!(err, OpioidRotationError::BelowMethadoneMinimum(_)));
    }

    #[test]
    fn test_list_opioids() {
        let core = open_standard();
        let opioids = core.list_opioids();

        assert_eq!(opioids.len(), 10);
        let fentanyl = opioids.iter().find(|o| o.id == "fentanilo").unwrap();
        assert_eq!(fentanyl.routes, vec!["iv", "patch"]);
    }

    #[test]
    fn test_supported_routes_unknown_opioid() {
        let core = open_standard();
        let err = core.supported_routes("aspirin".into()).unwrap_err();
        assert!(matches!(err, OpioidRotationError::InvalidInput(_)));
    }

    #[test]
    fn test_open_table_json_round_trip() {
        let json = open_standard().export_table_json().unwrap();
        let core = open_table_json(json).unwrap();

        let result = core
            .convert_dose(
                "metadona".into(),
                "oral".into(),
                "morfina".into(),
                "oral".into(),
                10.0,
                2.0,
            )
            .unwrap();
        assert_eq!(result.amount, 50.0);
    }

    #[test]
    fn test_open_table_json_invalid() {
        let err = open_table_json("{}".into()).err().unwrap();
        assert!(matches!(err, OpioidRotationError::InvalidTable(_)));
    }
}
