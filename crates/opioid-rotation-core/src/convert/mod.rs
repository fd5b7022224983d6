//! Dose conversion engine.
//!
//! Pipeline: Validation → Canonical conversion (morphine pivot) → Target resolution

mod canonical;
mod normalizer;
mod target;

pub use canonical::*;
pub use normalizer::*;
pub use target::*;

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{
    AppliedRule, ConversionOutcome, ConversionRequest, Opioid, PatchStrength, Route, TargetDose,
};
use crate::table::ConversionTable;

/// Conversion errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("Dose must be greater than 0, got {0}")]
    InvalidDose(f64),

    #[error("Oral/parenteral ratio must be 2 or 3, got {0}")]
    InvalidRatio(f64),

    #[error("Unknown opioid: {name}{}", did_you_mean(.suggestion))]
    UnknownOpioid {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Unknown route: {name}{}", did_you_mean(.suggestion))]
    UnknownRoute {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Conversion not available for {opioid} by route {route}")]
    UnsupportedCombination { opioid: Opioid, route: Route },

    #[error("Equivalent dose of {omme} mg oral morphine exceeds the highest band ({max_omme} mg)")]
    OutOfRange { omme: f64, max_omme: f64 },

    #[error("Equivalent dose of {omme} mg oral morphine is below the {minimum} mg minimum for methadone")]
    BelowMethadoneMinimum { omme: f64, minimum: f64 },

    #[error("Dose {dose} cannot be converted: the result {value} is not a usable positive number")]
    Unrepresentable { dose: f64, value: f64 },
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean '{}'?)", s))
        .unwrap_or_default()
}

pub type ConversionResult<T> = Result<T, ConversionError>;

/// Caller-visible failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    InvalidInput,
    UnsupportedCombination,
    OutOfRange,
    BelowMethadoneMinimum,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::InvalidInput => "invalid_input",
            FailureKind::UnsupportedCombination => "unsupported_combination",
            FailureKind::OutOfRange => "out_of_range",
            FailureKind::BelowMethadoneMinimum => "below_methadone_minimum",
        };
        f.write_str(name)
    }
}

impl ConversionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ConversionError::InvalidDose(_)
            | ConversionError::InvalidRatio(_)
            | ConversionError::UnknownOpioid { .. }
            | ConversionError::UnknownRoute { .. }
            | ConversionError::Unrepresentable { .. } => FailureKind::InvalidInput,
            ConversionError::UnsupportedCombination { .. } => FailureKind::UnsupportedCombination,
            ConversionError::OutOfRange { .. } => FailureKind::OutOfRange,
            ConversionError::BelowMethadoneMinimum { .. } => FailureKind::BelowMethadoneMinimum,
        }
    }
}

/// Reject overflow to infinity and underflow to zero.
fn ensure_usable(dose: f64, value: f64) -> ConversionResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        warn!(dose, value, "conversion result not representable");
        Err(ConversionError::Unrepresentable { dose, value })
    }
}

/// Main converter that coordinates the full pipeline.
pub struct Converter<'a> {
    table: &'a ConversionTable,
    normalizer: Normalizer,
    canonical: CanonicalConverter<'a>,
    resolver: TargetResolver<'a>,
}

impl Converter<'static> {
    /// Converter over the built-in table.
    pub fn standard() -> Self {
        Self::new(ConversionTable::standard())
    }
}

impl<'a> Converter<'a> {
    /// Create a new converter.
    pub fn new(table: &'a ConversionTable) -> Self {
        Self {
            table,
            normalizer: Normalizer::new(),
            canonical: CanonicalConverter::new(table),
            resolver: TargetResolver::new(table),
        }
    }

    /// Convert a dose to the requested opioid and route.
    pub fn convert(&self, request: &ConversionRequest) -> ConversionResult<ConversionOutcome> {
        if let Err(e) = self.validate(request) {
            warn!(?request, error = %e, "conversion rejected");
            return Err(e);
        }

        // Step 1: Source dose to morphine pivot
        let equivalent = self.canonical.to_omme(
            request.source_opioid,
            request.source_route,
            request.dose,
        )?;
        debug!(?equivalent, "morphine equivalent");
        ensure_usable(request.dose, equivalent.oral_mg(request.ratio))?;

        // Step 2: Identical source and target need no conversion
        if request.is_identity() {
            let target = match request.target_route {
                Route::Patch => TargetDose::Patch(PatchStrength {
                    mcg_per_hour: request.dose,
                }),
                route => TargetDose::Dose {
                    amount: request.dose,
                    unit: route.dose_unit(),
                },
            };
            return Ok(ConversionOutcome {
                target,
                omme_mg: equivalent.oral_mg(request.ratio),
                rule: AppliedRule::Identity,
            });
        }

        // Step 3: Morphine pivot to target
        let outcome = self.resolver.from_omme(request, equivalent)?;
        ensure_usable(request.dose, outcome.omme_mg)?;
        ensure_usable(request.dose, outcome.target.amount())?;
        Ok(outcome)
    }

    /// Convert from free-text names, as entered in a front end.
    pub fn convert_names(
        &self,
        source_opioid: &str,
        source_route: &str,
        target_opioid: &str,
        target_route: &str,
        dose: f64,
        ratio: f64,
    ) -> ConversionResult<ConversionOutcome> {
        let request = ConversionRequest {
            source_opioid: self.normalizer.parse_opioid(source_opioid)?,
            source_route: self.normalizer.parse_route(source_route)?,
            target_opioid: self.normalizer.parse_opioid(target_opioid)?,
            target_route: self.normalizer.parse_route(target_route)?,
            dose,
            ratio: self.normalizer.parse_ratio(ratio)?,
        };
        self.convert(&request)
    }

    /// Convert several requests independently.
    pub fn convert_all(
        &self,
        requests: &[ConversionRequest],
    ) -> Vec<ConversionResult<ConversionOutcome>> {
        requests.iter().map(|r| self.convert(r)).collect()
    }

    /// Reject a request before any computation.
    fn validate(&self, request: &ConversionRequest) -> ConversionResult<()> {
        if !(request.dose.is_finite() && request.dose > 0.0) {
            return Err(ConversionError::InvalidDose(request.dose));
        }

        if self
            .table
            .factor(request.source_opioid, request.source_route)
            .is_none()
        {
            return Err(ConversionError::UnsupportedCombination {
                opioid: request.source_opioid,
                route: request.source_route,
            });
        }

        // Patch targets are checked against the band tables during resolution
        if request.target_route != Route::Patch
            && self
                .table
                .factor(request.target_opioid, request.target_route)
                .is_none()
        {
            return Err(ConversionError::UnsupportedCombination {
                opioid: request.target_opioid,
                route: request.target_route,
            });
        }

        Ok(())
    }

    /// Get the table for direct access.
    pub fn table(&self) -> &'a ConversionTable {
        self.table
    }

    /// Get the normalizer for direct access.
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}
