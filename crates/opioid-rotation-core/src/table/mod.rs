//! Potency reference table.
//!
//! Maps each opioid and route to a factor against morphine of the route's
//! class, and carries the patch and methadone band tables. Tables are
//! immutable once built: use [`ConversionTable::standard`] for the built-in
//! data or [`ConversionTable::from_json`] for an institution-specific table.

mod bands;
mod standard;

pub use bands::*;
pub use standard::*;

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Opioid, Route};

/// Table construction errors.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing entry for opioid: {0}")]
    MissingOpioid(Opioid),

    #[error("Duplicate entry for opioid: {0}")]
    DuplicateOpioid(Opioid),

    #[error("Invalid factor for {opioid} {route}: {value}")]
    InvalidFactor {
        opioid: Opioid,
        route: Route,
        value: f64,
    },

    #[error("Invalid patch bands for {0}: {1}")]
    InvalidBands(Opioid, String),

    #[error("Invalid methadone schedule: {0}")]
    InvalidMethadoneSchedule(String),
}

pub type TableResult<T> = Result<T, TableError>;

/// Factors for every route of one opioid.
///
/// Every route is listed; `null` marks a route with no clinical conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteFactors {
    #[serde(deserialize_with = "Option::deserialize")]
    pub oral: Option<f64>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub iv: Option<f64>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub sc: Option<f64>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub intrathecal: Option<f64>,
    /// OMME mg/day per mcg/h
    #[serde(deserialize_with = "Option::deserialize")]
    pub patch: Option<f64>,
}

impl RouteFactors {
    pub const UNSUPPORTED: RouteFactors = RouteFactors {
        oral: None,
        iv: None,
        sc: None,
        intrathecal: None,
        patch: None,
    };

    pub fn get(&self, route: Route) -> Option<f64> {
        match route {
            Route::Oral => self.oral,
            Route::Iv => self.iv,
            Route::Sc => self.sc,
            Route::Intrathecal => self.intrathecal,
            Route::Patch => self.patch,
        }
    }
}

/// Reference data for one opioid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpioidProfile {
    pub opioid: Opioid,
    pub factors: RouteFactors,
    /// Ascending patch bands; empty when no patch exists
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patch_bands: Vec<PatchBand>,
}

/// Serialized form of a conversion table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDocument {
    pub opioids: Vec<OpioidProfile>,
    pub methadone: MethadoneSchedule,
}

static STANDARD_TABLE: Lazy<ConversionTable> =
    Lazy::new(|| ConversionTable::from_document_unchecked(standard_document()));

/// Immutable potency table.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionTable {
    profiles: BTreeMap<Opioid, OpioidProfile>,
    methadone: MethadoneSchedule,
}

impl ConversionTable {
    /// The built-in table, shared for the life of the process.
    pub fn standard() -> &'static ConversionTable {
        &STANDARD_TABLE
    }

    /// Load and validate a table from JSON.
    pub fn from_json(json: &str) -> TableResult<Self> {
        let document: TableDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    /// Validate a table document.
    pub fn from_document(document: TableDocument) -> TableResult<Self> {
        let mut profiles = BTreeMap::new();
        for profile in document.opioids {
            validate_profile(&profile)?;
            let opioid = profile.opioid;
            if profiles.insert(opioid, profile).is_some() {
                return Err(TableError::DuplicateOpioid(opioid));
            }
        }

        if let Some(missing) = Opioid::ALL.iter().find(|o| !profiles.contains_key(*o)) {
            return Err(TableError::MissingOpioid(*missing));
        }

        let reference = profiles[&Opioid::REFERENCE].factors.oral;
        if reference != Some(1.0) {
            return Err(TableError::InvalidFactor {
                opioid: Opioid::REFERENCE,
                route: Route::Oral,
                value: reference.unwrap_or(f64::NAN),
            });
        }

        validate_methadone(&document.methadone)?;

        Ok(Self {
            profiles,
            methadone: document.methadone,
        })
    }

    fn from_document_unchecked(document: TableDocument) -> Self {
        Self {
            profiles: document
                .opioids
                .into_iter()
                .map(|p| (p.opioid, p))
                .collect(),
            methadone: document.methadone,
        }
    }

    /// Export in the format accepted by [`ConversionTable::from_json`].
    pub fn to_json(&self) -> TableResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    pub fn to_document(&self) -> TableDocument {
        TableDocument {
            opioids: Opioid::ALL
                .iter()
                .filter_map(|o| self.profiles.get(o).cloned())
                .collect(),
            methadone: self.methadone.clone(),
        }
    }

    /// Potency factor, or `None` when the pair has no clinical conversion.
    pub fn factor(&self, opioid: Opioid, route: Route) -> Option<f64> {
        self.profiles
            .get(&opioid)
            .and_then(|profile| profile.factors.get(route))
    }

    /// Patch bands, or `None` when no patch exists for the opioid.
    pub fn patch_bands(&self, opioid: Opioid) -> Option<&[PatchBand]> {
        self.profiles
            .get(&opioid)
            .map(|profile| profile.patch_bands.as_slice())
            .filter(|bands| !bands.is_empty())
    }

    pub fn methadone_schedule(&self) -> &MethadoneSchedule {
        &self.methadone
    }

    /// Routes that can appear on either side of a conversion.
    pub fn supported_routes(&self, opioid: Opioid) -> Vec<Route> {
        Route::ALL
            .into_iter()
            .filter(|route| {
                self.factor(opioid, *route).is_some()
                    || (*route == Route::Patch && self.patch_bands(opioid).is_some())
            })
            .collect()
    }
}

fn validate_profile(profile: &OpioidProfile) -> TableResult<()> {
    for route in Route::ALL {
        if let Some(value) = profile.factors.get(route) {
            if !value.is_finite() || value <= 0.0 {
                return Err(TableError::InvalidFactor {
                    opioid: profile.opioid,
                    route,
                    value,
                });
            }
        }
    }

    let invalid = |reason: &str| TableError::InvalidBands(profile.opioid, reason.to_string());
    for band in &profile.patch_bands {
        if !(band.omme_upper_bound.is_finite() && band.omme_upper_bound > 0.0) {
            return Err(invalid("upper bounds must be positive"));
        }
        if !(band.strength_mcg_per_hour.is_finite() && band.strength_mcg_per_hour > 0.0) {
            return Err(invalid("strengths must be positive"));
        }
    }
    for pair in profile.patch_bands.windows(2) {
        if pair[1].omme_upper_bound <= pair[0].omme_upper_bound {
            return Err(invalid("upper bounds must be strictly ascending"));
        }
        if pair[1].strength_mcg_per_hour <= pair[0].strength_mcg_per_hour {
            return Err(invalid("strengths must be strictly ascending"));
        }
    }

    // A patch converted to OMME must select its own band again.
    if let Some(factor) = profile.factors.patch {
        for band in &profile.patch_bands {
            let omme = band.strength_mcg_per_hour * factor;
            if select_patch_band(&profile.patch_bands, omme) != Some(band) {
                return Err(TableError::InvalidBands(
                    profile.opioid,
                    format!(
                        "{} mcg/h gives {} mg OMME, outside its own band",
                        band.strength_mcg_per_hour, omme
                    ),
                ));
            }
        }
    }
    Ok(())
}

fn validate_methadone(schedule: &MethadoneSchedule) -> TableResult<()> {
    let invalid = |reason: &str| TableError::InvalidMethadoneSchedule(reason.to_string());

    if !(schedule.minimum_omme.is_finite() && schedule.minimum_omme > 0.0) {
        return Err(invalid("minimum OMME must be positive"));
    }
    if !(schedule.reverse_ratio.is_finite() && schedule.reverse_ratio > 0.0) {
        return Err(invalid("reverse ratio must be positive"));
    }
    if schedule.bands.is_empty() {
        return Err(invalid("at least one band is required"));
    }

    let mut lower = schedule.minimum_omme;
    let mut previous_ratio = 0.0;
    let last = schedule.bands.len() - 1;
    for (i, band) in schedule.bands.iter().enumerate() {
        if !(band.ratio.is_finite() && band.ratio >= 0.0) {
            return Err(invalid("ratios must be non-negative"));
        }
        if band.ratio < previous_ratio {
            return Err(invalid("ratios must be non-decreasing"));
        }
        previous_ratio = band.ratio;

        match band.omme_upper_bound {
            Some(upper) if upper.is_finite() && upper > lower => lower = upper,
            Some(_) => return Err(invalid("upper bounds must be ascending from the minimum")),
            None if i != last => return Err(invalid("only the top band may be open")),
            None => {}
        }
    }
    Ok(())
}
