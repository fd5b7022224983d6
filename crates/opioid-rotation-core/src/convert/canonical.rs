//! Source dose to morphine equivalent.

use crate::models::{MorphineEquivalent, Opioid, Route};
use crate::table::ConversionTable;

use super::{ConversionError, ConversionResult};

/// Converts a source dose into the morphine pivot.
pub struct CanonicalConverter<'a> {
    table: &'a ConversionTable,
}

impl<'a> CanonicalConverter<'a> {
    pub fn new(table: &'a ConversionTable) -> Self {
        Self { table }
    }

    /// Morphine milligrams in the route's class for `dose` of `opioid`.
    ///
    /// The oral/parenteral ratio is not applied here; the value keeps the
    /// class of the source route until the target is resolved.
    pub fn to_omme(
        &self,
        opioid: Opioid,
        route: Route,
        dose: f64,
    ) -> ConversionResult<MorphineEquivalent> {
        if opioid.is_reference() && route == Route::Oral {
            return Ok(MorphineEquivalent::oral(dose));
        }

        let factor = self
            .table
            .factor(opioid, route)
            .ok_or(ConversionError::UnsupportedCombination { opioid, route })?;

        Ok(MorphineEquivalent {
            milligrams: dose * factor,
            class: route.class(),
        })
    }
}
