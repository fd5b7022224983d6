//! Morphine equivalent to target dose.
//!
//! Dispatch order, first match wins:
//! 1. patch target: least-upper-bound patch band
//! 2. methadone target: dose-dependent methadone ratio
//! 3. methadone to morphine: fixed reverse ratio
//! 4. anything else: linear factor, ratio applied once on a class change

use tracing::debug;

use crate::models::{
    AppliedRule, ConversionOutcome, ConversionRequest, MorphineEquivalent, Opioid,
    OralParenteralRatio, PatchStrength, Route, TargetDose,
};
use crate::table::{select_patch_band, ConversionTable};

use super::{ConversionError, ConversionResult};

/// Resolves the morphine pivot into the requested opioid and route.
pub struct TargetResolver<'a> {
    table: &'a ConversionTable,
}

impl<'a> TargetResolver<'a> {
    pub fn new(table: &'a ConversionTable) -> Self {
        Self { table }
    }

    /// Resolve `equivalent` (computed from the request's source) to the target.
    ///
    /// The methadone reverse ratio applies to any methadone source route and
    /// stays within that route's class; the oral/parenteral ratio is only
    /// applied if the target morphine route is in the other class.
    pub fn from_omme(
        &self,
        request: &ConversionRequest,
        equivalent: MorphineEquivalent,
    ) -> ConversionResult<ConversionOutcome> {
        let omme = equivalent.oral_mg(request.ratio);

        if request.target_route == Route::Patch {
            return self.to_patch(request.target_opioid, omme);
        }

        if request.target_opioid == Opioid::Methadone {
            return self.to_methadone(equivalent, request.target_route, request.ratio);
        }

        if request.source_opioid == Opioid::Methadone && request.target_opioid.is_reference() {
            return self.from_methadone(request);
        }

        let amount =
            self.equianalgesic(equivalent, request.target_opioid, request.target_route, request.ratio)?;
        debug!(omme, amount, "equianalgesic conversion");
        Ok(ConversionOutcome {
            target: TargetDose::Dose {
                amount,
                unit: request.target_route.dose_unit(),
            },
            omme_mg: omme,
            rule: AppliedRule::Equianalgesic,
        })
    }

    fn to_patch(&self, opioid: Opioid, omme: f64) -> ConversionResult<ConversionOutcome> {
        let bands = self
            .table
            .patch_bands(opioid)
            .ok_or(ConversionError::UnsupportedCombination {
                opioid,
                route: Route::Patch,
            })?;

        let band = select_patch_band(bands, omme).ok_or_else(|| ConversionError::OutOfRange {
            omme,
            max_omme: bands.last().map_or(0.0, |b| b.omme_upper_bound),
        })?;

        debug!(
            %opioid,
            omme,
            strength = band.strength_mcg_per_hour,
            "patch band selected"
        );
        Ok(ConversionOutcome {
            target: TargetDose::Patch(PatchStrength {
                mcg_per_hour: band.strength_mcg_per_hour,
            }),
            omme_mg: omme,
            rule: AppliedRule::PatchBand {
                omme_upper_bound: band.omme_upper_bound,
            },
        })
    }

    fn to_methadone(
        &self,
        equivalent: MorphineEquivalent,
        route: Route,
        ratio: OralParenteralRatio,
    ) -> ConversionResult<ConversionOutcome> {
        let schedule = self.table.methadone_schedule();
        let omme = equivalent.oral_mg(ratio);

        if omme < schedule.minimum_omme {
            return Err(ConversionError::BelowMethadoneMinimum {
                omme,
                minimum: schedule.minimum_omme,
            });
        }

        let band = schedule
            .select(omme)
            .ok_or_else(|| ConversionError::OutOfRange {
                omme,
                max_omme: schedule
                    .bands
                    .last()
                    .and_then(|b| b.omme_upper_bound)
                    .unwrap_or(f64::INFINITY),
            })?;

        if band.ratio <= 0.0 {
            return Err(ConversionError::BelowMethadoneMinimum {
                omme,
                minimum: schedule.minimum_omme,
            });
        }

        let amount = equivalent.in_class(route.class(), ratio) / band.ratio;
        debug!(omme, ratio = band.ratio, amount, "methadone band selected");
        Ok(ConversionOutcome {
            target: TargetDose::mg(amount),
            omme_mg: omme,
            rule: AppliedRule::MethadoneBand { ratio: band.ratio },
        })
    }

    fn from_methadone(&self, request: &ConversionRequest) -> ConversionResult<ConversionOutcome> {
        let reverse_ratio = self.table.methadone_schedule().reverse_ratio;
        let morphine = MorphineEquivalent {
            milligrams: request.dose * reverse_ratio,
            class: request.source_route.class(),
        };
        let omme = morphine.oral_mg(request.ratio);
        let amount = self.equianalgesic(
            morphine,
            request.target_opioid,
            request.target_route,
            request.ratio,
        )?;

        debug!(omme, amount, "methadone reverse ratio applied");
        Ok(ConversionOutcome {
            target: TargetDose::mg(amount),
            omme_mg: omme,
            rule: AppliedRule::MethadoneReverse {
                ratio: reverse_ratio,
            },
        })
    }

    fn equianalgesic(
        &self,
        equivalent: MorphineEquivalent,
        opioid: Opioid,
        route: Route,
        ratio: OralParenteralRatio,
    ) -> ConversionResult<f64> {
        let factor = self
            .table
            .factor(opioid, route)
            .ok_or(ConversionError::UnsupportedCombination { opioid, route })?;

        Ok(equivalent.in_class(route.class(), ratio) / factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> TargetResolver<'static> {
        TargetResolver::new(ConversionTable::standard())
    }

    fn request(source: (Opioid, Route), target: (Opioid, Route), dose: f64) -> ConversionRequest {
        ConversionRequest::new(source, target, dose, OralParenteralRatio::TwoToOne)
    }

    #[test]
    fn test_patch_band_selection() {
        let req = request((Opioid::Morphine, Route::Oral), (Opioid::Fentanyl, Route::Patch), 120.0);
        let outcome = resolver().from_omme(&req, MorphineEquivalent::oral(120.0)).unwrap();

        assert_eq!(outcome.target.label(), "50 mcg/h");
        assert_eq!(
            outcome.rule,
            AppliedRule::PatchBand {
                omme_upper_bound: 160.0
            }
        );
    }

    #[test]
    fn test_patch_above_top_band() {
        let req = request((Opioid::Morphine, Route::Oral), (Opioid::Buprenorphine, Route::Patch), 200.0);
        let err = resolver().from_omme(&req, MorphineEquivalent::oral(200.0)).unwrap_err();

        assert_eq!(
            err,
            ConversionError::OutOfRange {
                omme: 200.0,
                max_omme: 180.0
            }
        );
    }

    #[test]
    fn test_patch_for_patchless_opioid() {
        let req = request((Opioid::Morphine, Route::Oral), (Opioid::Oxycodone, Route::Patch), 60.0);
        let err = resolver().from_omme(&req, MorphineEquivalent::oral(60.0)).unwrap_err();

        assert!(matches!(err, ConversionError::UnsupportedCombination { .. }));
    }

    #[test]
    fn test_parenteral_source_to_patch_applies_ratio() {
        // 30 mg IV morphine at 3:1 is 90 mg OMME
        let req = ConversionRequest::new(
            (Opioid::Morphine, Route::Iv),
            (Opioid::Fentanyl, Route::Patch),
            30.0,
            OralParenteralRatio::ThreeToOne,
        );
        let outcome = resolver()
            .from_omme(&req, MorphineEquivalent::parenteral(30.0))
            .unwrap();

        assert_eq!(outcome.omme_mg, 90.0);
        assert_eq!(outcome.target.label(), "25 mcg/h");
    }

    #[test]
    fn test_methadone_bands() {
        let cases = [(60.0, 4.0, 15.0), (200.0, 8.0, 25.0), (600.0, 12.0, 50.0)];
        for (omme, ratio, expected) in cases {
            let req = request((Opioid::Morphine, Route::Oral), (Opioid::Methadone, Route::Oral), omme);
            let outcome = resolver().from_omme(&req, MorphineEquivalent::oral(omme)).unwrap();

            assert_eq!(outcome.rule, AppliedRule::MethadoneBand { ratio });
            assert!((outcome.target.amount() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_methadone_below_minimum() {
        let req = request((Opioid::Morphine, Route::Oral), (Opioid::Methadone, Route::Oral), 20.0);
        let err = resolver().from_omme(&req, MorphineEquivalent::oral(20.0)).unwrap_err();

        assert_eq!(
            err,
            ConversionError::BelowMethadoneMinimum {
                omme: 20.0,
                minimum: 30.0
            }
        );
    }

    #[test]
    fn test_methadone_reverse_ratio() {
        let req = request((Opioid::Methadone, Route::Oral), (Opioid::Morphine, Route::Oral), 10.0);
        let outcome = resolver().from_omme(&req, MorphineEquivalent::oral(50.0)).unwrap();

        assert_eq!(outcome.target, TargetDose::mg(50.0));
        assert_eq!(outcome.rule, AppliedRule::MethadoneReverse { ratio: 5.0 });
    }

    #[test]
    fn test_methadone_reverse_to_parenteral_morphine() {
        let req = request((Opioid::Methadone, Route::Oral), (Opioid::Morphine, Route::Iv), 10.0);
        let outcome = resolver().from_omme(&req, MorphineEquivalent::oral(50.0)).unwrap();

        assert_eq!(outcome.target, TargetDose::mg(25.0));
    }

    #[test]
    fn test_methadone_reverse_from_parenteral_route() {
        let mut document = crate::table::standard_document();
        for profile in &mut document.opioids {
            if profile.opioid == Opioid::Methadone {
                profile.factors.iv = Some(5.0);
            }
        }
        let table = ConversionTable::from_document(document).unwrap();
        let resolver = TargetResolver::new(&table);

        let req = request((Opioid::Methadone, Route::Iv), (Opioid::Morphine, Route::Iv), 10.0);
        let outcome = resolver
            .from_omme(&req, MorphineEquivalent::parenteral(50.0))
            .unwrap();
        assert_eq!(outcome.target, TargetDose::mg(50.0));
        assert_eq!(outcome.rule, AppliedRule::MethadoneReverse { ratio: 5.0 });
        assert_eq!(outcome.omme_mg, 100.0);

        let req = request((Opioid::Methadone, Route::Iv), (Opioid::Morphine, Route::Oral), 10.0);
        let outcome = resolver
            .from_omme(&req, MorphineEquivalent::parenteral(50.0))
            .unwrap();
        assert_eq!(outcome.target, TargetDose::mg(100.0));
    }

    #[test]
    fn test_equianalgesic_same_class_skips_ratio() {
        let req = request((Opioid::Morphine, Route::Iv), (Opioid::Hydromorphone, Route::Iv), 10.0);
        let outcome = resolver()
            .from_omme(&req, MorphineEquivalent::parenteral(10.0))
            .unwrap();

        assert_eq!(outcome.rule, AppliedRule::Equianalgesic);
        assert!((outcome.target.amount() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_equianalgesic_class_change_applies_ratio_once() {
        let req = ConversionRequest::new(
            (Opioid::Morphine, Route::Oral),
            (Opioid::Morphine, Route::Sc),
            90.0,
            OralParenteralRatio::ThreeToOne,
        );
        let outcome = resolver().from_omme(&req, MorphineEquivalent::oral(90.0)).unwrap();

        assert!((outcome.target.amount() - 30.0).abs() < 1e-9);
    }
}
