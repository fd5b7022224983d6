//! Built-in potency table.
//!
//! Oral and patch factors follow the CDC 2022 MME conversion factors, except
//! methadone, which uses the same 5:1 ratio as the fixed methadone to morphine
//! rule, and the buprenorphine patch, which has no CDC factor. Parenteral
//! factors are against parenteral morphine. Patch bands are the fentanyl and
//! buprenorphine tables of the clinical calculator this crate replaces.

use crate::models::Opioid;

use super::{MethadoneBand, MethadoneSchedule, OpioidProfile, PatchBand, RouteFactors, TableDocument};

/// Fentanyl patch strengths by OMME upper bound.
pub const FENTANYL_PATCH_BANDS: [PatchBand; 8] = [
    PatchBand::new(90.0, 25.0),
    PatchBand::new(160.0, 50.0),
    PatchBand::new(200.0, 75.0),
    PatchBand::new(275.0, 100.0),
    PatchBand::new(325.0, 125.0),
    PatchBand::new(400.0, 150.0),
    PatchBand::new(450.0, 175.0),
    PatchBand::new(525.0, 200.0),
];

/// Buprenorphine patch strengths by OMME upper bound.
pub const BUPRENORPHINE_PATCH_BANDS: [PatchBand; 5] = [
    PatchBand::new(30.0, 10.0),
    PatchBand::new(60.0, 20.0),
    PatchBand::new(90.0, 35.0),
    PatchBand::new(120.0, 52.5),
    PatchBand::new(180.0, 70.0),
];

/// OMME mg/day per mcg/h of fentanyl patch.
pub const FENTANYL_PATCH_FACTOR: f64 = 2.4;

/// OMME mg/day per mcg/h of buprenorphine patch.
///
/// Must map every band strength back into its own band, which holds for
/// factors in (12/7, 16/7].
pub const BUPRENORPHINE_PATCH_FACTOR: f64 = 2.0;

/// Below this OMME a rotation to methadone is not computed.
pub const METHADONE_MINIMUM_OMME: f64 = 30.0;

/// Methadone to morphine multiplier.
pub const METHADONE_REVERSE_RATIO: f64 = 5.0;

/// Morphine:methadone ratios, 30-90 mg / 90-300 mg / above 300 mg OMME.
pub const METHADONE_BANDS: [MethadoneBand; 3] = [
    MethadoneBand::new(Some(90.0), 4.0),
    MethadoneBand::new(Some(300.0), 8.0),
    MethadoneBand::new(None, 12.0),
];

fn factors(
    oral: Option<f64>,
    iv: Option<f64>,
    sc: Option<f64>,
    intrathecal: Option<f64>,
    patch: Option<f64>,
) -> RouteFactors {
    RouteFactors {
        oral,
        iv,
        sc,
        intrathecal,
        patch,
    }
}

fn profile(opioid: Opioid, factors: RouteFactors) -> OpioidProfile {
    OpioidProfile {
        opioid,
        factors,
        patch_bands: Vec::new(),
    }
}

/// The built-in table as a document.
pub fn standard_document() -> TableDocument {
    let oral_only = |factor: f64| RouteFactors {
        oral: Some(factor),
        ..RouteFactors::UNSUPPORTED
    };

    let opioids = vec![
        OpioidProfile {
            opioid: Opioid::Fentanyl,
            factors: factors(None, Some(100.0), None, None, Some(FENTANYL_PATCH_FACTOR)),
            patch_bands: FENTANYL_PATCH_BANDS.to_vec(),
        },
        OpioidProfile {
            opioid: Opioid::Buprenorphine,
            factors: factors(None, None, None, None, Some(BUPRENORPHINE_PATCH_FACTOR)),
            patch_bands: BUPRENORPHINE_PATCH_BANDS.to_vec(),
        },
        profile(
            Opioid::Hydromorphone,
            factors(Some(5.0), Some(5.0), Some(5.0), None, None),
        ),
        profile(
            Opioid::Oxycodone,
            factors(Some(1.5), Some(1.5), Some(1.5), None, None),
        ),
        profile(
            Opioid::Morphine,
            factors(Some(1.0), Some(1.0), Some(1.0), Some(100.0), None),
        ),
        profile(Opioid::Hydrocodone, oral_only(1.0)),
        profile(Opioid::Tapentadol, oral_only(0.4)),
        profile(
            Opioid::Tramadol,
            factors(Some(0.2), Some(0.1), None, None, None),
        ),
        profile(Opioid::Methadone, oral_only(METHADONE_REVERSE_RATIO)),
        profile(Opioid::Codeine, oral_only(0.15)),
    ];

    TableDocument {
        opioids,
        methadone: MethadoneSchedule {
            minimum_omme: METHADONE_MINIMUM_OMME,
            bands: METHADONE_BANDS.to_vec(),
            reverse_ratio: METHADONE_REVERSE_RATIO,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_opioid_listed_once() {
        let document = standard_document();
        assert_eq!(document.opioids.len(), Opioid::ALL.len());
        for opioid in Opioid::ALL {
            assert_eq!(
                document.opioids.iter().filter(|p| p.opioid == opioid).count(),
                1,
                "{} should appear exactly once",
                opioid
            );
        }
    }

    #[test]
    fn test_weaker_than_morphine_below_one() {
        let document = standard_document();
        for weak in [Opioid::Tramadol, Opioid::Tapentadol, Opioid::Codeine] {
            let profile = document.opioids.iter().find(|p| p.opioid == weak).unwrap();
            assert!(profile.factors.oral.unwrap() < 1.0, "{} oral factor", weak);
        }
    }

    #[test]
    fn test_methadone_ratio_steps() {
        let ratios: Vec<f64> = METHADONE_BANDS.iter().map(|b| b.ratio).collect();
        assert_eq!(ratios, vec![4.0, 8.0, 12.0]);
    }
}
