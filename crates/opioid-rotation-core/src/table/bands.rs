//! Non-linear band tables: transdermal patch strengths and methadone ratios.

use serde::{Deserialize, Serialize};

/// One patch strength and the highest OMME it covers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatchBand {
    /// Highest oral morphine mg/day this strength covers (inclusive)
    pub omme_upper_bound: f64,
    /// Patch strength in mcg/h
    pub strength_mcg_per_hour: f64,
}

impl PatchBand {
    pub const fn new(omme_upper_bound: f64, strength_mcg_per_hour: f64) -> Self {
        Self {
            omme_upper_bound,
            strength_mcg_per_hour,
        }
    }
}

/// Select the least-upper-bound band for `omme`.
///
/// Bands must be ascending. Returns `None` when `omme` exceeds the top band.
pub fn select_patch_band(bands: &[PatchBand], omme: f64) -> Option<&PatchBand> {
    bands.iter().find(|band| omme <= band.omme_upper_bound)
}

/// One methadone ratio band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MethadoneBand {
    /// Highest OMME in this band (inclusive); `None` for the open top band
    pub omme_upper_bound: Option<f64>,
    /// Morphine:methadone ratio; 0 marks the band as not convertible
    pub ratio: f64,
}

impl MethadoneBand {
    pub const fn new(omme_upper_bound: Option<f64>, ratio: f64) -> Self {
        Self {
            omme_upper_bound,
            ratio,
        }
    }

    fn contains_upper(&self, omme: f64) -> bool {
        self.omme_upper_bound.map_or(true, |upper| omme <= upper)
    }
}

/// Dose-dependent methadone conversion schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethadoneSchedule {
    /// OMME below which a rotation to methadone is not computed
    pub minimum_omme: f64,
    /// Ascending bands starting at `minimum_omme`
    pub bands: Vec<MethadoneBand>,
    /// Fixed multiplier for methadone to morphine
    pub reverse_ratio: f64,
}

impl MethadoneSchedule {
    /// The band containing `omme`, or `None` below the minimum or above a
    /// closed top band.
    pub fn select(&self, omme: f64) -> Option<&MethadoneBand> {
        if omme < self.minimum_omme {
            return None;
        }
        self.bands.iter().find(|band| band.contains_upper(omme))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fentanyl_like() -> Vec<PatchBand> {
        vec![
            PatchBand::new(90.0, 25.0),
            PatchBand::new(160.0, 50.0),
            PatchBand::new(200.0, 75.0),
        ]
    }

    fn schedule() -> MethadoneSchedule {
        MethadoneSchedule {
            minimum_omme: 30.0,
            bands: vec![
                MethadoneBand::new(Some(90.0), 4.0),
                MethadoneBand::new(Some(300.0), 8.0),
                MethadoneBand::new(None, 12.0),
            ],
            reverse_ratio: 5.0,
        }
    }

    #[test]
    fn test_patch_band_least_upper_bound() {
        let bands = fentanyl_like();

        assert_eq!(select_patch_band(&bands, 10.0).unwrap().strength_mcg_per_hour, 25.0);
        assert_eq!(select_patch_band(&bands, 90.0).unwrap().strength_mcg_per_hour, 25.0);
        assert_eq!(select_patch_band(&bands, 90.5).unwrap().strength_mcg_per_hour, 50.0);
        assert_eq!(select_patch_band(&bands, 200.0).unwrap().strength_mcg_per_hour, 75.0);
    }

    #[test]
    fn test_patch_band_above_top_is_none() {
        let bands = fentanyl_like();
        assert!(select_patch_band(&bands, 200.1).is_none());
        assert!(select_patch_band(&[], 1.0).is_none());
    }

    #[test]
    fn test_methadone_band_edges() {
        let schedule = schedule();

        assert!(schedule.select(29.9).is_none());
        assert_eq!(schedule.select(30.0).unwrap().ratio, 4.0);
        assert_eq!(schedule.select(90.0).unwrap().ratio, 4.0);
        assert_eq!(schedule.select(90.1).unwrap().ratio, 8.0);
        assert_eq!(schedule.select(300.0).unwrap().ratio, 8.0);
        assert_eq!(schedule.select(300.1).unwrap().ratio, 12.0);
        assert_eq!(schedule.select(5000.0).unwrap().ratio, 12.0);
    }

    #[test]
    fn test_methadone_closed_top_band() {
        let schedule = MethadoneSchedule {
            minimum_omme: 30.0,
            bands: vec![MethadoneBand::new(Some(90.0), 4.0)],
            reverse_ratio: 5.0,
        };
        assert!(schedule.select(91.0).is_none());
    }
}
