//! Conversion request and outcome models.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{DoseUnit, Opioid, Route, RouteClass};

/// Oral to parenteral morphine ratio chosen by the clinician.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OralParenteralRatio {
    /// 2 mg oral ≈ 1 mg parenteral
    #[default]
    #[serde(rename = "2")]
    TwoToOne,
    /// 3 mg oral ≈ 1 mg parenteral
    #[serde(rename = "3")]
    ThreeToOne,
}

impl OralParenteralRatio {
    pub fn value(&self) -> f64 {
        match self {
            OralParenteralRatio::TwoToOne => 2.0,
            OralParenteralRatio::ThreeToOne => 3.0,
        }
    }

    /// Accepts exactly 2 or 3.
    pub fn from_value(value: f64) -> Option<Self> {
        if value == 2.0 {
            Some(OralParenteralRatio::TwoToOne)
        } else if value == 3.0 {
            Some(OralParenteralRatio::ThreeToOne)
        } else {
            None
        }
    }
}

/// A single point conversion request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub source_opioid: Opioid,
    pub source_route: Route,
    pub target_opioid: Opioid,
    pub target_route: Route,
    /// Current dose: mg/day, or mcg/h for a patch
    pub dose: f64,
    pub ratio: OralParenteralRatio,
}

impl ConversionRequest {
    pub fn new(
        source: (Opioid, Route),
        target: (Opioid, Route),
        dose: f64,
        ratio: OralParenteralRatio,
    ) -> Self {
        Self {
            source_opioid: source.0,
            source_route: source.1,
            target_opioid: target.0,
            target_route: target.1,
            dose,
            ratio,
        }
    }

    /// Source and target name the same substance on the same route.
    pub fn is_identity(&self) -> bool {
        self.source_opioid == self.target_opioid && self.source_route == self.target_route
    }
}

/// Morphine milligrams expressed in one route class.
///
/// This is the pivot every conversion passes through. The oral/parenteral
/// ratio is only applied when the value moves to the other class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MorphineEquivalent {
    pub milligrams: f64,
    pub class: RouteClass,
}

impl MorphineEquivalent {
    pub fn oral(milligrams: f64) -> Self {
        Self {
            milligrams,
            class: RouteClass::Oral,
        }
    }

    pub fn parenteral(milligrams: f64) -> Self {
        Self {
            milligrams,
            class: RouteClass::Parenteral,
        }
    }

    /// Morphine mg in `class`, applying the ratio once if the class changes.
    pub fn in_class(&self, class: RouteClass, ratio: OralParenteralRatio) -> f64 {
        match (self.class, class) {
            (RouteClass::Oral, RouteClass::Parenteral) => self.milligrams / ratio.value(),
            (RouteClass::Parenteral, RouteClass::Oral) => self.milligrams * ratio.value(),
            _ => self.milligrams,
        }
    }

    /// Oral morphine milligram equivalent (OMME).
    pub fn oral_mg(&self, ratio: OralParenteralRatio) -> f64 {
        self.in_class(RouteClass::Oral, ratio)
    }
}

/// Transdermal patch strength.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct PatchStrength {
    pub mcg_per_hour: f64,
}

impl fmt::Display for PatchStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mcg/h", format_amount(self.mcg_per_hour))
    }
}

/// The converted dose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetDose {
    /// A numeric dose on a non-patch route
    Dose { amount: f64, unit: DoseUnit },
    /// A banded patch strength
    Patch(PatchStrength),
}

impl TargetDose {
    pub fn mg(amount: f64) -> Self {
        TargetDose::Dose {
            amount,
            unit: DoseUnit::Mg,
        }
    }

    pub fn amount(&self) -> f64 {
        match self {
            TargetDose::Dose { amount, .. } => *amount,
            TargetDose::Patch(strength) => strength.mcg_per_hour,
        }
    }

    pub fn unit(&self) -> DoseUnit {
        match self {
            TargetDose::Dose { unit, .. } => *unit,
            TargetDose::Patch(_) => DoseUnit::McgPerHour,
        }
    }

    pub fn patch(&self) -> Option<PatchStrength> {
        match self {
            TargetDose::Patch(strength) => Some(*strength),
            TargetDose::Dose { .. } => None,
        }
    }

    /// Display label, e.g. "12.5 mg" or "50 mcg/h".
    pub fn label(&self) -> String {
        match self {
            TargetDose::Dose { amount, unit } => format!("{} {}", format_amount(*amount), unit),
            TargetDose::Patch(strength) => strength.to_string(),
        }
    }
}

/// Which rule produced the target dose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum AppliedRule {
    /// Same substance and route on both sides
    Identity,
    /// Linear potency factors through the morphine pivot
    Equianalgesic,
    /// Least-upper-bound patch band
    PatchBand { omme_upper_bound: f64 },
    /// Methadone dose-dependent ratio
    MethadoneBand { ratio: f64 },
    /// Fixed methadone to morphine multiplier
    MethadoneReverse { ratio: f64 },
}

impl fmt::Display for AppliedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppliedRule::Identity => f.write_str("identity"),
            AppliedRule::Equianalgesic => f.write_str("equianalgesic"),
            AppliedRule::PatchBand { omme_upper_bound } => {
                write!(f, "patch band (≤ {} mg OMME)", format_amount(*omme_upper_bound))
            }
            AppliedRule::MethadoneBand { ratio } => {
                write!(f, "methadone {}:1", format_amount(*ratio))
            }
            AppliedRule::MethadoneReverse { ratio } => {
                write!(f, "methadone to morphine 1:{}", format_amount(*ratio))
            }
        }
    }
}

/// A successful conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub target: TargetDose,
    /// Oral morphine milligram equivalent the target was derived from
    pub omme_mg: f64,
    pub rule: AppliedRule,
}

/// Format a dose with at most two decimals and no trailing zeros.
pub fn format_amount(value: f64) -> String {
    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_from_value() {
        assert_eq!(
            OralParenteralRatio::from_value(2.0),
            Some(OralParenteralRatio::TwoToOne)
        );
        assert_eq!(
            OralParenteralRatio::from_value(3.0),
            Some(OralParenteralRatio::ThreeToOne)
        );
        assert_eq!(OralParenteralRatio::from_value(2.5), None);
        assert_eq!(OralParenteralRatio::from_value(0.0), None);
    }

    #[test]
    fn test_equivalent_same_class_ignores_ratio() {
        let eq = MorphineEquivalent::parenteral(10.0);
        assert_eq!(eq.in_class(RouteClass::Parenteral, OralParenteralRatio::ThreeToOne), 10.0);

        let eq = MorphineEquivalent::oral(60.0);
        assert_eq!(eq.oral_mg(OralParenteralRatio::ThreeToOne), 60.0);
    }

    #[test]
    fn test_equivalent_class_change_applies_ratio_once() {
        let eq = MorphineEquivalent::parenteral(10.0);
        assert_eq!(eq.oral_mg(OralParenteralRatio::ThreeToOne), 30.0);

        let eq = MorphineEquivalent::oral(60.0);
        assert_eq!(eq.in_class(RouteClass::Parenteral, OralParenteralRatio::TwoToOne), 30.0);
    }

    #[test]
    fn test_labels() {
        assert_eq!(TargetDose::mg(12.5).label(), "12.5 mg");
        assert_eq!(TargetDose::mg(40.0).label(), "40 mg");
        assert_eq!(TargetDose::mg(13.333333).label(), "13.33 mg");
        assert_eq!(
            TargetDose::Patch(PatchStrength { mcg_per_hour: 52.5 }).label(),
            "52.5 mcg/h"
        );
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(60.0), "60");
        assert_eq!(format_amount(0.1), "0.1");
        assert_eq!(format_amount(0.001), "0");
        assert_eq!(format_amount(100.0), "100");
    }

    #[test]
    fn test_identity_request() {
        let req = ConversionRequest::new(
            (Opioid::Morphine, Route::Oral),
            (Opioid::Morphine, Route::Oral),
            60.0,
            OralParenteralRatio::TwoToOne,
        );
        assert!(req.is_identity());

        let req = ConversionRequest::new(
            (Opioid::Morphine, Route::Oral),
            (Opioid::Morphine, Route::Iv),
            60.0,
            OralParenteralRatio::TwoToOne,
        );
        assert!(!req.is_identity());
    }
}
