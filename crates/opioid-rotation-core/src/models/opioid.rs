//! Opioid substances and administration routes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opioid analgesic known to the conversion table.
///
/// Identifiers are the Spanish names used by the clinical front end
/// (`morfina`, `fentanilo`, ...). English names are used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Opioid {
    #[serde(rename = "morfina")]
    Morphine,
    #[serde(rename = "fentanilo")]
    Fentanyl,
    #[serde(rename = "buprenorfina")]
    Buprenorphine,
    #[serde(rename = "hidromorfona")]
    Hydromorphone,
    #[serde(rename = "oxicodona")]
    Oxycodone,
    #[serde(rename = "hidrocodona")]
    Hydrocodone,
    #[serde(rename = "tapentadol")]
    Tapentadol,
    #[serde(rename = "tramadol")]
    Tramadol,
    #[serde(rename = "metadona")]
    Methadone,
    #[serde(rename = "codeina")]
    Codeine,
}

impl Opioid {
    /// Every opioid, in picker order.
    pub const ALL: [Opioid; 10] = [
        Opioid::Fentanyl,
        Opioid::Buprenorphine,
        Opioid::Hydromorphone,
        Opioid::Oxycodone,
        Opioid::Morphine,
        Opioid::Hydrocodone,
        Opioid::Tapentadol,
        Opioid::Tramadol,
        Opioid::Methadone,
        Opioid::Codeine,
    ];

    /// The substance every dose is expressed against (OMME).
    pub const REFERENCE: Opioid = Opioid::Morphine;

    /// Stable identifier (matches the serialized form).
    pub fn id(&self) -> &'static str {
        match self {
            Opioid::Morphine => "morfina",
            Opioid::Fentanyl => "fentanilo",
            Opioid::Buprenorphine => "buprenorfina",
            Opioid::Hydromorphone => "hidromorfona",
            Opioid::Oxycodone => "oxicodona",
            Opioid::Hydrocodone => "hidrocodona",
            Opioid::Tapentadol => "tapentadol",
            Opioid::Tramadol => "tramadol",
            Opioid::Methadone => "metadona",
            Opioid::Codeine => "codeina",
        }
    }

    /// English generic name.
    pub fn english_name(&self) -> &'static str {
        match self {
            Opioid::Morphine => "morphine",
            Opioid::Fentanyl => "fentanyl",
            Opioid::Buprenorphine => "buprenorphine",
            Opioid::Hydromorphone => "hydromorphone",
            Opioid::Oxycodone => "oxycodone",
            Opioid::Hydrocodone => "hydrocodone",
            Opioid::Tapentadol => "tapentadol",
            Opioid::Tramadol => "tramadol",
            Opioid::Methadone => "methadone",
            Opioid::Codeine => "codeine",
        }
    }

    pub fn is_reference(&self) -> bool {
        *self == Self::REFERENCE
    }
}

impl fmt::Display for Opioid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Administration route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Oral,
    Iv,
    Sc,
    Intrathecal,
    Patch,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::Oral,
        Route::Iv,
        Route::Sc,
        Route::Intrathecal,
        Route::Patch,
    ];

    /// Stable identifier (matches the serialized form).
    pub fn id(&self) -> &'static str {
        match self {
            Route::Oral => "oral",
            Route::Iv => "iv",
            Route::Sc => "sc",
            Route::Intrathecal => "intrathecal",
            Route::Patch => "patch",
        }
    }

    /// Which morphine reference a factor for this route is expressed against.
    ///
    /// Patch factors convert mcg/h straight to oral morphine mg/day, so
    /// patches share the oral class.
    pub fn class(&self) -> RouteClass {
        match self {
            Route::Oral | Route::Patch => RouteClass::Oral,
            Route::Iv | Route::Sc | Route::Intrathecal => RouteClass::Parenteral,
        }
    }

    /// Unit a dose on this route is expressed in.
    pub fn dose_unit(&self) -> DoseUnit {
        match self {
            Route::Patch => DoseUnit::McgPerHour,
            _ => DoseUnit::Mg,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Morphine reference class of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteClass {
    /// Referenced against oral morphine.
    Oral,
    /// Referenced against parenteral (IV) morphine.
    Parenteral,
}

/// Dose unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoseUnit {
    #[serde(rename = "mg")]
    Mg,
    #[serde(rename = "mcg/h")]
    McgPerHour,
}

impl DoseUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            DoseUnit::Mg => "mg",
            DoseUnit::McgPerHour => "mcg/h",
        }
    }
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
