//! Free-text input normalizer.
//!
//! Handles:
//! - Opioid names (Spanish, English, common brand names)
//! - Route names and abbreviations (vo→oral, ev→iv, parche→patch)
//! - "Did you mean" suggestions for misspelled opioid names

use std::collections::HashMap;

use strsim::jaro_winkler;

use crate::models::{Opioid, OralParenteralRatio, Route};

use super::{ConversionError, ConversionResult};

/// Minimum similarity for a spelling suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.85;

/// Normalizer for opioid, route and ratio inputs.
pub struct Normalizer {
    /// Spoken/written name → opioid
    aliases: HashMap<String, Opioid>,
    /// Route spelling → route
    route_map: HashMap<String, Route>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// Create a new normalizer with default mappings.
    pub fn new() -> Self {
        Self {
            aliases: Self::default_aliases(),
            route_map: Self::default_routes(),
        }
    }

    /// Parse an opioid name.
    pub fn parse_opioid(&self, name: &str) -> ConversionResult<Opioid> {
        let lower = name.trim().to_lowercase();
        self.aliases
            .get(&lower)
            .copied()
            .ok_or_else(|| ConversionError::UnknownOpioid {
                name: name.to_string(),
                suggestion: self.suggest_opioid(&lower).map(|o| o.id().to_string()),
            })
    }

    /// Parse a route name.
    pub fn parse_route(&self, name: &str) -> ConversionResult<Route> {
        let lower = name.trim().to_lowercase();
        self.route_map
            .get(&lower)
            .copied()
            .ok_or_else(|| ConversionError::UnknownRoute {
                name: name.to_string(),
                suggestion: self.suggest_route(&lower).map(|r| r.id().to_string()),
            })
    }

    /// Parse the oral/parenteral ratio (2 or 3).
    pub fn parse_ratio(&self, value: f64) -> ConversionResult<OralParenteralRatio> {
        OralParenteralRatio::from_value(value).ok_or(ConversionError::InvalidRatio(value))
    }

    /// Closest known opioid to a misspelled name.
    pub fn suggest_opioid(&self, name: &str) -> Option<Opioid> {
        best_match(&self.aliases, name)
    }

    /// Closest known route to a misspelled name.
    pub fn suggest_route(&self, name: &str) -> Option<Route> {
        best_match(&self.route_map, name)
    }

    /// Add a custom alias mapping.
    pub fn add_alias(&mut self, alias: &str, opioid: Opioid) {
        self.aliases.insert(alias.to_lowercase(), opioid);
    }

    /// Add a custom route mapping.
    pub fn add_route(&mut self, spelling: &str, route: Route) {
        self.route_map.insert(spelling.to_lowercase(), route);
    }

    /// Default opioid name mappings.
    fn default_aliases() -> HashMap<String, Opioid> {
        let mut map = HashMap::new();

        for opioid in Opioid::ALL {
            map.insert(opioid.id().to_string(), opioid);
            map.insert(opioid.english_name().to_string(), opioid);
        }

        // Accented spellings
        map.insert("codeína".into(), Opioid::Codeine);
        map.insert("hidromorfóna".into(), Opioid::Hydromorphone);

        // Morphine
        map.insert("ms contin".into(), Opioid::Morphine);
        map.insert("mst".into(), Opioid::Morphine);
        map.insert("sevredol".into(), Opioid::Morphine);
        map.insert("oramorph".into(), Opioid::Morphine);

        // Fentanyl
        map.insert("duragesic".into(), Opioid::Fentanyl);
        map.insert("durogesic".into(), Opioid::Fentanyl);
        map.insert("fentanest".into(), Opioid::Fentanyl);

        // Buprenorphine
        map.insert("transtec".into(), Opioid::Buprenorphine);
        map.insert("butrans".into(), Opioid::Buprenorphine);
        map.insert("norspan".into(), Opioid::Buprenorphine);

        // Hydromorphone
        map.insert("dilaudid".into(), Opioid::Hydromorphone);
        map.insert("jurnista".into(), Opioid::Hydromorphone);
        map.insert("palladone".into(), Opioid::Hydromorphone);

        // Oxycodone
        map.insert("oxycontin".into(), Opioid::Oxycodone);
        map.insert("oxynorm".into(), Opioid::Oxycodone);
        map.insert("roxicodone".into(), Opioid::Oxycodone);

        // Hydrocodone
        map.insert("zohydro".into(), Opioid::Hydrocodone);
        map.insert("hysingla".into(), Opioid::Hydrocodone);

        // Tapentadol
        map.insert("palexia".into(), Opioid::Tapentadol);
        map.insert("nucynta".into(), Opioid::Tapentadol);

        // Tramadol
        map.insert("tramal".into(), Opioid::Tramadol);
        map.insert("ultram".into(), Opioid::Tramadol);
        map.insert("adolonta".into(), Opioid::Tramadol);

        // Methadone
        map.insert("dolophine".into(), Opioid::Methadone);
        map.insert("methadose".into(), Opioid::Methadone);
        map.insert("sinergina".into(), Opioid::Methadone);

        map
    }

    /// Default route mappings.
    fn default_routes() -> HashMap<String, Route> {
        let mut map = HashMap::new();

        for route in Route::ALL {
            map.insert(route.id().to_string(), route);
        }

        // Oral
        map.insert("po".into(), Route::Oral);
        map.insert("vo".into(), Route::Oral);
        map.insert("orally".into(), Route::Oral);
        map.insert("by mouth".into(), Route::Oral);
        map.insert("per os".into(), Route::Oral);

        // Intravenous
        map.insert("intravenous".into(), Route::Iv);
        map.insert("intravenously".into(), Route::Iv);
        map.insert("intravenosa".into(), Route::Iv);
        map.insert("endovenosa".into(), Route::Iv);
        map.insert("ev".into(), Route::Iv);
        map.insert("i.v.".into(), Route::Iv);

        // Subcutaneous
        map.insert("subcutaneous".into(), Route::Sc);
        map.insert("subcutaneously".into(), Route::Sc);
        map.insert("subcutánea".into(), Route::Sc);
        map.insert("subcutanea".into(), Route::Sc);
        map.insert("sq".into(), Route::Sc);
        map.insert("subq".into(), Route::Sc);
        map.insert("sub-q".into(), Route::Sc);

        // Intrathecal
        map.insert("intratecal".into(), Route::Intrathecal);
        map.insert("it".into(), Route::Intrathecal);
        map.insert("spinal".into(), Route::Intrathecal);

        // Transdermal
        map.insert("parche".into(), Route::Patch);
        map.insert("transdermal".into(), Route::Patch);
        map.insert("transdérmica".into(), Route::Patch);
        map.insert("transdermica".into(), Route::Patch);
        map.insert("td".into(), Route::Patch);

        map
    }
}

fn best_match<T: Copy>(map: &HashMap<String, T>, name: &str) -> Option<T> {
    map.iter()
        .map(|(key, value)| (jaro_winkler(name, key), key, *value))
        .filter(|(score, _, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.1.cmp(a.1))
        })
        .map(|(_, _, value)| value)
}
