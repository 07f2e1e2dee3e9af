//! Medication string parser.
//!
//! Splits a free-text drug description ("ATORVASTATIN 20MG TAB") into
//! name, strength and form with independent passes, each returning the
//! matched token and the residual text:
//!
//! 1. [`MedicationParser::extract_strength`]: right-most number + known unit
//! 2. [`MedicationParser::extract_form`]: trailing dosage-form word
//! 3. the remainder is the name

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Medication parse errors (row-level, never fatal to an import).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MedicationParseError {
    #[error("empty drug name")]
    Empty,

    #[error("no medication name left in {0:?}")]
    MissingName(String),
}

/// Name/strength/form decomposition of a drug description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ParsedMedication {
    /// Title-cased, whitespace-collapsed name
    pub name: String,
    /// Canonical strength (e.g., "10mg"); empty when absent
    pub strength: String,
    /// Canonical form (e.g., "Tablet"); empty when absent
    pub form: String,
    /// Partial-parse warnings
    pub warnings: Vec<String>,
}

/// Release modifiers and salts that stay upper-case in names.
const UPPERCASE_WORDS: &[&str] = &["ER", "XR", "SR", "DR", "XL", "CR", "ODT", "HCT", "HFA", "EC"];

fn strength_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?P<amount>\d*\.?\d+(?:-\d*\.?\d+)*)(?P<unit>[a-zA-Z]+)(?:/(?P<per>\d*\.?\d+)?(?P<per_unit>[a-zA-Z]+))?$",
        )
        .expect("strength pattern is valid")
    })
}

fn is_amount(token: &str) -> bool {
    !token.is_empty()
        && token.chars().any(|c| c.is_ascii_digit())
        && token.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-')
}

/// Parser for free-text drug descriptions.
pub struct MedicationParser {
    /// Unit spelling → canonical unit
    units: HashMap<String, String>,
    /// Form word or abbreviation → canonical form
    forms: HashMap<String, String>,
}

impl Default for MedicationParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MedicationParser {
    /// Create a parser with the default unit and form vocabularies.
    pub fn new() -> Self {
        Self {
            units: Self::default_units(),
            forms: Self::default_forms(),
        }
    }

    /// Parse a drug description.
    pub fn parse(&self, description: &str) -> Result<ParsedMedication, MedicationParseError> {
        let text = description.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            return Err(MedicationParseError::Empty);
        }

        let mut warnings = Vec::new();

        let (strength, rest) = match self.extract_strength(&text) {
            Some(found) => found,
            None => {
                warnings.push(format!("no strength found in {:?}", text));
                (String::new(), text.clone())
            }
        };

        let (form, rest) = self
            .extract_form(&rest)
            .unwrap_or_else(|| (String::new(), rest));

        let name = format_name(&rest);
        if name.is_empty() {
            return Err(MedicationParseError::MissingName(text));
        }

        Ok(ParsedMedication {
            name,
            strength,
            form,
            warnings,
        })
    }

    /// Find the right-most dosage token; returns (canonical strength, residual).
    ///
    /// Accepts "10mg", "10 mg", "5mg/5ml", "875-125mg".
    pub fn extract_strength(&self, text: &str) -> Option<(String, String)> {
        let tokens: Vec<&str> = text.split_whitespace().collect();

        for i in (0..tokens.len()).rev() {
            if let Some(strength) = self.canonical_strength(tokens[i]) {
                return Some((strength, join_except(&tokens, i, i)));
            }
            if i > 0 && is_amount(tokens[i - 1]) {
                let joined = format!("{}{}", tokens[i - 1], tokens[i]);
                if let Some(strength) = self.canonical_strength(&joined) {
                    return Some((strength, join_except(&tokens, i - 1, i)));
                }
            }
        }
        None
    }

    /// Take a trailing dosage-form word; returns (canonical form, residual).
    pub fn extract_form(&self, text: &str) -> Option<(String, String)> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let last = *tokens.last()?;
        let form = self.forms.get(&last.trim_end_matches('.').to_lowercase())?;
        Some((form.clone(), tokens[..tokens.len() - 1].join(" ")))
    }

    fn canonical_strength(&self, token: &str) -> Option<String> {
        let caps = strength_pattern().captures(token)?;
        let amount = caps.name("amount")?.as_str();
        let unit = self.units.get(&caps.name("unit")?.as_str().to_lowercase())?;

        let mut strength = format!("{}{}", amount, unit);
        if let Some(per_unit) = caps.name("per_unit") {
            let per_unit = self.units.get(&per_unit.as_str().to_lowercase())?;
            strength.push('/');
            if let Some(per) = caps.name("per") {
                strength.push_str(per.as_str());
            }
            strength.push_str(per_unit);
        }
        Some(strength)
    }

    /// Add a custom unit spelling.
    pub fn add_unit(&mut self, spelling: &str, canonical: &str) {
        self.units.insert(spelling.to_lowercase(), canonical.to_string());
    }

    /// Add a custom form word or abbreviation.
    pub fn add_form(&mut self, word: &str, canonical: &str) {
        self.forms.insert(word.to_lowercase(), canonical.to_string());
    }

    /// Default unit spellings.
    fn default_units() -> HashMap<String, String> {
        let mut map = HashMap::new();

        // Mass
        map.insert("mg".into(), "mg".into());
        map.insert("mcg".into(), "mcg".into());
        map.insert("ug".into(), "mcg".into());
        map.insert("g".into(), "g".into());
        map.insert("gm".into(), "g".into());

        // Volume
        map.insert("ml".into(), "mL".into());
        map.insert("cc".into(), "mL".into());

        // Units
        map.insert("iu".into(), "IU".into());

        map
    }

    /// Default dosage forms, including pharmacy label abbreviations.
    fn default_forms() -> HashMap<String, String> {
        let mut map = HashMap::new();

        // Solid oral
        for word in ["tablet", "tablets", "tab", "tabs", "tb"] {
            map.insert(word.into(), "Tablet".into());
        }
        for word in ["capsule", "capsules", "cap", "caps", "cp"] {
            map.insert(word.into(), "Capsule".into());
        }
        for word in ["lozenge", "lozenges", "loz"] {
            map.insert(word.into(), "Lozenge".into());
        }
        map.insert("powder".into(), "Powder".into());
        map.insert("pwd".into(), "Powder".into());

        // Liquids
        for word in ["solution", "soln", "sol"] {
            map.insert(word.into(), "Solution".into());
        }
        for word in ["suspension", "susp", "sus"] {
            map.insert(word.into(), "Suspension".into());
        }
        map.insert("syrup".into(), "Syrup".into());
        map.insert("syr".into(), "Syrup".into());
        for word in ["drops", "drop", "drp"] {
            map.insert(word.into(), "Drops".into());
        }

        // Topical
        map.insert("cream".into(), "Cream".into());
        map.insert("crm".into(), "Cream".into());
        map.insert("cre".into(), "Cream".into());
        map.insert("ointment".into(), "Ointment".into());
        map.insert("oint".into(), "Ointment".into());
        map.insert("gel".into(), "Gel".into());
        map.insert("lotion".into(), "Lotion".into());
        map.insert("lot".into(), "Lotion".into());
        map.insert("patch".into(), "Patch".into());
        map.insert("patches".into(), "Patch".into());
        map.insert("pat".into(), "Patch".into());

        // Parenteral / other routes
        for word in ["injection", "inj", "injectable"] {
            map.insert(word.into(), "Injection".into());
        }
        for word in ["inhaler", "inh", "aer"] {
            map.insert(word.into(), "Inhaler".into());
        }
        map.insert("spray".into(), "Spray".into());
        map.insert("spr".into(), "Spray".into());
        for word in ["suppository", "suppositories", "supp", "sup"] {
            map.insert(word.into(), "Suppository".into());
        }

        map
    }
}

fn join_except(tokens: &[&str], from: usize, to: usize) -> String {
    tokens
        .iter()
        .enumerate()
        .filter(|(i, _)| *i < from || *i > to)
        .map(|(_, t)| *t)
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_name(text: &str) -> String {
    super::title_case(text)
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let upper = word.to_uppercase();
            if UPPERCASE_WORDS.contains(&upper.as_str()) {
                upper
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
