//! Import configuration.

use serde::{Deserialize, Serialize};

/// Default number of leading rows searched for patient labels.
pub const DEFAULT_HEADER_LOOKAHEAD: usize = 20;

/// Default Jaro-Winkler similarity at which an existing family member is
/// reported as a possible match for a newly created one.
pub const DEFAULT_SIMILAR_MEMBER_THRESHOLD: f64 = 0.92;

/// Tunables for one import. The core never reads these from the environment;
/// callers construct or deserialize them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImportConfig {
    /// Rows scanned for patient label rows before giving up
    pub header_lookahead: usize,
    /// `chrono` formats tried in order for fill dates and dates of birth
    pub date_formats: Vec<String>,
    /// Name similarity for flagging possible duplicate family members
    pub similar_member_threshold: f64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            header_lookahead: DEFAULT_HEADER_LOOKAHEAD,
            // Two-digit years first: "%Y" would read "24" as year 24.
            date_formats: vec![
                "%m/%d/%y".into(),
                "%m/%d/%Y".into(),
                "%Y-%m-%d".into(),
                "%m-%d-%Y".into(),
            ],
            similar_member_threshold: DEFAULT_SIMILAR_MEMBER_THRESHOLD,
        }
    }
}
