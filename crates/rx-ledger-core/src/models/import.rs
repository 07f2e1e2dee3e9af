//! Import input and history models.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An uploaded export file: raw bytes plus the filename it arrived under.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSource {
    bytes: Vec<u8>,
    filename: String,
}

impl ImportSource {
    pub fn new(bytes: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Declared extension, lowercased (e.g. "csv", "xlsx").
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// Hex SHA-256 of the file contents.
    pub fn sha256(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }
}

/// A completed import, kept as history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportSession {
    pub id: String,
    pub filename: String,
    pub source_sha256: String,
    pub format: String,
    pub family_member_id: String,
    pub total_rows: u32,
    pub created: u32,
    pub duplicates: u32,
    pub warnings: u32,
    pub errors: u32,
    pub started_at: String,
    pub completed_at: String,
}
