//! Case catalog loading and validation.
//!
//! The catalog is a JSON array of module entries:
//!
//! ```json
//! [
//!     {"module": "base", "cases": ["LocalStreamTest#testCreate"]},
//!     {"module": "p2p", "cases": ["ConnectTest#testConnect"]}
//! ]
//! ```
//!
//! Entries are immutable once loaded. A missing or malformed catalog is a
//! fatal error surfaced before any device interaction.

use crate::types::DroidtestError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One module and the ordered list of test identifiers to run for it.
///
/// Case identifiers are `ClassName#methodName` pairs, relative to the
/// module's target package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Module name (e.g. "base", "conference", "p2p").
    pub module: String,
    /// Ordered test case identifiers. Empty in bulk mode.
    #[serde(default)]
    pub cases: Vec<String>,
}

/// Loads the case catalog from `path`.
///
/// Fails with [`DroidtestError::Catalog`] if the file does not exist or does
/// not parse as the expected JSON shape. No side effects.
pub fn load(path: &Path) -> Result<Vec<CatalogEntry>, DroidtestError> {
    if !path.is_file() {
        return Err(DroidtestError::Catalog(format!(
            "no case list file found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        DroidtestError::Catalog(format!("failed to read {}: {}", path.display(), e))
    })?;

    let entries: Vec<CatalogEntry> = serde_json::from_str(&contents).map_err(|e| {
        DroidtestError::Catalog(format!("failed to load json from {}: {}", path.display(), e))
    })?;

    Ok(entries)
}
