//! # Ancillary Metadata
//!
//! The optional side-channel metadata file that enriches or overrides
//! per-slice metadata. It can restrict which variables bear coverage,
//! rename coverage types, and override CRS or no-data per variable.
//!
//! The file is JSON or YAML, chosen by extension:
//!
//! ```json
//! {
//!   "accept": ["sst", "anomaly"],
//!   "rename": { "default": "sea_surface_temperature" },
//!   "overrides": {
//!     "sst": { "crs": "EPSG:4326", "nodata": -999.0 }
//!   }
//! }
//! ```
//!
//! The reader accepts the path once, before the first read; supplying it
//! later is a contract violation surfaced as
//! [`SliceError::AncillaryConflict`](crate::error::SliceError::AncillaryConflict).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SliceError, SliceResult};

/// Per-variable metadata overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableOverride {
    /// Authority code or WKT replacing the inferred CRS.
    #[serde(default)]
    pub crs: Option<String>,
    /// No-data marker replacing the variable's declared fill value.
    #[serde(default)]
    pub nodata: Option<f64>,
}

/// Parsed ancillary metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AncillarySpec {
    /// Variables allowed to bear coverage. `None` accepts everything.
    #[serde(default)]
    pub accept: Option<Vec<String>>,
    /// Coverage-type renames, applied after name derivation.
    #[serde(default)]
    pub rename: HashMap<String, String>,
    /// Per-variable overrides, keyed by variable name.
    #[serde(default)]
    pub overrides: HashMap<String, VariableOverride>,
}

impl AncillarySpec {
    /// Loads a spec from a JSON (`.json`) or YAML (`.yml`/`.yaml`) file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SliceResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let spec = match extension.as_str() {
            "yml" | "yaml" => Self::from_yaml(&content)?,
            _ => Self::from_json(&content)?,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn from_json(content: &str) -> SliceResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| SliceError::Ancillary(format!("JSON parse failure: {e}")))
    }

    pub fn from_yaml(content: &str) -> SliceResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| SliceError::Ancillary(format!("YAML parse failure: {e}")))
    }

    /// Whether a variable passes the accept-list.
    pub fn accepts(&self, variable: &str) -> bool {
        match &self.accept {
            Some(list) => list.iter().any(|v| v == variable),
            None => true,
        }
    }

    /// The rename target of a coverage-type name, if one is configured.
    pub fn renamed(&self, name: &str) -> Option<&str> {
        self.rename.get(name).map(String::as_str)
    }

    pub fn override_for(&self, variable: &str) -> Option<&VariableOverride> {
        self.overrides.get(variable)
    }

    fn validate(&self) -> SliceResult<()> {
        if let Some(list) = &self.accept {
            if list.iter().any(|v| v.trim().is_empty()) {
                return Err(SliceError::Ancillary(
                    "accept-list entries must be non-empty".to_string(),
                ));
            }
        }
        for (from, to) in &self.rename {
            if from.trim().is_empty() || to.trim().is_empty() {
                return Err(SliceError::Ancillary(format!(
                    "rename '{from}' -> '{to}' has an empty side"
                )));
            }
        }
        Ok(())
    }
}
