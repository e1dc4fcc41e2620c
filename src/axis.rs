//! # Axis Classification
//!
//! Labels candidate coordinate variables by role and filters out decoys.
//!
//! A variable is a coordinate-variable candidate when it is one-dimensional
//! and shares its name or declared dimension with a dataset dimension. Roles
//! are assigned by a prioritized rule chain over the candidate's attributes
//! (units, standard_name, axis, positive) — an ordered list of
//! predicate/role pairs evaluated first-match-wins, so new conventions bolt
//! on without disturbing existing ones.
//!
//! When several candidates reference the same dimension, the one whose name
//! equals the dimension's name exactly is the true axis; every other
//! name-similar candidate is marked [`AxisRole::Excluded`] and becomes
//! invisible to lookup. A candidate whose role cannot be resolved degrades
//! to [`AxisRole::Auxiliary`] — classification of the dataset as a whole
//! never fails on a single stubborn axis.

use std::collections::HashMap;

use log::{debug, warn};
use serde::Serialize;

use crate::error::SliceResult;
use crate::store::{ArrayStore, VariableInfo};
use crate::time::{self, CfTimeBase};

/// Role a coordinate variable plays in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AxisRole {
    /// Spatial easting / longitude.
    X,
    /// Spatial northing / latitude.
    Y,
    /// Vertical (height, depth, pressure).
    Z,
    /// Temporal.
    T,
    /// A real coordinate whose role could not be resolved.
    Auxiliary,
    /// A decoy: shares a dimension with the true axis but is not it.
    Excluded,
}

impl AxisRole {
    pub const fn name(&self) -> &'static str {
        match self {
            AxisRole::X => "x",
            AxisRole::Y => "y",
            AxisRole::Z => "z",
            AxisRole::T => "t",
            AxisRole::Auxiliary => "auxiliary",
            AxisRole::Excluded => "excluded",
        }
    }

    pub const fn is_spatial(&self) -> bool {
        matches!(self, AxisRole::X | AxisRole::Y)
    }
}

/// A classified coordinate axis. Immutable once classification finishes.
#[derive(Debug, Clone)]
pub struct CoordinateAxis {
    /// Variable name (equals the dimension name for a true CF axis).
    pub name: String,
    /// The dimension this axis indexes.
    pub dimension: String,
    pub role: AxisRole,
    /// Ordered coordinate values, widened to `f64`. Empty when the values
    /// could not be read (the axis then carries `Auxiliary`).
    pub values: Vec<f64>,
    pub units: Option<String>,
    /// The `positive` direction attribute of vertical conventions.
    pub positive: Option<String>,
    /// Parsed CF epoch for temporal axes.
    pub time_base: Option<CfTimeBase>,
}

impl CoordinateAxis {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// rule chain
// ---------------------------------------------------------------------------

/// One link of the classification chain.
struct AxisRule {
    name: &'static str,
    role: AxisRole,
    matches: fn(&VariableInfo) -> bool,
}

/// Ordered rule chain, first match wins. Temporal detection runs first so a
/// vertical-looking unit string with an epoch ("days since ...") cannot be
/// shadowed by a later rule.
const RULE_CHAIN: &[AxisRule] = &[
    AxisRule {
        name: "cf-time",
        role: AxisRole::T,
        matches: matches_time,
    },
    AxisRule {
        name: "latitude",
        role: AxisRole::Y,
        matches: matches_latitude,
    },
    AxisRule {
        name: "longitude",
        role: AxisRole::X,
        matches: matches_longitude,
    },
    AxisRule {
        name: "projection-y",
        role: AxisRole::Y,
        matches: matches_projection_y,
    },
    AxisRule {
        name: "projection-x",
        role: AxisRole::X,
        matches: matches_projection_x,
    },
    AxisRule {
        name: "vertical",
        role: AxisRole::Z,
        matches: matches_vertical,
    },
    AxisRule {
        name: "named-latitude",
        role: AxisRole::Y,
        matches: |v| matches_name(v, &["lat", "latitude"]),
    },
    AxisRule {
        name: "named-longitude",
        role: AxisRole::X,
        matches: |v| matches_name(v, &["lon", "longitude"]),
    },
    AxisRule {
        name: "named-vertical",
        role: AxisRole::Z,
        matches: |v| matches_name(v, &["level", "lev", "depth", "height", "z"]),
    },
    AxisRule {
        name: "named-time",
        role: AxisRole::T,
        matches: |v| matches_name(v, &["time", "t"]),
    },
];

const LAT_UNITS: &[&str] = &[
    "degrees_north",
    "degree_north",
    "degrees_n",
    "degree_n",
    "degreesn",
    "degreen",
];

const LON_UNITS: &[&str] = &[
    "degrees_east",
    "degree_east",
    "degrees_e",
    "degree_e",
    "degreese",
    "degreee",
];

const PRESSURE_UNITS: &[&str] = &["pa", "hpa", "kpa", "mbar", "mb", "millibar", "bar"];

const VERTICAL_STANDARD_NAMES: &[&str] = &[
    "air_pressure",
    "height",
    "depth",
    "altitude",
    "geopotential_height",
    "model_level_number",
];

fn attr_lower(var: &VariableInfo, name: &str) -> Option<String> {
    var.attribute(name).map(|s| s.trim().to_ascii_lowercase())
}

fn matches_time(var: &VariableInfo) -> bool {
    if let Some(units) = var.attribute("units") {
        if time::is_time_units(units) {
            return true;
        }
    }
    attr_lower(var, "standard_name").as_deref() == Some("time")
        || attr_lower(var, "axis").as_deref() == Some("t")
}

fn matches_latitude(var: &VariableInfo) -> bool {
    if let Some(units) = attr_lower(var, "units") {
        if LAT_UNITS.contains(&units.as_str()) {
            return true;
        }
    }
    attr_lower(var, "standard_name").as_deref() == Some("latitude")
        || attr_lower(var, "axis").as_deref() == Some("y")
}

fn matches_longitude(var: &VariableInfo) -> bool {
    if let Some(units) = attr_lower(var, "units") {
        if LON_UNITS.contains(&units.as_str()) {
            return true;
        }
    }
    attr_lower(var, "standard_name").as_deref() == Some("longitude")
        || attr_lower(var, "axis").as_deref() == Some("x")
}

fn matches_projection_x(var: &VariableInfo) -> bool {
    attr_lower(var, "standard_name").as_deref() == Some("projection_x_coordinate")
}

fn matches_projection_y(var: &VariableInfo) -> bool {
    attr_lower(var, "standard_name").as_deref() == Some("projection_y_coordinate")
}

fn matches_vertical(var: &VariableInfo) -> bool {
    if var.attribute("positive").is_some() {
        return true;
    }
    if let Some(units) = attr_lower(var, "units") {
        if PRESSURE_UNITS.contains(&units.as_str()) {
            return true;
        }
    }
    if let Some(sn) = attr_lower(var, "standard_name") {
        return VERTICAL_STANDARD_NAMES.contains(&sn.as_str());
    }
    false
}

fn matches_name(var: &VariableInfo, names: &[&str]) -> bool {
    names.contains(&var.name.to_ascii_lowercase().as_str())
}

/// Runs the rule chain over one candidate. `Auxiliary` when nothing matches.
fn resolve_role(var: &VariableInfo) -> AxisRole {
    for rule in RULE_CHAIN {
        if (rule.matches)(var) {
            debug!("axis '{}' matched rule '{}'", var.name, rule.name);
            return rule.role;
        }
    }
    AxisRole::Auxiliary
}

// ---------------------------------------------------------------------------
// classification
// ---------------------------------------------------------------------------

/// The classified axes of one dataset.
#[derive(Debug, Clone, Default)]
pub struct AxisSet {
    axes: Vec<CoordinateAxis>,
}

impl AxisSet {
    /// Classifies every coordinate-variable candidate of the dataset.
    ///
    /// Never fails on a single axis: unreadable values or an unresolvable
    /// role degrade that axis to `Auxiliary` and classification continues.
    pub fn classify(store: &dyn ArrayStore) -> SliceResult<AxisSet> {
        let mut axes = Vec::new();

        for dim in store.dimensions() {
            let candidates: Vec<&VariableInfo> = store
                .variables()
                .iter()
                .filter(|v| v.rank() == 1 && v.dimensions[0] == dim.name)
                .collect();
            if candidates.is_empty() {
                continue;
            }

            // Exact-name match wins the dimension; with no exact match the
            // first declared candidate does. Everyone else is a decoy.
            let winner = candidates
                .iter()
                .position(|v| v.name == dim.name)
                .unwrap_or(0);

            for (pos, &var) in candidates.iter().enumerate() {
                if pos == winner {
                    axes.push(build_axis(store, var, &dim.name));
                } else {
                    debug!(
                        "excluding decoy '{}' (dimension '{}' already has an axis)",
                        var.name, dim.name
                    );
                    axes.push(CoordinateAxis {
                        name: var.name.clone(),
                        dimension: dim.name.clone(),
                        role: AxisRole::Excluded,
                        values: Vec::new(),
                        units: var.attribute("units").map(str::to_string),
                        positive: None,
                        time_base: None,
                    });
                }
            }
        }

        Ok(AxisSet { axes })
    }

    /// Looks up an axis by name. Excluded decoys are not found.
    pub fn axis(&self, name: &str) -> Option<&CoordinateAxis> {
        self.axes
            .iter()
            .find(|a| a.name == name && a.role != AxisRole::Excluded)
    }

    /// The true (non-excluded) axis indexing a dimension, if any.
    pub fn axis_for_dimension(&self, dimension: &str) -> Option<&CoordinateAxis> {
        self.axes
            .iter()
            .find(|a| a.dimension == dimension && a.role != AxisRole::Excluded)
    }

    pub fn role_of(&self, name: &str) -> Option<AxisRole> {
        self.axis(name).map(|a| a.role)
    }

    /// Every classified entry, decoys included, as a name→role map.
    pub fn roles(&self) -> HashMap<String, AxisRole> {
        self.axes
            .iter()
            .map(|a| (a.name.clone(), a.role))
            .collect()
    }

    /// Iterates all entries, decoys included.
    pub fn iter(&self) -> impl Iterator<Item = &CoordinateAxis> {
        self.axes.iter()
    }

    /// Whether a variable took part in classification at all (as a true
    /// axis or a decoy). The catalog skips these when hunting for
    /// coverage-bearing variables.
    pub fn is_candidate(&self, name: &str) -> bool {
        self.axes.iter().any(|a| a.name == name)
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }
}

fn build_axis(store: &dyn ArrayStore, var: &VariableInfo, dimension: &str) -> CoordinateAxis {
    let mut role = resolve_role(var);

    let values = match store.read_coordinates(&var.name) {
        Ok(values) => values,
        Err(err) => {
            // Local recovery: the axis degrades, the dataset survives.
            warn!("could not read values for axis '{}': {err}", var.name);
            role = AxisRole::Auxiliary;
            Vec::new()
        }
    };

    let units = var.attribute("units").map(str::to_string);
    let time_base = if role == AxisRole::T {
        match units.as_deref().and_then(time::parse_cf_units) {
            Some(base) => Some(base),
            None => {
                warn!(
                    "time axis '{}' has no parseable epoch in units {:?}",
                    var.name, units
                );
                None
            }
        }
    } else {
        None
    };

    CoordinateAxis {
        name: var.name.clone(),
        dimension: dimension.to_string(),
        role,
        values,
        units,
        positive: var.attribute("positive").map(str::to_string),
        time_base,
    }
}
