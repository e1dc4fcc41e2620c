//! # Georeferencing
//!
//! Builds the grid-to-world mapping attached to every raster slice. When
//! both spatial axes are regularly spaced the mapping is a compact affine
//! transform (cell-center anchored); otherwise it degrades to explicit
//! per-pixel coordinate arrays. Latitude axes stored south-to-north flip to
//! a negative y-scale anchored at the northernmost row so consumers always
//! see a north-up transform.
//!
//! CRS objects are memoized through [`CrsRegistry`], an explicitly
//! constructed cache the caller owns and may share between readers. There is
//! no process-wide singleton.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;
use serde::Serialize;

use crate::axis::{AxisRole, CoordinateAxis};

/// Relative tolerance for declaring an axis regularly spaced.
const REGULAR_SPACING_TOLERANCE: f64 = 1e-6;

/// Cell-center anchored affine grid-to-world transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl GeoTransform {
    pub const IDENTITY: GeoTransform = GeoTransform {
        origin_x: 0.0,
        origin_y: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
    };

    /// World coordinates of the center of pixel `(col, row)`.
    pub fn apply(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + self.scale_x * col as f64,
            self.origin_y + self.scale_y * row as f64,
        )
    }
}

/// Pixel-to-world mapping of a slice.
#[derive(Debug, Clone, PartialEq)]
pub enum GridMapping {
    Affine(GeoTransform),
    /// Explicit per-pixel coordinates, row-major, `width * height` entries
    /// each. Used when either spatial axis is irregular.
    Curvilinear {
        width: usize,
        height: usize,
        xs: Vec<f64>,
        ys: Vec<f64>,
    },
}

impl GridMapping {
    pub fn is_affine(&self) -> bool {
        matches!(self, GridMapping::Affine(_))
    }
}

/// Coarse CRS classification; transformation math is out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CrsKind {
    Geographic,
    Projected,
    Unknown,
}

/// A coordinate reference system identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crs {
    pub code: String,
    pub kind: CrsKind,
}

/// Geographic CRS codes the registry recognizes without help.
const GEOGRAPHIC_CODES: &[&str] = &["EPSG:4326", "EPSG:4258", "EPSG:4269", "CRS:84"];

/// Memoizing cache of [`Crs`] objects.
///
/// Construct one and pass it to every reader that should share it; the
/// registry is internally synchronized.
#[derive(Debug, Default)]
pub struct CrsRegistry {
    cache: Mutex<HashMap<String, Arc<Crs>>>,
}

impl CrsRegistry {
    pub fn new() -> Self {
        CrsRegistry::default()
    }

    /// Returns the memoized CRS for a code, creating it on first request.
    pub fn resolve(&self, code: &str) -> Arc<Crs> {
        let mut cache = self.cache.lock().expect("CRS registry poisoned");
        if let Some(crs) = cache.get(code) {
            return Arc::clone(crs);
        }
        let kind = if GEOGRAPHIC_CODES.contains(&code) {
            CrsKind::Geographic
        } else if code.starts_with("EPSG:") {
            CrsKind::Projected
        } else {
            CrsKind::Unknown
        };
        let crs = Arc::new(Crs {
            code: code.to_string(),
            kind,
        });
        cache.insert(code.to_string(), Arc::clone(&crs));
        crs
    }

    /// Number of distinct codes resolved so far.
    pub fn len(&self) -> usize {
        self.cache.lock().expect("CRS registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// CRS plus grid-to-world mapping attached to a raster slice.
#[derive(Debug, Clone)]
pub struct Georeference {
    /// `None` when the spatial axes could not be resolved; the slice is
    /// then addressed in bare pixel space.
    pub crs: Option<Arc<Crs>>,
    pub mapping: GridMapping,
}

impl Georeference {
    /// Pixel-space placeholder for datasets with unresolved spatial axes.
    pub fn pixel_space() -> Self {
        Georeference {
            crs: None,
            mapping: GridMapping::Affine(GeoTransform::IDENTITY),
        }
    }
}

/// Builds the georeference for a variable from its classified spatial axes.
///
/// `crs_override` short-circuits inference (ancillary metadata uses it).
pub fn build_georeference(
    x_axis: Option<&CoordinateAxis>,
    y_axis: Option<&CoordinateAxis>,
    registry: &CrsRegistry,
    crs_override: Option<&str>,
) -> Georeference {
    let (Some(x), Some(y)) = (x_axis, y_axis) else {
        debug!("spatial axes unresolved, georeference degrades to pixel space");
        return Georeference::pixel_space();
    };
    if x.values.is_empty() || y.values.is_empty() {
        return Georeference::pixel_space();
    }

    let crs = match crs_override {
        Some(code) => Some(registry.resolve(code)),
        None => infer_crs(x, y).map(|code| registry.resolve(code)),
    };

    let mapping = match (regular_increment(&x.values), regular_increment(&y.values)) {
        (Some(x_inc), Some(y_inc)) => GridMapping::Affine(affine_from_axes(x, x_inc, y, y_inc)),
        _ => curvilinear_from_axes(x, y),
    };

    Georeference { crs, mapping }
}

/// The common increment of a regularly spaced axis, `None` when spacing
/// wobbles beyond tolerance. Single-value axes count as regular with a unit
/// step.
fn regular_increment(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return Some(1.0);
    }
    let increment = values[1] - values[0];
    if increment == 0.0 {
        return None;
    }
    let tolerance = REGULAR_SPACING_TOLERANCE * increment.abs().max(1.0);
    for pair in values.windows(2) {
        if ((pair[1] - pair[0]) - increment).abs() > tolerance {
            return None;
        }
    }
    Some(increment)
}

fn affine_from_axes(
    x: &CoordinateAxis,
    x_inc: f64,
    y: &CoordinateAxis,
    y_inc: f64,
) -> GeoTransform {
    // A y-axis stored south-to-north flips: negative scale, anchored at the
    // northern edge, so row 0 is always the top of the image.
    let (origin_y, scale_y) = if y_inc > 0.0 {
        (y.values[y.values.len() - 1], -y_inc)
    } else {
        (y.values[0], y_inc)
    };
    GeoTransform {
        origin_x: x.values[0],
        origin_y,
        scale_x: x_inc,
        scale_y,
    }
}

fn curvilinear_from_axes(x: &CoordinateAxis, y: &CoordinateAxis) -> GridMapping {
    let width = x.values.len();
    let height = y.values.len();
    let mut xs = Vec::with_capacity(width * height);
    let mut ys = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            xs.push(x.values[col]);
            ys.push(y.values[row]);
        }
    }
    GridMapping::Curvilinear {
        width,
        height,
        xs,
        ys,
    }
}

/// Lat/lon unit spellings mean the classic geographic CRS; projected axes
/// stay unresolved (the dataset's grid mapping would be needed to pin an
/// authority code, and CRS math is not this crate's business).
fn infer_crs(x: &CoordinateAxis, y: &CoordinateAxis) -> Option<&'static str> {
    let degrees = |axis: &CoordinateAxis| {
        axis.units
            .as_deref()
            .map(|u| u.to_ascii_lowercase().starts_with("degree"))
            .unwrap_or(false)
    };
    if x.role == AxisRole::X && y.role == AxisRole::Y && degrees(x) && degrees(y) {
        Some("EPSG:4326")
    } else {
        None
    }
}
