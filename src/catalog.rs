//! # Slice Catalog
//!
//! Flattens every coverage-bearing variable of a dataset into a single
//! contiguous index space of 2-D planes and groups those planes into named
//! coverage types.
//!
//! The trailing two dimensions of a variable form its spatial plane; every
//! leading dimension contributes to the slice's "extra" coordinate tuple.
//! Combinations are enumerated with the outermost dimension varying slowest
//! and handed global indices that increase monotonically across the whole
//! catalog, so variables with different extra shapes still partition one
//! contiguous `[0, N)` range. Variables are visited in declaration order,
//! which makes the index→tuple mapping reproducible across reopenings.

use log::debug;
use serde::Serialize;

use crate::ancillary::AncillarySpec;
use crate::axis::AxisSet;
use crate::error::{SliceError, SliceResult};
use crate::store::{ArrayStore, SampleKind, VariableInfo};

/// Name given to coverage types with no single distinguishing dimension.
pub const DEFAULT_TYPE_NAME: &str = "default";

/// One entry of a slice's extra-dimension coordinate tuple.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceCoordinate {
    /// Extra dimension this entry fixes.
    pub dimension: String,
    /// Position along that dimension.
    pub position: usize,
    /// Decoded axis value at that position; falls back to the position
    /// itself when the dimension has no readable coordinate axis.
    pub value: f64,
}

/// Address of one 2-D plane inside the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceDescriptor {
    /// Global index, unique and contiguous across the whole catalog.
    pub index: usize,
    /// Owning coverage type.
    pub coverage: String,
    /// Source variable the plane is cut from.
    pub variable: String,
    /// Ordered coordinate tuple, outermost dimension first. Empty for a
    /// plain 2-D variable.
    pub coordinates: Vec<SliceCoordinate>,
}

impl SliceDescriptor {
    /// The extra-dimension offsets in storage order, as the array store
    /// expects them.
    pub fn offsets(&self) -> Vec<usize> {
        self.coordinates.iter().map(|c| c.position).collect()
    }
}

/// A named grouping of slices sharing non-spatial dimensionality.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageType {
    pub name: String,
    /// Extra dimensions of the first contributing variable, outermost first.
    pub extra_dimensions: Vec<String>,
    /// Spatial plane shape shared by the type's slices.
    pub width: usize,
    pub height: usize,
    pub kind: SampleKind,
    /// Global indices of the slices belonging to this type, in build order.
    slice_indices: Vec<usize>,
}

impl CoverageType {
    pub fn num_slices(&self) -> usize {
        self.slice_indices.len()
    }
}

/// The cached slice index of one dataset. Built once at open time.
#[derive(Debug, Clone, Default)]
pub struct SliceCatalog {
    slices: Vec<SliceDescriptor>,
    types: Vec<CoverageType>,
}

impl SliceCatalog {
    /// Builds the catalog from classified axes, honoring an optional
    /// ancillary spec (variable accept-list, coverage-type renames).
    pub fn build(
        store: &dyn ArrayStore,
        axes: &AxisSet,
        ancillary: Option<&AncillarySpec>,
    ) -> SliceResult<SliceCatalog> {
        let bearers: Vec<&VariableInfo> = store
            .variables()
            .iter()
            .filter(|v| is_coverage_bearing(store, axes, ancillary, v))
            .collect();

        // Extra-dimension sets of every bearer, needed by the naming rule.
        let extra_sets: Vec<Vec<&str>> = bearers
            .iter()
            .map(|v| {
                v.dimensions[..v.rank() - 2]
                    .iter()
                    .map(String::as_str)
                    .collect()
            })
            .collect();

        let mut catalog = SliceCatalog::default();
        for (pos, var) in bearers.iter().enumerate() {
            let name = derive_type_name(pos, &extra_sets, ancillary);
            catalog.append_variable(axes, var, name)?;
        }

        debug!(
            "catalog built: {} slices across {} coverage types",
            catalog.slices.len(),
            catalog.types.len()
        );
        Ok(catalog)
    }

    /// Total number of slices; indices run `0..len()`.
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// The descriptor at a global index.
    pub fn slice(&self, index: usize) -> SliceResult<&SliceDescriptor> {
        self.slices.get(index).ok_or(SliceError::IndexOutOfRange {
            index,
            count: self.slices.len(),
        })
    }

    /// Distinct coverage-type names in first-seen order. Stable across
    /// repeated calls; the catalog is never rebuilt behind the caller's
    /// back.
    pub fn type_names(&self) -> Vec<String> {
        self.types.iter().map(|t| t.name.clone()).collect()
    }

    /// Ordered descriptors of one coverage type; empty for an unknown name.
    pub fn slices_for_type(&self, name: &str) -> Vec<&SliceDescriptor> {
        self.types
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.slice_indices.iter().map(|&i| &self.slices[i]).collect())
            .unwrap_or_default()
    }

    pub fn coverage_types(&self) -> &[CoverageType] {
        &self.types
    }

    pub fn coverage_type(&self, name: &str) -> Option<&CoverageType> {
        self.types.iter().find(|t| t.name == name)
    }

    fn append_variable(
        &mut self,
        axes: &AxisSet,
        var: &VariableInfo,
        type_name: String,
    ) -> SliceResult<()> {
        let rank = var.rank();
        let extras = &var.dimensions[..rank - 2];
        let extra_lens = &var.shape[..rank - 2];
        let (height, width) = (var.shape[rank - 2], var.shape[rank - 1]);

        // Axis values per extra dimension, read once up front.
        let mut axis_values: Vec<Option<&[f64]>> = Vec::with_capacity(extras.len());
        for dim in extras {
            axis_values.push(
                axes.axis_for_dimension(dim)
                    .filter(|a| !a.values.is_empty())
                    .map(|a| a.values.as_slice()),
            );
        }

        let kind = var.kind.ok_or_else(|| SliceError::DimensionMismatch {
            variable: var.name.clone(),
            reason: "element type has no supported sample kind".to_string(),
        })?;
        let type_pos = self.ensure_type(type_name, kind, extras, width, height);

        // Odometer walk over the extra positions, outermost slowest.
        let total: usize = extra_lens.iter().product();
        let mut odometer = vec![0usize; extras.len()];
        for _ in 0..total {
            let index = self.slices.len();
            let coordinates = odometer
                .iter()
                .enumerate()
                .map(|(i, &pos)| SliceCoordinate {
                    dimension: extras[i].clone(),
                    position: pos,
                    value: axis_values[i]
                        .and_then(|vals| vals.get(pos).copied())
                        .unwrap_or(pos as f64),
                })
                .collect();
            self.slices.push(SliceDescriptor {
                index,
                coverage: self.types[type_pos].name.clone(),
                variable: var.name.clone(),
                coordinates,
            });
            self.types[type_pos].slice_indices.push(index);

            for i in (0..odometer.len()).rev() {
                odometer[i] += 1;
                if odometer[i] < extra_lens[i] {
                    break;
                }
                odometer[i] = 0;
            }
        }
        Ok(())
    }

    fn ensure_type(
        &mut self,
        name: String,
        kind: SampleKind,
        extras: &[String],
        width: usize,
        height: usize,
    ) -> usize {
        if let Some(pos) = self.types.iter().position(|t| t.name == name) {
            return pos;
        }
        self.types.push(CoverageType {
            name,
            extra_dimensions: extras.to_vec(),
            width,
            height,
            kind,
            slice_indices: Vec::new(),
        });
        self.types.len() - 1
    }
}

/// A variable carries coverage when it has a 2-D plane to offer, a decodable
/// element type, plays no axis role (true axis or decoy), does not shadow a
/// dimension name, and passes the ancillary accept-list.
fn is_coverage_bearing(
    store: &dyn ArrayStore,
    axes: &AxisSet,
    ancillary: Option<&AncillarySpec>,
    var: &VariableInfo,
) -> bool {
    if var.rank() < 2 || var.rank() > crate::store::MAX_RANK {
        return false;
    }
    if var.kind.is_none() {
        return false;
    }
    if axes.is_candidate(&var.name) {
        return false;
    }
    // A 2-D localization grid named after a dimension is an axis in
    // disguise, not a coverage.
    if store.dimension(&var.name).is_some() {
        return false;
    }
    if let Some(spec) = ancillary {
        if !spec.accepts(&var.name) {
            return false;
        }
    }
    true
}

/// Applies the type-naming rule for the bearer at `pos`: the sole extra
/// dimension's name when no other bearer shares it, the literal `"default"`
/// otherwise. Ancillary renames apply on top.
fn derive_type_name(
    pos: usize,
    extra_sets: &[Vec<&str>],
    ancillary: Option<&AncillarySpec>,
) -> String {
    let extras = &extra_sets[pos];
    let mut name = DEFAULT_TYPE_NAME.to_string();
    if let [sole] = extras.as_slice() {
        let shared = extra_sets
            .iter()
            .enumerate()
            .any(|(other, set)| other != pos && set.contains(sole));
        if !shared {
            name = sole.to_string();
        }
    }
    if let Some(spec) = ancillary {
        if let Some(renamed) = spec.renamed(&name) {
            return renamed.to_string();
        }
    }
    name
}

/// Convenience over [`SliceCatalog::build`] matching the classifier's
/// free-function shape.
pub fn build(store: &dyn ArrayStore, axes: &AxisSet) -> SliceResult<SliceCatalog> {
    SliceCatalog::build(store, axes, None)
}
