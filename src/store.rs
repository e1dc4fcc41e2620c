//! # Array Store
//!
//! The boundary between the slice engine and the underlying multidimensional
//! array format. The engine only ever sees this module's vocabulary:
//! dimension and variable metadata, 1-D coordinate reads, and 2-D plane
//! reads returned as typed [`Slab`]s.
//!
//! Two backends are provided:
//!
//! - [`NcStore`]: the production backend over the `netcdf` crate
//! - [`MemoryStore`]: an in-memory backend for synthetic datasets, used by
//!   the test suite and useful for consumers that assemble grids on the fly

use std::collections::HashMap;
use std::path::Path;

use log::debug;

use crate::error::{SliceError, SliceResult};

/// Highest array rank the store will hand out. Seven matches the deepest
/// nesting the decoding path can address (five extra axes plus the two
/// spatial ones).
pub const MAX_RANK: usize = 7;

/// Numeric kinds a coverage-bearing variable may carry.
///
/// Unsigned storage types collapse onto the same-width kind; 64-bit
/// integers, chars, strings and compound types have no kind and exclude a
/// variable from coverage duty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SampleKind {
    Int8,
    Int16,
    Int32,
    Float32,
    Float64,
}

impl SampleKind {
    /// Short human-readable name, used by summaries and log lines.
    pub const fn name(&self) -> &'static str {
        match self {
            SampleKind::Int8 => "int8",
            SampleKind::Int16 => "int16",
            SampleKind::Int32 => "int32",
            SampleKind::Float32 => "float32",
            SampleKind::Float64 => "float64",
        }
    }

    /// Width of one sample in bytes.
    pub const fn byte_width(&self) -> usize {
        match self {
            SampleKind::Int8 => 1,
            SampleKind::Int16 => 2,
            SampleKind::Int32 | SampleKind::Float32 => 4,
            SampleKind::Float64 => 8,
        }
    }
}

/// A decoded sample buffer whose variant mirrors the source variable's
/// declared element type.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelBuffer {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl PixelBuffer {
    pub fn kind(&self) -> SampleKind {
        match self {
            PixelBuffer::Int8(_) => SampleKind::Int8,
            PixelBuffer::Int16(_) => SampleKind::Int16,
            PixelBuffer::Int32(_) => SampleKind::Int32,
            PixelBuffer::Float32(_) => SampleKind::Float32,
            PixelBuffer::Float64(_) => SampleKind::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PixelBuffer::Int8(v) => v.len(),
            PixelBuffer::Int16(v) => v.len(),
            PixelBuffer::Int32(v) => v.len(),
            PixelBuffer::Float32(v) => v.len(),
            PixelBuffer::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `idx` widened to `f64`, for statistics and display.
    pub fn value_as_f64(&self, idx: usize) -> f64 {
        match self {
            PixelBuffer::Int8(v) => v[idx] as f64,
            PixelBuffer::Int16(v) => v[idx] as f64,
            PixelBuffer::Int32(v) => v[idx] as f64,
            PixelBuffer::Float32(v) => v[idx] as f64,
            PixelBuffer::Float64(v) => v[idx],
        }
    }

    fn zeroed(kind: SampleKind, len: usize) -> Self {
        match kind {
            SampleKind::Int8 => PixelBuffer::Int8(vec![0; len]),
            SampleKind::Int16 => PixelBuffer::Int16(vec![0; len]),
            SampleKind::Int32 => PixelBuffer::Int32(vec![0; len]),
            SampleKind::Float32 => PixelBuffer::Float32(vec![0.0; len]),
            SampleKind::Float64 => PixelBuffer::Float64(vec![0.0; len]),
        }
    }

    fn from_f64(kind: SampleKind, values: &[f64]) -> Self {
        match kind {
            SampleKind::Int8 => PixelBuffer::Int8(values.iter().map(|v| *v as i8).collect()),
            SampleKind::Int16 => PixelBuffer::Int16(values.iter().map(|v| *v as i16).collect()),
            SampleKind::Int32 => PixelBuffer::Int32(values.iter().map(|v| *v as i32).collect()),
            SampleKind::Float32 => {
                PixelBuffer::Float32(values.iter().map(|v| *v as f32).collect())
            }
            SampleKind::Float64 => PixelBuffer::Float64(values.to_vec()),
        }
    }
}

/// A typed N-dimensional buffer handed across the store boundary.
///
/// The rank is bounded to `1..=MAX_RANK`; asking for anything outside that
/// range is a caller error, surfaced as [`SliceError::InvalidRank`] rather
/// than accepted silently.
#[derive(Debug, Clone)]
pub struct Slab {
    shape: Vec<usize>,
    buffer: PixelBuffer,
}

impl Slab {
    /// A zero-filled slab of the given kind and shape.
    pub fn filled(kind: SampleKind, shape: &[usize]) -> SliceResult<Self> {
        check_rank(shape.len())?;
        let len = shape.iter().product();
        Ok(Slab {
            shape: shape.to_vec(),
            buffer: PixelBuffer::zeroed(kind, len),
        })
    }

    /// Wraps an existing buffer, verifying it against the shape.
    pub fn from_buffer(variable: &str, shape: &[usize], buffer: PixelBuffer) -> SliceResult<Self> {
        check_rank(shape.len())?;
        let expected: usize = shape.iter().product();
        if buffer.len() != expected {
            return Err(SliceError::DimensionMismatch {
                variable: variable.to_string(),
                reason: format!(
                    "buffer holds {} samples but shape {:?} needs {}",
                    buffer.len(),
                    shape,
                    expected
                ),
            });
        }
        Ok(Slab {
            shape: shape.to_vec(),
            buffer,
        })
    }

    pub fn kind(&self) -> SampleKind {
        self.buffer.kind()
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn into_buffer(self) -> PixelBuffer {
        self.buffer
    }
}

fn check_rank(rank: usize) -> SliceResult<()> {
    if rank == 0 || rank > MAX_RANK {
        return Err(SliceError::InvalidRank(rank));
    }
    Ok(())
}

/// Metadata for one dimension of the dataset.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DimensionInfo {
    pub name: String,
    pub len: usize,
    pub unlimited: bool,
}

/// Metadata for one variable of the dataset.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VariableInfo {
    pub name: String,
    /// Dimension names in declaration order (outermost first).
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
    /// `None` when the element type has no supported [`SampleKind`].
    pub kind: Option<SampleKind>,
    /// String-valued attributes; non-string attributes are not interesting
    /// to the classifier and are dropped at harvest time.
    pub attributes: HashMap<String, String>,
}

impl VariableInfo {
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Read access to an opened multidimensional dataset.
///
/// Metadata is harvested eagerly at open time so the trait stays cheap to
/// query; only `read_coordinates` and `read_plane` touch the backing data.
pub trait ArrayStore {
    /// Where the data lives, for log and error messages.
    fn location(&self) -> &str;

    fn dimensions(&self) -> &[DimensionInfo];

    fn variables(&self) -> &[VariableInfo];

    fn variable(&self, name: &str) -> Option<&VariableInfo> {
        self.variables().iter().find(|v| v.name == name)
    }

    fn dimension(&self, name: &str) -> Option<&DimensionInfo> {
        self.dimensions().iter().find(|d| d.name == name)
    }

    /// Reads a 1-D variable in full, widened to `f64`.
    fn read_coordinates(&self, variable: &str) -> SliceResult<Vec<f64>>;

    /// Reads the 2-D plane of `variable` selected by fixing every extra
    /// (leading) dimension at the given offsets. The returned slab has rank
    /// 2, shape `[height, width]`, and the variable's declared kind.
    fn read_plane(&self, variable: &str, offsets: &[usize]) -> SliceResult<Slab>;
}

// ---------------------------------------------------------------------------
// netcdf backend
// ---------------------------------------------------------------------------

/// Production store over the `netcdf` crate.
pub struct NcStore {
    location: String,
    file: netcdf::File,
    dimensions: Vec<DimensionInfo>,
    variables: Vec<VariableInfo>,
}

impl NcStore {
    /// Opens a dataset and harvests its metadata.
    pub fn open<P: AsRef<Path>>(path: P) -> SliceResult<Self> {
        let path = path.as_ref();
        let file = netcdf::open(path)?;

        let mut dimensions = Vec::new();
        for dim in file.dimensions() {
            dimensions.push(DimensionInfo {
                name: dim.name().to_string(),
                len: dim.len(),
                unlimited: dim.is_unlimited(),
            });
        }

        let mut variables = Vec::new();
        for var in file.variables() {
            let mut attributes = HashMap::new();
            for attr in var.attributes() {
                if let Ok(value) = attr.value() {
                    if let Some(text) = attribute_text(value) {
                        attributes.insert(attr.name().to_string(), text);
                    }
                }
            }
            variables.push(VariableInfo {
                name: var.name().to_string(),
                dimensions: var
                    .dimensions()
                    .iter()
                    .map(|d| d.name().to_string())
                    .collect(),
                shape: var.dimensions().iter().map(|d| d.len()).collect(),
                kind: sample_kind(&var.vartype()),
                attributes,
            });
        }

        debug!(
            "opened '{}': {} dimensions, {} variables",
            path.display(),
            dimensions.len(),
            variables.len()
        );

        Ok(NcStore {
            location: path.display().to_string(),
            file,
            dimensions,
            variables,
        })
    }

    fn nc_variable(&self, name: &str) -> SliceResult<netcdf::Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| SliceError::VariableNotFound(name.to_string()))
    }
}

impl ArrayStore for NcStore {
    fn location(&self) -> &str {
        &self.location
    }

    fn dimensions(&self) -> &[DimensionInfo] {
        &self.dimensions
    }

    fn variables(&self) -> &[VariableInfo] {
        &self.variables
    }

    fn read_coordinates(&self, variable: &str) -> SliceResult<Vec<f64>> {
        let var = self.nc_variable(variable)?;
        Ok(var.get_values::<f64, _>(..)?)
    }

    fn read_plane(&self, variable: &str, offsets: &[usize]) -> SliceResult<Slab> {
        let info = self
            .variable(variable)
            .ok_or_else(|| SliceError::VariableNotFound(variable.to_string()))?;
        let (kind, shape) = plane_request(info, offsets)?;
        let var = self.nc_variable(variable)?;

        let buffer = match kind {
            SampleKind::Int8 => PixelBuffer::Int8(read_typed::<i8>(&var, offsets)?),
            SampleKind::Int16 => PixelBuffer::Int16(read_typed::<i16>(&var, offsets)?),
            SampleKind::Int32 => PixelBuffer::Int32(read_typed::<i32>(&var, offsets)?),
            SampleKind::Float32 => PixelBuffer::Float32(read_typed::<f32>(&var, offsets)?),
            SampleKind::Float64 => PixelBuffer::Float64(read_typed::<f64>(&var, offsets)?),
        };
        Slab::from_buffer(variable, &shape, buffer)
    }
}

/// Validates a plane request against the variable and returns its
/// `(kind, [height, width])`.
fn plane_request(info: &VariableInfo, offsets: &[usize]) -> SliceResult<(SampleKind, Vec<usize>)> {
    let rank = info.rank();
    check_rank(rank)?;
    if rank < 2 {
        return Err(SliceError::DimensionMismatch {
            variable: info.name.clone(),
            reason: format!("rank {rank} variable has no 2-D plane"),
        });
    }
    if offsets.len() != rank - 2 {
        return Err(SliceError::DimensionMismatch {
            variable: info.name.clone(),
            reason: format!(
                "{} offsets supplied for a rank {} variable",
                offsets.len(),
                rank
            ),
        });
    }
    for (pos, (&off, &len)) in offsets.iter().zip(&info.shape).enumerate() {
        if off >= len {
            return Err(SliceError::DimensionMismatch {
                variable: info.name.clone(),
                reason: format!("offset {off} exceeds dimension {pos} of length {len}"),
            });
        }
    }
    let kind = info.kind.ok_or_else(|| SliceError::DimensionMismatch {
        variable: info.name.clone(),
        reason: "element type has no supported sample kind".to_string(),
    })?;
    Ok((kind, info.shape[rank - 2..].to_vec()))
}

/// Reads the trailing 2-D plane at the given leading offsets. The extent
/// tuples are built per arity; anything deeper than five extra dimensions is
/// beyond the rank ceiling and was rejected before we get here.
fn read_typed<T: netcdf::types::NcTypeDescriptor + Copy>(
    var: &netcdf::Variable,
    offsets: &[usize],
) -> SliceResult<Vec<T>> {
    let values = match *offsets {
        [] => var.get_values::<T, _>((.., ..))?,
        [a] => var.get_values::<T, _>((a, .., ..))?,
        [a, b] => var.get_values::<T, _>((a, b, .., ..))?,
        [a, b, c] => var.get_values::<T, _>((a, b, c, .., ..))?,
        [a, b, c, d] => var.get_values::<T, _>((a, b, c, d, .., ..))?,
        [a, b, c, d, e] => var.get_values::<T, _>((a, b, c, d, e, .., ..))?,
        _ => return Err(SliceError::InvalidRank(offsets.len() + 2)),
    };
    Ok(values)
}

/// Renders scalar attributes as text; the classifier and the ancillary
/// overrides only ever consume strings. Array-valued attributes are not
/// interesting here and are dropped.
fn attribute_text(value: netcdf::AttributeValue) -> Option<String> {
    use netcdf::AttributeValue::*;
    match value {
        Str(s) => Some(s),
        Schar(v) => Some(v.to_string()),
        Uchar(v) => Some(v.to_string()),
        Short(v) => Some(v.to_string()),
        Ushort(v) => Some(v.to_string()),
        Int(v) => Some(v.to_string()),
        Uint(v) => Some(v.to_string()),
        Longlong(v) => Some(v.to_string()),
        Ulonglong(v) => Some(v.to_string()),
        Float(v) => Some(v.to_string()),
        Double(v) => Some(v.to_string()),
        _ => None,
    }
}

fn sample_kind(ty: &netcdf::types::NcVariableType) -> Option<SampleKind> {
    use netcdf::types::{FloatType, IntType, NcVariableType};
    match ty {
        NcVariableType::Int(IntType::I8) | NcVariableType::Int(IntType::U8) => {
            Some(SampleKind::Int8)
        }
        NcVariableType::Int(IntType::I16) | NcVariableType::Int(IntType::U16) => {
            Some(SampleKind::Int16)
        }
        NcVariableType::Int(IntType::I32) | NcVariableType::Int(IntType::U32) => {
            Some(SampleKind::Int32)
        }
        NcVariableType::Float(FloatType::F32) => Some(SampleKind::Float32),
        NcVariableType::Float(FloatType::F64) => Some(SampleKind::Float64),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// in-memory backend
// ---------------------------------------------------------------------------

/// In-memory store for synthetic datasets.
///
/// Values are held widened to `f64` and narrowed to the declared kind on
/// read, which keeps assembly code short without changing what the engine
/// observes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    location: String,
    dimensions: Vec<DimensionInfo>,
    variables: Vec<VariableInfo>,
    data: HashMap<String, Vec<f64>>,
}

impl MemoryStore {
    pub fn new(location: impl Into<String>) -> Self {
        MemoryStore {
            location: location.into(),
            ..Default::default()
        }
    }

    pub fn add_dimension(&mut self, name: &str, len: usize) -> &mut Self {
        self.dimensions.push(DimensionInfo {
            name: name.to_string(),
            len,
            unlimited: false,
        });
        self
    }

    /// Declares a variable over existing dimensions and stores its values.
    ///
    /// The value count must match the product of the dimension lengths.
    pub fn add_variable(
        &mut self,
        name: &str,
        dims: &[&str],
        kind: SampleKind,
        values: Vec<f64>,
    ) -> SliceResult<&mut Self> {
        let mut shape = Vec::with_capacity(dims.len());
        for dim in dims {
            let found = self
                .dimensions
                .iter()
                .find(|d| d.name == *dim)
                .ok_or_else(|| SliceError::DimensionMismatch {
                    variable: name.to_string(),
                    reason: format!("unknown dimension '{dim}'"),
                })?;
            shape.push(found.len);
        }
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(SliceError::DimensionMismatch {
                variable: name.to_string(),
                reason: format!("{} values supplied, shape needs {}", values.len(), expected),
            });
        }
        self.variables.push(VariableInfo {
            name: name.to_string(),
            dimensions: dims.iter().map(|d| d.to_string()).collect(),
            shape,
            kind: Some(kind),
            attributes: HashMap::new(),
        });
        self.data.insert(name.to_string(), values);
        Ok(self)
    }

    /// Attaches a string attribute to a declared variable.
    pub fn put_attribute(&mut self, variable: &str, name: &str, value: &str) -> SliceResult<()> {
        let var = self
            .variables
            .iter_mut()
            .find(|v| v.name == variable)
            .ok_or_else(|| SliceError::VariableNotFound(variable.to_string()))?;
        var.attributes.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

impl ArrayStore for MemoryStore {
    fn location(&self) -> &str {
        &self.location
    }

    fn dimensions(&self) -> &[DimensionInfo] {
        &self.dimensions
    }

    fn variables(&self) -> &[VariableInfo] {
        &self.variables
    }

    fn read_coordinates(&self, variable: &str) -> SliceResult<Vec<f64>> {
        self.data
            .get(variable)
            .cloned()
            .ok_or_else(|| SliceError::VariableNotFound(variable.to_string()))
    }

    fn read_plane(&self, variable: &str, offsets: &[usize]) -> SliceResult<Slab> {
        let info = self
            .variable(variable)
            .ok_or_else(|| SliceError::VariableNotFound(variable.to_string()))?;
        let (kind, shape) = plane_request(info, offsets)?;
        let plane_len: usize = shape.iter().product();

        // The trailing two dimensions are fastest-varying, so a plane is one
        // contiguous run at the flattened offset of the leading tuple.
        let mut start = 0usize;
        let mut stride: usize = info.shape.iter().product();
        for (&off, &len) in offsets.iter().zip(&info.shape) {
            stride /= len;
            start += off * stride;
        }

        let values = &self.data[variable][start..start + plane_len];
        Slab::from_buffer(variable, &shape, PixelBuffer::from_f64(kind, values))
    }
}
