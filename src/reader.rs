//! # Slice Reader
//!
//! The decode surface consumers hold: open a dataset, query its slice
//! catalog, read any slice by integer index, dispose.
//!
//! The reader doubles as the resource lifecycle guard. The dataset handle
//! is owned behind a mutex so at most one in-flight `read` (or `dispose`)
//! touches the array store at a time; distinct readers over distinct
//! datasets are fully independent. Classification and catalog construction
//! happen once at open time and are cached for the reader's lifetime.
//! `dispose` is idempotent and releases the backing file immediately; any
//! read afterwards fails with `ResourceClosed`.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{debug, info};

use crate::ancillary::AncillarySpec;
use crate::axis::AxisSet;
use crate::catalog::{SliceCatalog, SliceDescriptor};
use crate::error::{SliceError, SliceResult};
use crate::georef::{self, CrsRegistry, Georeference};
use crate::store::{ArrayStore, DimensionInfo, NcStore, PixelBuffer, SampleKind, VariableInfo};

/// Magic signatures the pre-check accepts: classic NetCDF (versions 1, 2
/// and 5) and HDF5-backed NetCDF-4.
const CDF_MAGICS: &[&[u8]] = &[b"CDF\x01", b"CDF\x02", b"CDF\x05"];
const HDF5_MAGIC: &[u8] = b"\x89HDF\r\n\x1a\n";

/// One decoded 2-D raster plane with its georeference. Owns its pixel
/// buffer independently of the reader that produced it.
#[derive(Debug, Clone)]
pub struct RasterSlice {
    pub descriptor: SliceDescriptor,
    pub width: usize,
    pub height: usize,
    /// Always 1; multi-band composition is out of scope.
    pub band_count: usize,
    pub pixels: PixelBuffer,
    pub georef: Georeference,
    /// No-data marker, from the ancillary override or the variable's
    /// declared fill value.
    pub nodata: Option<f64>,
}

impl RasterSlice {
    pub fn kind(&self) -> SampleKind {
        self.pixels.kind()
    }
}

/// Mutable half of the reader, guarded by the lifecycle mutex.
struct ReaderState {
    store: Option<NcStore>,
    reads_started: bool,
    /// Per-variable georeferences, built on first use.
    georefs: HashMap<String, Georeference>,
}

/// Read-only decoding façade over one multidimensional dataset.
pub struct SliceReader {
    path: PathBuf,
    registry: Arc<CrsRegistry>,
    axes: AxisSet,
    catalog: SliceCatalog,
    /// Dimension metadata captured at open time; survives disposal so
    /// summaries stay answerable.
    dimensions: Vec<DimensionInfo>,
    ancillary: Option<AncillarySpec>,
    state: Mutex<ReaderState>,
}

impl std::fmt::Debug for SliceReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SliceReader")
            .field("path", &self.path)
            .field("axes", &self.axes)
            .field("catalog", &self.catalog)
            .field("dimensions", &self.dimensions)
            .field("ancillary", &self.ancillary)
            .finish_non_exhaustive()
    }
}

impl SliceReader {
    /// Cheap pre-check: does the file carry a recognized magic signature?
    ///
    /// `open` refuses anything this rejects, so decode failures surface
    /// here instead of deep inside a read. The probe handle is dropped
    /// before returning; a rejected file stays deletable.
    pub fn can_decode<P: AsRef<Path>>(path: P) -> bool {
        let mut header = [0u8; 8];
        let Ok(mut file) = File::open(path) else {
            return false;
        };
        let Ok(()) = file.read_exact(&mut header) else {
            return false;
        };
        if header[..] == *HDF5_MAGIC {
            return true;
        }
        CDF_MAGICS.iter().any(|magic| header.starts_with(magic))
    }

    /// Opens a dataset with a private CRS registry.
    pub fn open<P: AsRef<Path>>(path: P) -> SliceResult<Self> {
        Self::open_with_registry(path, Arc::new(CrsRegistry::new()))
    }

    /// Opens a dataset, sharing the given CRS registry with other readers.
    ///
    /// Classification and catalog construction run here, once; every later
    /// query hits the cached result.
    pub fn open_with_registry<P: AsRef<Path>>(
        path: P,
        registry: Arc<CrsRegistry>,
    ) -> SliceResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !Self::can_decode(&path) {
            return Err(SliceError::UnsupportedFormat(path));
        }

        let store = NcStore::open(&path)?;
        let axes = AxisSet::classify(&store)?;
        let catalog = SliceCatalog::build(&store, &axes, None)?;
        info!(
            "opened '{}': {} axes, {} slices, types {:?}",
            path.display(),
            axes.len(),
            catalog.len(),
            catalog.type_names()
        );

        Ok(SliceReader {
            path,
            registry,
            axes,
            catalog,
            dimensions: store.dimensions().to_vec(),
            ancillary: None,
            state: Mutex::new(ReaderState {
                store: Some(store),
                reads_started: false,
                georefs: HashMap::new(),
            }),
        })
    }

    /// Dimension metadata of the dataset, captured at open time.
    pub fn dimensions(&self) -> &[DimensionInfo] {
        &self.dimensions
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total number of slices in the catalog.
    pub fn num_slices(&self) -> usize {
        self.catalog.len()
    }

    /// Distinct coverage-type names, stable across calls.
    pub fn type_names(&self) -> Vec<String> {
        self.catalog.type_names()
    }

    /// Ordered descriptors of one coverage type; empty for unknown names.
    pub fn slices_for_type(&self, name: &str) -> Vec<SliceDescriptor> {
        self.catalog
            .slices_for_type(name)
            .into_iter()
            .cloned()
            .collect()
    }

    /// The descriptor at a global index.
    pub fn slice(&self, index: usize) -> SliceResult<SliceDescriptor> {
        self.catalog.slice(index).cloned()
    }

    /// The cached catalog, for summary and inspection layers.
    pub fn catalog(&self) -> &SliceCatalog {
        &self.catalog
    }

    /// The classified axes, for summary and inspection layers.
    pub fn axes(&self) -> &AxisSet {
        &self.axes
    }

    /// Supplies the ancillary metadata path. Allowed once, and only before
    /// the first read; afterwards the call fails with `AncillaryConflict`
    /// instead of being silently accepted. The catalog is rebuilt under the
    /// new spec (still before any read, so no caller can observe a switch).
    pub fn set_ancillary<P: AsRef<Path>>(&mut self, path: P) -> SliceResult<()> {
        let spec = AncillarySpec::from_file(path)?;
        let mut state = self.state.lock().expect("reader state poisoned");
        if state.reads_started || self.ancillary.is_some() {
            return Err(SliceError::AncillaryConflict);
        }
        let store = state.store.as_ref().ok_or(SliceError::ResourceClosed)?;
        self.catalog = SliceCatalog::build(store, &self.axes, Some(&spec))?;
        state.georefs.clear();
        drop(state);
        debug!(
            "ancillary metadata applied: types now {:?}",
            self.catalog.type_names()
        );
        self.ancillary = Some(spec);
        Ok(())
    }

    /// Decodes the slice at `index`.
    ///
    /// The one externally reachable index error is `IndexOutOfRange` from
    /// the catalog lookup — the catalog never hands out an invalid address
    /// of its own making. After `dispose` this fails with `ResourceClosed`.
    pub fn read(&self, index: usize) -> SliceResult<RasterSlice> {
        let descriptor = self.catalog.slice(index)?.clone();

        let mut guard = self.state.lock().expect("reader state poisoned");
        let ReaderState {
            store,
            reads_started,
            georefs,
        } = &mut *guard;
        let store = store.as_ref().ok_or(SliceError::ResourceClosed)?;

        let info = store
            .variable(&descriptor.variable)
            .ok_or_else(|| SliceError::VariableNotFound(descriptor.variable.clone()))?;

        let georef = match georefs.get(&descriptor.variable) {
            Some(cached) => cached.clone(),
            None => {
                let built = self.build_georeference(info);
                georefs.insert(descriptor.variable.clone(), built.clone());
                built
            }
        };
        let nodata = self.resolve_nodata(info);

        let plane = store.read_plane(&descriptor.variable, &descriptor.offsets())?;
        *reads_started = true;

        let (height, width) = (plane.shape()[0], plane.shape()[1]);
        debug!(
            "read slice {index}: variable '{}', {}x{} {}",
            descriptor.variable,
            width,
            height,
            plane.kind().name()
        );
        Ok(RasterSlice {
            descriptor,
            width,
            height,
            band_count: 1,
            pixels: plane.into_buffer(),
            georef,
            nodata,
        })
    }

    /// Releases the dataset handle. Idempotent: repeated calls are no-ops.
    /// The backing file is releasable by the operating system as soon as
    /// this returns.
    pub fn dispose(&self) -> SliceResult<()> {
        let mut state = self.state.lock().expect("reader state poisoned");
        if state.store.take().is_some() {
            debug!("disposed '{}'", self.path.display());
        }
        state.georefs.clear();
        Ok(())
    }

    fn build_georeference(&self, var: &VariableInfo) -> Georeference {
        let rank = var.rank();
        let x_axis = self.axes.axis_for_dimension(&var.dimensions[rank - 1]);
        let y_axis = self.axes.axis_for_dimension(&var.dimensions[rank - 2]);
        let crs_override = self
            .ancillary
            .as_ref()
            .and_then(|spec| spec.override_for(&var.name))
            .and_then(|o| o.crs.as_deref());
        georef::build_georeference(x_axis, y_axis, &self.registry, crs_override)
    }

    fn resolve_nodata(&self, var: &VariableInfo) -> Option<f64> {
        if let Some(nodata) = self
            .ancillary
            .as_ref()
            .and_then(|spec| spec.override_for(&var.name))
            .and_then(|o| o.nodata)
        {
            return Some(nodata);
        }
        var.attribute("_FillValue")
            .or_else(|| var.attribute("missing_value"))
            .and_then(|text| text.parse::<f64>().ok())
    }
}

impl Drop for SliceReader {
    fn drop(&mut self) {
        let _ = self.dispose();
    }
}
