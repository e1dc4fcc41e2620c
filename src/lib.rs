//! # ncslice
//!
//! A Rust library for indexing and decoding multidimensional geophysical
//! datasets (NetCDF and friends) as ordered collections of 2-D raster
//! slices.
//!
//! ## Features
//!
//! - **Axis classification**: a prioritized rule chain labels coordinate
//!   variables (spatial, vertical, temporal) and weeds out name-alike decoys
//! - **Slice catalog**: every N-dimensional variable flattens into one
//!   contiguous, deterministic index space of 2-D planes, grouped into named
//!   coverage types
//! - **Typed decoding**: pixel buffers mirror the source variable's declared
//!   element type, with the georeference (affine or curvilinear) attached
//! - **Clean lifecycle**: single open, mutex-guarded reads, idempotent
//!   dispose
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ncslice::reader::SliceReader;
//!
//! let reader = SliceReader::open("ocean.nc")?;
//! println!("{} slices, types: {:?}", reader.num_slices(), reader.type_names());
//!
//! let slice = reader.read(0)?;
//! println!("{}x{} {}", slice.width, slice.height, slice.kind().name());
//!
//! reader.dispose()?;
//! # Ok::<(), ncslice::error::SliceError>(())
//! ```
//!
//! ## Ancillary Metadata
//!
//! An optional side-channel file (JSON or YAML) can rename coverage types,
//! restrict the variable set, and override CRS or no-data per variable. It
//! must be supplied before the first read:
//!
//! ```rust,no_run
//! use ncslice::reader::SliceReader;
//!
//! let mut reader = SliceReader::open("ocean.nc")?;
//! reader.set_ancillary("ocean.ancillary.json")?;
//! let slice = reader.read(0)?;
//! # Ok::<(), ncslice::error::SliceError>(())
//! ```

pub mod ancillary;
pub mod axis;
pub mod catalog;
pub mod cli;
pub mod error;
pub mod georef;
pub mod reader;
pub mod storage;
pub mod store;
pub mod summary;
pub mod time;

#[cfg(test)]
mod cli_tests;

pub use crate::catalog::{SliceCatalog, SliceDescriptor};
pub use crate::error::{SliceError, SliceResult};
pub use crate::reader::{RasterSlice, SliceReader};
