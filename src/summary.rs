//! # Dataset Summary
//!
//! Serializable snapshots of an opened dataset — dimensions, classified
//! axes, coverage types and slice counts — plus printers for the CLI's
//! human, JSON and YAML output formats.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::reader::SliceReader;
use crate::store::DimensionInfo;

/// One classified axis, flattened for display.
#[derive(Debug, Clone, Serialize)]
pub struct AxisSummary {
    pub name: String,
    pub dimension: String,
    pub role: String,
    pub len: usize,
    pub units: Option<String>,
    pub first_value: Option<f64>,
    pub last_value: Option<f64>,
    /// RFC 3339 rendering of the first/last values of a temporal axis.
    pub first_timestamp: Option<String>,
    pub last_timestamp: Option<String>,
}

/// One coverage type, flattened for display.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageTypeSummary {
    pub name: String,
    pub extra_dimensions: Vec<String>,
    pub width: usize,
    pub height: usize,
    pub sample_kind: String,
    pub num_slices: usize,
}

/// Complete summary of an opened dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub path: String,
    pub num_slices: usize,
    pub dimensions: Vec<DimensionInfo>,
    pub axes: Vec<AxisSummary>,
    pub coverage_types: Vec<CoverageTypeSummary>,
}

/// Builds the summary from a reader's cached classification and catalog.
/// Works before and after disposal; no array data is touched.
pub fn summarize(reader: &SliceReader) -> DatasetSummary {
    let axes = reader
        .axes()
        .iter()
        .map(|axis| {
            let timestamp = |value: Option<f64>| {
                value
                    .zip(axis.time_base)
                    .map(|(v, base)| base.timestamp(v).to_rfc3339())
            };
            let first = axis.values.first().copied();
            let last = axis.values.last().copied();
            AxisSummary {
                name: axis.name.clone(),
                dimension: axis.dimension.clone(),
                role: axis.role.name().to_string(),
                len: axis.len(),
                units: axis.units.clone(),
                first_value: first,
                last_value: last,
                first_timestamp: timestamp(first),
                last_timestamp: timestamp(last),
            }
        })
        .collect();

    let coverage_types = reader
        .catalog()
        .coverage_types()
        .iter()
        .map(|ct| CoverageTypeSummary {
            name: ct.name.clone(),
            extra_dimensions: ct.extra_dimensions.clone(),
            width: ct.width,
            height: ct.height,
            sample_kind: ct.kind.name().to_string(),
            num_slices: ct.num_slices(),
        })
        .collect();

    DatasetSummary {
        path: reader.path().display().to_string(),
        num_slices: reader.num_slices(),
        dimensions: reader.dimensions().to_vec(),
        axes,
        coverage_types,
    }
}

/// Print a summary in human-readable form.
pub fn print_summary_human(summary: &DatasetSummary) {
    println!("Dataset: {}", summary.path);
    println!("  Slices: {}", summary.num_slices);
    println!("  Dimensions: {} total", summary.dimensions.len());
    for dim in &summary.dimensions {
        println!(
            "    {} ({}{})",
            dim.name,
            dim.len,
            if dim.unlimited { ", unlimited" } else { "" }
        );
    }
    println!("  Axes: {} classified", summary.axes.len());
    for axis in &summary.axes {
        let units = axis.units.as_deref().unwrap_or("-");
        print!(
            "    {} [{}] role={} len={} units={}",
            axis.name, axis.dimension, axis.role, axis.len, units
        );
        match (&axis.first_timestamp, &axis.last_timestamp) {
            (Some(first), Some(last)) => println!(" span={first}..{last}"),
            _ => match (axis.first_value, axis.last_value) {
                (Some(first), Some(last)) => println!(" span={first}..{last}"),
                _ => println!(),
            },
        }
    }
    println!("  Coverage types: {} total", summary.coverage_types.len());
    for ct in &summary.coverage_types {
        println!(
            "    {} ({}x{} {}, {} slices, extra dims: [{}])",
            ct.name,
            ct.width,
            ct.height,
            ct.sample_kind,
            ct.num_slices,
            ct.extra_dimensions.join(", ")
        );
    }
}

/// Print a summary as pretty JSON.
pub fn print_summary_json(summary: &DatasetSummary) -> Result<()> {
    let json =
        serde_json::to_string_pretty(summary).context("Failed to serialize summary to JSON")?;
    println!("{json}");
    Ok(())
}

/// Print a summary as YAML.
pub fn print_summary_yaml(summary: &DatasetSummary) -> Result<()> {
    let yaml = serde_yaml::to_string(summary).context("Failed to serialize summary to YAML")?;
    println!("{yaml}");
    Ok(())
}
