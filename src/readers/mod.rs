pub mod csv_reader;
#[cfg(feature = "netcdf")]
pub mod netcdf_reader;

pub use csv_reader::CsvDataset;
#[cfg(feature = "netcdf")]
pub use netcdf_reader::NetCdfDataset;

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{CSV_EXTENSION, NETCDF_EXTENSIONS};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Index of one spatial cell in a (latitude, longitude) grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridCell {
    pub lat_index: usize,
    pub lon_index: usize,
}

impl GridCell {
    pub fn new(lat_index: usize, lon_index: usize) -> Self {
        Self {
            lat_index,
            lon_index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridShape {
    pub n_time: usize,
    pub n_lat: usize,
    pub n_lon: usize,
}

impl GridShape {
    pub fn contains(&self, cell: GridCell) -> bool {
        cell.lat_index < self.n_lat && cell.lon_index < self.n_lon
    }

    pub fn cell_count(&self) -> usize {
        self.n_lat * self.n_lon
    }
}

/// Time series of the requested variables at one grid cell, in file order
#[derive(Debug, Clone, PartialEq)]
pub struct CellFrame {
    pub time: Vec<NaiveDateTime>,
    pub columns: Vec<(String, Vec<f64>)>,
}

impl CellFrame {
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }
}

/// Read access to a gridded (time, latitude, longitude) dataset
pub trait GriddedDataset {
    fn variable_names(&self) -> Vec<String>;

    fn has_variable(&self, name: &str) -> bool {
        self.variable_names().iter().any(|n| n == name)
    }

    fn grid_shape(&self) -> GridShape;

    /// Materialize `names` at `cell`; fails if any name is absent
    fn read_cell(&self, cell: GridCell, names: &[&str]) -> Result<CellFrame>;
}

/// Supported input formats, chosen from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    NetCdf,
    Csv,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if NETCDF_EXTENSIONS.contains(&extension.as_str()) {
            Ok(InputFormat::NetCdf)
        } else if extension == CSV_EXTENSION {
            Ok(InputFormat::Csv)
        } else {
            Err(ProcessingError::InvalidFormat(format!(
                "Unrecognised dataset extension for {} (expected .nc, .nc4, .cdf, .netcdf or .csv)",
                path.display()
            )))
        }
    }
}

/// Open a dataset file; the handle is closed when the returned box is dropped
pub fn open_dataset(path: &Path) -> Result<Box<dyn GriddedDataset>> {
    match InputFormat::from_path(path)? {
        InputFormat::Csv => Ok(Box::new(CsvDataset::open(path)?)),
        #[cfg(feature = "netcdf")]
        InputFormat::NetCdf => Ok(Box::new(NetCdfDataset::open(path)?)),
        #[cfg(not(feature = "netcdf"))]
        InputFormat::NetCdf => Err(ProcessingError::FeatureDisabled("NetCDF")),
    }
}
