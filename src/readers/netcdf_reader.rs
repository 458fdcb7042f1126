use crate::error::{ProcessingError, Result};
use crate::readers::{CellFrame, GridCell, GridShape, GriddedDataset};
use crate::utils::constants::{LATITUDE_NAMES, LONGITUDE_NAMES, TIME_NAMES};
use crate::utils::time::TimeUnits;
use netcdf::{AttributeValue, Extent};
use std::path::Path;
use tracing::debug;

/// NetCDF file laid out on (time, latitude, longitude) dimensions.
///
/// The underlying file handle is closed on drop.
pub struct NetCdfDataset {
    file: netcdf::File,
    time_dim: String,
    lat_dim: Option<String>,
    lon_dim: Option<String>,
}

impl NetCdfDataset {
    pub fn open(path: &Path) -> Result<Self> {
        let file = netcdf::open(path)?;

        let time_dim = find_dimension(&file, &TIME_NAMES).ok_or_else(|| {
            ProcessingError::InvalidFormat(format!(
                "{} has no time dimension",
                path.display()
            ))
        })?;
        let lat_dim = find_dimension(&file, &LATITUDE_NAMES);
        let lon_dim = find_dimension(&file, &LONGITUDE_NAMES);

        debug!(
            "Opened {} (time: {}, lat: {:?}, lon: {:?})",
            path.display(),
            time_dim,
            lat_dim,
            lon_dim
        );

        Ok(Self {
            file,
            time_dim,
            lat_dim,
            lon_dim,
        })
    }

    fn dimension_len(&self, name: Option<&str>) -> usize {
        name.and_then(|n| self.file.dimension(n))
            .map(|d| d.len())
            .unwrap_or(1)
    }

    fn read_times(&self) -> Result<Vec<chrono::NaiveDateTime>> {
        let var = self.file.variable(&self.time_dim).ok_or_else(|| {
            ProcessingError::MissingVariable {
                key: "time".to_string(),
                name: self.time_dim.clone(),
            }
        })?;

        let units = match var.attribute_value("units") {
            Some(Ok(AttributeValue::Str(units))) => units,
            _ => {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Time variable '{}' has no units attribute",
                    self.time_dim
                )))
            }
        };
        let units = TimeUnits::parse(&units)?;

        let offsets: Vec<f64> = var.get_values::<f64, _>(..)?;
        offsets.into_iter().map(|t| units.decode(t)).collect()
    }

    /// Read one variable's time series at `cell`, masking its fill value and unpacking
    /// `scale_factor`/`add_offset` when present
    fn read_series(&self, name: &str, cell: GridCell) -> Result<Vec<f64>> {
        let var = self.file.variable(name).ok_or_else(|| ProcessingError::MissingVariable {
            key: "variable".to_string(),
            name: name.to_string(),
        })?;

        let mut extents: Vec<Extent> = Vec::new();
        for dim in var.dimensions() {
            let dim_name = dim.name();
            if dim_name == self.time_dim {
                extents.push((0..dim.len()).into());
            } else if Some(&dim_name) == self.lat_dim.as_ref() {
                extents.push(cell.lat_index.into());
            } else if Some(&dim_name) == self.lon_dim.as_ref() {
                extents.push(cell.lon_index.into());
            } else if dim.len() == 1 {
                extents.push(0.into());
            } else {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Variable '{}' has unsupported dimension '{}' of length {}",
                    name,
                    dim_name,
                    dim.len()
                )));
            }
        }

        let fill = ["_FillValue", "missing_value"]
            .iter()
            .find_map(|attr| numeric_attribute(&var, attr));
        let scale = numeric_attribute(&var, "scale_factor").unwrap_or(1.0);
        let offset = numeric_attribute(&var, "add_offset").unwrap_or(0.0);
        let values: Vec<f64> = var.get_values::<f64, _>(extents)?;

        // Fill values are stored packed
        Ok(values
            .into_iter()
            .map(|v| match fill {
                Some(f) if v == f => f64::NAN,
                _ => v * scale + offset,
            })
            .collect())
    }
}

impl GriddedDataset for NetCdfDataset {
    fn variable_names(&self) -> Vec<String> {
        self.file.variables().map(|v| v.name()).collect()
    }

    fn has_variable(&self, name: &str) -> bool {
        self.file.variable(name).is_some()
    }

    fn grid_shape(&self) -> GridShape {
        GridShape {
            n_time: self.dimension_len(Some(&self.time_dim)),
            n_lat: self.dimension_len(self.lat_dim.as_deref()),
            n_lon: self.dimension_len(self.lon_dim.as_deref()),
        }
    }

    fn read_cell(&self, cell: GridCell, names: &[&str]) -> Result<CellFrame> {
        let time = self.read_times()?;
        let columns = names
            .iter()
            .map(|name| {
                let values = self.read_series(name, cell)?;
                if values.len() != time.len() {
                    return Err(ProcessingError::InvalidFormat(format!(
                        "Variable '{}' has {} values for {} timestamps",
                        name,
                        values.len(),
                        time.len()
                    )));
                }
                Ok((name.to_string(), values))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CellFrame { time, columns })
    }
}

fn find_dimension(file: &netcdf::File, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find(|n| file.dimension(n).is_some())
        .map(|n| n.to_string())
}

fn numeric_attribute(var: &netcdf::Variable, name: &str) -> Option<f64> {
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Double(d) => Some(d),
        AttributeValue::Float(f) => Some(f as f64),
        AttributeValue::Int(i) => Some(i as f64),
        AttributeValue::Short(s) => Some(s as f64),
        _ => None,
    }
}
