use crate::error::{ProcessingError, Result};
use crate::readers::{CellFrame, GridCell, GridShape, GriddedDataset};
use crate::utils::constants::{LATITUDE_NAMES, LONGITUDE_NAMES, TIME_NAMES};
use crate::utils::time::parse_timestamp;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone)]
struct CsvRow {
    time: NaiveDateTime,
    lat_index: usize,
    lon_index: usize,
    values: Vec<f64>,
}

/// Long-format gridded table: one row per (time, latitude, longitude).
///
/// Columns other than the coordinates are variables. A file without
/// latitude/longitude columns is treated as a single-cell grid. Empty cells
/// and `NA`/`NaN` read as NaN.
#[derive(Debug, Clone)]
pub struct CsvDataset {
    variables: Vec<String>,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    n_time: usize,
    rows: Vec<CsvRow>,
}

impl CsvDataset {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let find = |names: &[&str]| headers.iter().position(|h| names.contains(&h));

        let time_col = find(&TIME_NAMES[..]).ok_or_else(|| {
            ProcessingError::InvalidFormat("CSV dataset has no 'time' column".to_string())
        })?;
        let lat_col = find(&LATITUDE_NAMES[..]);
        let lon_col = find(&LONGITUDE_NAMES[..]);

        let coordinate_cols: HashSet<usize> = [Some(time_col), lat_col, lon_col]
            .into_iter()
            .flatten()
            .collect();
        let variable_cols: Vec<usize> = (0..headers.len())
            .filter(|i| !coordinate_cols.contains(i))
            .collect();
        let variables: Vec<String> = variable_cols
            .iter()
            .map(|&i| headers[i].to_string())
            .collect();

        let mut latitudes: Vec<f64> = Vec::new();
        let mut longitudes: Vec<f64> = Vec::new();
        let mut times: HashSet<NaiveDateTime> = HashSet::new();
        let mut rows = Vec::new();

        for (line, record) in csv_reader.records().enumerate() {
            let record = record?;
            let field = |i: usize| record.get(i).unwrap_or("");

            let time = parse_timestamp(field(time_col))?;
            let lat_index = match lat_col {
                Some(col) => coordinate_index(&mut latitudes, parse_coordinate(field(col), line)?),
                None => 0,
            };
            let lon_index = match lon_col {
                Some(col) => coordinate_index(&mut longitudes, parse_coordinate(field(col), line)?),
                None => 0,
            };

            let values = variable_cols
                .iter()
                .map(|&i| parse_value(field(i), line, &headers[i]))
                .collect::<Result<Vec<f64>>>()?;

            times.insert(time);
            rows.push(CsvRow {
                time,
                lat_index,
                lon_index,
                values,
            });
        }

        Ok(Self {
            variables,
            latitudes,
            longitudes,
            n_time: times.len(),
            rows,
        })
    }
}

impl GriddedDataset for CsvDataset {
    fn variable_names(&self) -> Vec<String> {
        self.variables.clone()
    }

    fn grid_shape(&self) -> GridShape {
        GridShape {
            n_time: self.n_time,
            n_lat: self.latitudes.len().max(1),
            n_lon: self.longitudes.len().max(1),
        }
    }

    fn read_cell(&self, cell: GridCell, names: &[&str]) -> Result<CellFrame> {
        let indices = names
            .iter()
            .map(|name| {
                self.variables
                    .iter()
                    .position(|v| v == *name)
                    .ok_or_else(|| ProcessingError::MissingVariable {
                        key: "variable".to_string(),
                        name: name.to_string(),
                    })
            })
            .collect::<Result<Vec<usize>>>()?;

        let cell_rows: Vec<&CsvRow> = self
            .rows
            .iter()
            .filter(|r| r.lat_index == cell.lat_index && r.lon_index == cell.lon_index)
            .collect();

        let columns = names
            .iter()
            .zip(&indices)
            .map(|(name, &idx)| {
                let values = cell_rows.iter().map(|r| r.values[idx]).collect();
                (name.to_string(), values)
            })
            .collect();

        Ok(CellFrame {
            time: cell_rows.iter().map(|r| r.time).collect(),
            columns,
        })
    }
}

/// Position of `value` in the coordinate axis, appending it on first sight
fn coordinate_index(axis: &mut Vec<f64>, value: f64) -> usize {
    match axis.iter().position(|&c| c == value) {
        Some(idx) => idx,
        None => {
            axis.push(value);
            axis.len() - 1
        }
    }
}

fn parse_coordinate(field: &str, line: usize) -> Result<f64> {
    field.parse::<f64>().map_err(|_| {
        ProcessingError::InvalidFormat(format!(
            "Invalid coordinate '{}' on data row {}",
            field,
            line + 1
        ))
    })
}

fn parse_value(field: &str, line: usize, column: &str) -> Result<f64> {
    if field.is_empty() || field.eq_ignore_ascii_case("na") || field.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    field.parse::<f64>().map_err(|_| {
        ProcessingError::InvalidFormat(format!(
            "Invalid value '{}' for {} on data row {}",
            field,
            column,
            line + 1
        ))
    })
}
