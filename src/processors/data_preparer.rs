use crate::error::{ProcessingError, Result};
use crate::models::{CanonicalVariable, Observation, ObservationTable, PreparationStats, VariableNames};
use crate::readers::{open_dataset, GridCell, GriddedDataset};
use crate::utils::constants::MISSING_VALUE_SENTINEL;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Turns one grid cell of a flux-tower dataset into a canonical observation table
#[derive(Debug, Clone, Default)]
pub struct DataPreparer {
    names: VariableNames,
}

impl DataPreparer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names(names: VariableNames) -> Self {
        Self { names }
    }

    /// Build from a `mapping key -> dataset name` map; unknown keys are rejected
    pub fn from_mapping(mapping: &HashMap<String, String>) -> Result<Self> {
        Ok(Self::with_names(VariableNames::from_mapping(mapping)?))
    }

    pub fn names(&self) -> &VariableNames {
        &self.names
    }

    /// Open `path`, prepare `cell`, and release the file before returning
    pub fn prepare_file(&self, path: &Path, cell: GridCell) -> Result<ObservationTable> {
        info!("Loading {}", path.display());
        let dataset = open_dataset(path)?;
        let table = self.prepare(dataset.as_ref(), cell)?;
        drop(dataset);
        Ok(table)
    }

    pub fn prepare(&self, dataset: &dyn GriddedDataset, cell: GridCell) -> Result<ObservationTable> {
        let shape = dataset.grid_shape();
        if !shape.contains(cell) {
            return Err(ProcessingError::GridCellOutOfRange {
                lat_index: cell.lat_index,
                lon_index: cell.lon_index,
                n_lat: shape.n_lat,
                n_lon: shape.n_lon,
            });
        }
        if shape.cell_count() > 1 {
            warn!(
                "Dataset has {} grid cells; using cell ({}, {}) only",
                shape.cell_count(),
                cell.lat_index,
                cell.lon_index
            );
        }

        let expected = self.resolve_variables(dataset)?;
        let names: Vec<&str> = expected.iter().map(|(_, name)| name.as_str()).collect();
        let frame = dataset.read_cell(cell, &names)?;

        let column = |variable: CanonicalVariable| {
            expected
                .iter()
                .find(|(v, _)| *v == variable)
                .and_then(|(_, name)| frame.column(name))
        };

        let has_storage = column(CanonicalVariable::Storage).is_some();
        let has_temperature = column(CanonicalVariable::Temperature).is_some();

        let mut stats = PreparationStats {
            raw_rows: frame.time.len(),
            ..PreparationStats::default()
        };
        let mut seen = HashSet::with_capacity(frame.time.len());
        let mut observations = Vec::with_capacity(frame.time.len());

        for (row, time) in frame.time.iter().enumerate() {
            if !seen.insert(*time) {
                stats.duplicate_rows += 1;
                continue;
            }

            let mut value = |variable: CanonicalVariable| {
                let raw = column(variable)?[row];
                let cleaned = clean_value(raw);
                if raw == MISSING_VALUE_SENTINEL {
                    stats.sentinel_values += 1;
                }
                cleaned
            };

            observations.push(Observation {
                time: *time,
                flux: value(CanonicalVariable::Flux),
                storage: value(CanonicalVariable::Storage),
                insolation: value(CanonicalVariable::Insolation),
                friction_velocity: value(CanonicalVariable::FrictionVelocity),
                temperature: value(CanonicalVariable::Temperature),
            });
        }

        if stats.duplicate_rows > 0 {
            debug!("Dropped {} duplicate timestamps", stats.duplicate_rows);
        }
        info!(
            "Prepared {} observations (storage: {}, temperature: {})",
            observations.len(),
            has_storage,
            has_temperature
        );

        Ok(ObservationTable::new(observations, has_storage, has_temperature).with_stats(stats))
    }

    /// Dataset names to read, optional variables dropped when absent
    fn resolve_variables(
        &self,
        dataset: &dyn GriddedDataset,
    ) -> Result<Vec<(CanonicalVariable, String)>> {
        let mut expected = Vec::new();

        for variable in CanonicalVariable::ALL {
            let name = self.names.get(variable);
            if dataset.has_variable(name) {
                expected.push((variable, name.to_string()));
            } else if variable.is_optional() {
                debug!("Optional variable '{}' ({}) not in dataset", name, variable);
            } else {
                return Err(ProcessingError::MissingVariable {
                    key: variable.key().to_string(),
                    name: name.to_string(),
                });
            }
        }

        Ok(expected)
    }
}

/// Sentinel and non-finite values become missing
fn clean_value(raw: f64) -> Option<f64> {
    if raw == MISSING_VALUE_SENTINEL || !raw.is_finite() {
        None
    } else {
        Some(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::{CellFrame, CsvDataset, GridShape};
    use chrono::{NaiveDate, NaiveDateTime};
    use pretty_assertions::assert_eq;

    /// Single-cell dataset held in memory
    struct SiteDataset {
        time: Vec<NaiveDateTime>,
        columns: Vec<(String, Vec<f64>)>,
    }

    impl SiteDataset {
        fn new(n: usize) -> Self {
            let start = NaiveDate::from_ymd_opt(2017, 9, 28)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap();
            Self {
                time: (0..n)
                    .map(|i| start + chrono::Duration::minutes(30 * i as i64))
                    .collect(),
                columns: Vec::new(),
            }
        }

        fn with(mut self, name: &str, values: Vec<f64>) -> Self {
            self.columns.push((name.to_string(), values));
            self
        }
    }

    impl GriddedDataset for SiteDataset {
        fn variable_names(&self) -> Vec<String> {
            self.columns.iter().map(|(n, _)| n.clone()).collect()
        }

        fn grid_shape(&self) -> GridShape {
            GridShape {
                n_time: self.time.len(),
                n_lat: 1,
                n_lon: 1,
            }
        }

        fn read_cell(&self, _cell: GridCell, names: &[&str]) -> Result<CellFrame> {
            let columns = names
                .iter()
                .map(|name| {
                    self.columns
                        .iter()
                        .find(|(n, _)| n == name)
                        .cloned()
                        .ok_or_else(|| ProcessingError::MissingVariable {
                            key: "variable".to_string(),
                            name: name.to_string(),
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(CellFrame {
                time: self.time.clone(),
                columns,
            })
        }
    }

    fn basic_site() -> SiteDataset {
        SiteDataset::new(3)
            .with("Fc", vec![1.0, -9999.0, 3.0])
            .with("Fsd", vec![0.0, 0.0, 500.0])
            .with("ustar", vec![0.1, 0.2, 0.3])
    }

    #[test]
    fn test_sentinel_becomes_missing() {
        let table = DataPreparer::new()
            .prepare(&basic_site(), GridCell::default())
            .unwrap();

        let fluxes: Vec<Option<f64>> = table.observations.iter().map(|o| o.flux).collect();
        assert_eq!(fluxes, vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(table.stats.sentinel_values, 1);
        assert!(table
            .observations
            .iter()
            .all(|o| o.flux != Some(-9999.0) && o.flux != Some(0.0)));
    }

    #[test]
    fn test_optional_columns_dropped_when_absent() {
        let table = DataPreparer::new()
            .prepare(&basic_site(), GridCell::default())
            .unwrap();

        assert!(!table.has_storage);
        assert!(!table.has_temperature);
        assert!(table.observations.iter().all(|o| o.storage.is_none()));
    }

    #[test]
    fn test_optional_columns_kept_when_present() {
        let site = basic_site()
            .with("Fc_storage", vec![0.5, 0.5, 0.5])
            .with("Ta", vec![12.0, 11.5, 11.0]);
        let table = DataPreparer::new().prepare(&site, GridCell::default()).unwrap();

        assert!(table.has_storage);
        assert!(table.has_temperature);
        assert_eq!(table.observations[2].temperature, Some(11.0));
    }

    #[test]
    fn test_missing_required_variable() {
        let site = SiteDataset::new(2)
            .with("Fc", vec![1.0, 2.0])
            .with("ustar", vec![0.1, 0.2]);
        let err = DataPreparer::new()
            .prepare(&site, GridCell::default())
            .unwrap_err();

        match err {
            ProcessingError::MissingVariable { key, name } => {
                assert_eq!(key, "insolation_name");
                assert_eq!(name, "Fsd");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mapping_renames_to_canonical_columns() {
        let site = SiteDataset::new(2)
            .with("NEE", vec![4.0, 5.0])
            .with("Rg", vec![1.0, 2.0])
            .with("u_star", vec![0.4, 0.5]);
        let mapping: HashMap<String, String> = [
            ("flux_name", "NEE"),
            ("insolation_name", "Rg"),
            ("friction_velocity_name", "u_star"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let table = DataPreparer::from_mapping(&mapping)
            .unwrap()
            .prepare(&site, GridCell::default())
            .unwrap();

        assert_eq!(table.observations[1].flux, Some(5.0));
        assert_eq!(table.observations[1].insolation, Some(2.0));
        assert_eq!(table.observations[1].friction_velocity, Some(0.5));
    }

    #[test]
    fn test_unknown_mapping_key() {
        let mapping: HashMap<String, String> =
            [("sensible_heat_name".to_string(), "Fh".to_string())].into_iter().collect();
        assert!(matches!(
            DataPreparer::from_mapping(&mapping),
            Err(ProcessingError::InvalidMapping { .. })
        ));
    }

    #[test]
    fn test_duplicate_timestamps_keep_first() {
        let data = "\
time,Fc,Fsd,ustar
2017-01-01 00:00,1.0,0,0.1
2017-01-01 00:30,2.0,0,0.2
2017-01-01 00:00,9.0,0,0.9
2017-01-01 01:00,3.0,0,0.3
";
        let dataset = CsvDataset::from_reader(data.as_bytes()).unwrap();
        let table = DataPreparer::new()
            .prepare(&dataset, GridCell::default())
            .unwrap();

        let fluxes: Vec<Option<f64>> = table.observations.iter().map(|o| o.flux).collect();
        assert_eq!(fluxes, vec![Some(1.0), Some(2.0), Some(3.0)]);
        assert_eq!(table.stats.duplicate_rows, 1);
        assert_eq!(table.stats.raw_rows, 4);
    }

    #[test]
    fn test_cell_out_of_range() {
        let err = DataPreparer::new()
            .prepare(&basic_site(), GridCell::new(0, 1))
            .unwrap_err();
        assert!(matches!(err, ProcessingError::GridCellOutOfRange { .. }));
    }

    #[test]
    fn test_prepare_is_repeatable() {
        let preparer = DataPreparer::new();
        let site = basic_site();
        let first = preparer.prepare(&site, GridCell::default()).unwrap();
        let second = preparer.prepare(&site, GridCell::default()).unwrap();
        assert_eq!(first, second);
    }
}
