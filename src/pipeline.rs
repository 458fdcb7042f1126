use crate::error::Result;
use crate::models::{BinnedMeans, ObservationTable};
use crate::processors::{Aggregator, DataPreparer};
use crate::readers::{GridCell, GriddedDataset};
use crate::settings::Settings;
use crate::writers::UstarChart;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Everything one diagnostic run produces
#[derive(Debug, Clone)]
pub struct UstarDiagnostic {
    pub table: ObservationTable,
    pub means: BinnedMeans,
    pub chart: UstarChart,
}

impl UstarDiagnostic {
    pub fn into_parts(self) -> (ObservationTable, BinnedMeans, UstarChart) {
        (self.table, self.means, self.chart)
    }
}

/// Load, filter, bin and chart one grid cell of a flux dataset
#[derive(Debug, Clone, Default)]
pub struct UstarPipeline {
    preparer: DataPreparer,
    aggregator: Aggregator,
    ustar_threshold: Option<f64>,
    cell: GridCell,
}

impl UstarPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            preparer: DataPreparer::from_mapping(&settings.variables)?,
            aggregator: Aggregator::from_config(&settings.analysis),
            ustar_threshold: settings.analysis.ustar_threshold,
            cell: settings.grid,
        })
    }

    pub fn with_mapping(mut self, mapping: &HashMap<String, String>) -> Result<Self> {
        self.preparer = DataPreparer::from_mapping(mapping)?;
        Ok(self)
    }

    pub fn with_num_cats(mut self, num_cats: usize) -> Self {
        self.aggregator = self.aggregator.with_num_cats(num_cats);
        self
    }

    pub fn with_light_threshold(mut self, light_threshold: f64) -> Self {
        self.aggregator = self.aggregator.with_light_threshold(light_threshold);
        self
    }

    pub fn with_ustar_threshold(mut self, threshold: Option<f64>) -> Self {
        self.ustar_threshold = threshold;
        self
    }

    pub fn with_cell(mut self, cell: GridCell) -> Self {
        self.cell = cell;
        self
    }

    pub fn preparer(&self) -> &DataPreparer {
        &self.preparer
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn cell(&self) -> GridCell {
        self.cell
    }

    pub fn run(&self, path: &Path) -> Result<UstarDiagnostic> {
        let table = self.preparer.prepare_file(path, self.cell)?;
        let mut diagnostic = self.finish(table)?;
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            diagnostic.chart = diagnostic.chart.with_title(stem);
        }
        Ok(diagnostic)
    }

    pub fn run_dataset(&self, dataset: &dyn GriddedDataset) -> Result<UstarDiagnostic> {
        let table = self.preparer.prepare(dataset, self.cell)?;
        self.finish(table)
    }

    fn finish(&self, table: ObservationTable) -> Result<UstarDiagnostic> {
        let means = self.aggregator.aggregate(&table)?;
        let chart = UstarChart::from_means(&means).with_threshold(self.ustar_threshold);
        info!(
            "{} observations reduced to {} u* bins",
            table.len(),
            means.len()
        );

        Ok(UstarDiagnostic {
            table,
            means,
            chart,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessingError;
    use crate::readers::CsvDataset;
    use crate::writers::chart::{APPARENT_LABEL, FLUX_LABEL, STORAGE_LABEL};

    fn site_csv(with_storage: bool) -> String {
        let mut csv = String::from("time,Fc,Fsd,ustar");
        if with_storage {
            csv.push_str(",Fc_storage");
        }
        csv.push('\n');
        for i in 0..40 {
            let hour = i / 2;
            let minute = (i % 2) * 30;
            let fsd = if (6..18).contains(&hour) { 500.0 } else { 0.0 };
            csv.push_str(&format!(
                "2017-06-01 {:02}:{:02},{},{},{}",
                hour,
                minute,
                i as f64 * 0.1,
                fsd,
                0.01 * (i + 1) as f64
            ));
            if with_storage {
                csv.push_str(",0.5");
            }
            csv.push('\n');
        }
        csv
    }

    #[test]
    fn test_run_dataset_with_storage() {
        let dataset = CsvDataset::from_reader(site_csv(true).as_bytes()).unwrap();
        let diagnostic = UstarPipeline::new()
            .with_num_cats(4)
            .with_ustar_threshold(Some(0.2))
            .run_dataset(&dataset)
            .unwrap();

        // 00:00-05:30 and 18:00-19:30
        assert_eq!(diagnostic.means.nighttime_rows, 16);
        assert_eq!(diagnostic.means.len(), 4);
        assert_eq!(diagnostic.chart.threshold(), Some(0.2));

        let labels: Vec<_> = diagnostic.chart.series().iter().map(|s| s.label).collect();
        assert_eq!(labels, vec![FLUX_LABEL, STORAGE_LABEL, APPARENT_LABEL]);
    }

    #[test]
    fn test_run_dataset_without_storage() {
        let dataset = CsvDataset::from_reader(site_csv(false).as_bytes()).unwrap();
        let (table, means, chart) = UstarPipeline::new()
            .with_num_cats(4)
            .run_dataset(&dataset)
            .unwrap()
            .into_parts();

        assert!(!table.has_storage);
        assert!(!means.has_storage);
        assert_eq!(chart.series().len(), 1);
    }

    #[test]
    fn test_settings_drive_pipeline() {
        let mut settings = Settings::default();
        settings.analysis.num_cats = 2;
        settings.analysis.ustar_threshold = Some(0.1);
        settings
            .variables
            .insert("flux_name".to_string(), "Fc".to_string());

        let pipeline = UstarPipeline::from_settings(&settings).unwrap();
        assert_eq!(pipeline.aggregator().num_cats(), 2);
        assert_eq!(pipeline.cell(), GridCell::new(0, 0));

        settings
            .variables
            .insert("co2_name".to_string(), "Fc".to_string());
        assert!(matches!(
            UstarPipeline::from_settings(&settings),
            Err(ProcessingError::InvalidMapping { .. })
        ));
    }
}
