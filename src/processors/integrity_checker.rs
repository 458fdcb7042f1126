use crate::models::{CanonicalVariable, ObservationTable};
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub total_records: usize,
    pub raw_records: usize,
    pub duplicate_records: usize,
    pub sentinel_values: usize,
    pub nighttime_records: usize,
    pub complete_nighttime_records: usize,
    pub time_range: Option<(NaiveDateTime, NaiveDateTime)>,
    pub column_statistics: Vec<ColumnStatistics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnStatistics {
    pub variable: CanonicalVariable,
    pub present: bool,
    pub missing_records: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

impl ColumnStatistics {
    pub fn missing_percentage(&self, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            100.0 * self.missing_records as f64 / total as f64
        }
    }
}

pub struct IntegrityChecker {
    light_threshold: f64,
}

impl IntegrityChecker {
    pub fn new(light_threshold: f64) -> Self {
        Self { light_threshold }
    }

    /// Check completeness of a prepared table
    pub fn check_integrity(&self, table: &ObservationTable) -> IntegrityReport {
        let nighttime: Vec<_> = table
            .observations
            .iter()
            .filter(|o| o.is_nighttime(self.light_threshold))
            .collect();
        let complete_nighttime = nighttime.iter().filter(|o| table.is_complete(o)).count();

        let column_statistics = CanonicalVariable::ALL
            .into_iter()
            .map(|variable| self.column_statistics(table, variable))
            .collect();

        IntegrityReport {
            total_records: table.len(),
            raw_records: table.stats.raw_rows,
            duplicate_records: table.stats.duplicate_rows,
            sentinel_values: table.stats.sentinel_values,
            nighttime_records: nighttime.len(),
            complete_nighttime_records: complete_nighttime,
            time_range: table.time_range(),
            column_statistics,
        }
    }

    fn column_statistics(
        &self,
        table: &ObservationTable,
        variable: CanonicalVariable,
    ) -> ColumnStatistics {
        if !table.has_column(variable) {
            return ColumnStatistics {
                variable,
                present: false,
                missing_records: 0,
                min: None,
                max: None,
                mean: None,
            };
        }

        let values: Vec<f64> = table
            .observations
            .iter()
            .filter_map(|o| o.value(variable))
            .collect();

        let (min, max, mean) = if values.is_empty() {
            (None, None, None)
        } else {
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            (Some(min), Some(max), Some(mean))
        };

        ColumnStatistics {
            variable,
            present: true,
            missing_records: table.missing_count(variable),
            min,
            max,
            mean,
        }
    }

    /// Generate a summary report
    pub fn generate_summary(&self, report: &IntegrityReport) -> String {
        let mut summary = String::new();

        summary.push_str("=== Integrity Check Report ===\n");
        summary.push_str(&format!(
            "Records: {} ({} read, {} duplicate timestamps dropped)\n",
            report.total_records, report.raw_records, report.duplicate_records
        ));
        if let Some((start, end)) = report.time_range {
            summary.push_str(&format!("Time Range: {} to {}\n", start, end));
        }
        summary.push_str(&format!(
            "Fill values (-9999) replaced: {}\n",
            report.sentinel_values
        ));
        summary.push_str(&format!(
            "Nighttime Records (insolation < {}): {} ({} complete)\n",
            self.light_threshold, report.nighttime_records, report.complete_nighttime_records
        ));

        summary.push_str("\nColumns:\n");
        for column in &report.column_statistics {
            if !column.present {
                summary.push_str(&format!(
                    "  {:<24} not available\n",
                    column.variable.display_name()
                ));
                continue;
            }

            let range = match (column.min, column.max, column.mean) {
                (Some(min), Some(max), Some(mean)) => format!(
                    "{:.3} to {:.3}, mean {:.3} {}",
                    min,
                    max,
                    mean,
                    column.variable.units()
                ),
                _ => "no valid values".to_string(),
            };
            summary.push_str(&format!(
                "  {:<24} missing {} ({:.1}%), {}\n",
                column.variable.display_name(),
                column.missing_records,
                column.missing_percentage(report.total_records),
                range
            ));
        }

        summary
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new(crate::utils::constants::DEFAULT_LIGHT_THRESHOLD)
    }
}
