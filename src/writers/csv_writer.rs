use crate::error::Result;
use crate::models::BinnedMeans;
use std::io::Write;
use std::path::Path;

/// Writes the binned-mean table as delimited text
pub struct CsvWriter {
    delimiter: u8,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn write_means(&self, means: &BinnedMeans, path: &Path) -> Result<()> {
        let writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)?;
        self.write_records(means, writer)
    }

    pub fn write_means_to<W: Write>(&self, means: &BinnedMeans, out: W) -> Result<()> {
        let writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(out);
        self.write_records(means, writer)
    }

    fn write_records<W: Write>(&self, means: &BinnedMeans, mut writer: csv::Writer<W>) -> Result<()> {
        let mut header = vec!["bin", "count", "friction_velocity", "flux"];
        if means.has_storage {
            header.extend(["storage", "apparent_flux"]);
        }
        if means.has_temperature {
            header.push("temperature");
        }
        writer.write_record(&header)?;

        let optional = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        for b in &means.bins {
            let mut record = vec![
                b.bin.to_string(),
                b.count.to_string(),
                b.friction_velocity.to_string(),
                b.flux.to_string(),
            ];
            if means.has_storage {
                record.push(optional(b.storage));
                record.push(optional(b.apparent_flux()));
            }
            if means.has_temperature {
                record.push(optional(b.temperature));
            }
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}
