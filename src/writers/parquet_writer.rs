use crate::error::Result;
use crate::models::BinnedMeans;
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(parquet::basic::ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(crate::error::ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    /// Write the binned-mean table; optional columns follow the table's flags
    pub fn write_means(&self, means: &BinnedMeans, path: &Path) -> Result<()> {
        if means.is_empty() {
            return Ok(());
        }

        let schema = self.create_schema(means);
        let batch = self.means_to_batch(means, schema.clone())?;

        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        Ok(())
    }

    fn create_schema(&self, means: &BinnedMeans) -> Arc<Schema> {
        let mut fields = vec![
            Field::new("bin", DataType::UInt32, false),
            Field::new("count", DataType::UInt64, false),
            Field::new("friction_velocity", DataType::Float64, false),
            Field::new("flux", DataType::Float64, false),
        ];
        if means.has_storage {
            fields.push(Field::new("storage", DataType::Float64, true));
            fields.push(Field::new("apparent_flux", DataType::Float64, true));
        }
        if means.has_temperature {
            fields.push(Field::new("temperature", DataType::Float64, true));
        }

        Arc::new(Schema::new(fields))
    }

    fn means_to_batch(&self, means: &BinnedMeans, schema: Arc<Schema>) -> Result<RecordBatch> {
        let bins: Vec<u32> = means.bins.iter().map(|b| b.bin as u32).collect();
        let counts: Vec<u64> = means.bins.iter().map(|b| b.count as u64).collect();
        let ustar: Vec<f64> = means.bins.iter().map(|b| b.friction_velocity).collect();
        let flux: Vec<f64> = means.bins.iter().map(|b| b.flux).collect();

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(UInt32Array::from(bins)),
            Arc::new(UInt64Array::from(counts)),
            Arc::new(Float64Array::from(ustar)),
            Arc::new(Float64Array::from(flux)),
        ];

        if means.has_storage {
            let storage: Vec<Option<f64>> = means.bins.iter().map(|b| b.storage).collect();
            let apparent: Vec<Option<f64>> =
                means.bins.iter().map(|b| b.apparent_flux()).collect();
            columns.push(Arc::new(Float64Array::from(storage)));
            columns.push(Arc::new(Float64Array::from(apparent)));
        }
        if means.has_temperature {
            let temperature: Vec<Option<f64>> =
                means.bins.iter().map(|b| b.temperature).collect();
            columns.push(Arc::new(Float64Array::from(temperature)));
        }

        let batch = RecordBatch::try_new(schema, columns)?;
        Ok(batch)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let file_metadata = metadata.file_metadata();
        let row_groups = metadata.num_row_groups();
        let total_rows = file_metadata.num_rows();
        let file_size = std::fs::metadata(path)?.len();
        let columns = file_metadata
            .schema_descr()
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let mut row_group_sizes = Vec::new();
        for i in 0..row_groups {
            let rg_metadata = metadata.row_group(i);
            row_group_sizes.push(rg_metadata.num_rows());
        }

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            columns,
            compression: self.compression,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub columns: Vec<String>,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {} ({} rows each)\n\
            - Columns: {}\n\
            - File size: {:.2} KB\n\
            - Compression: {:?}",
            self.total_rows,
            self.row_groups,
            self.row_group_sizes
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join("/"),
            self.columns.join(", "),
            self.file_size as f64 / 1024.0,
            self.compression,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BinMean;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    fn means(has_storage: bool, has_temperature: bool) -> BinnedMeans {
        let bins = (1..=4)
            .map(|i| BinMean {
                bin: i,
                count: 25,
                flux: 2.0 * i as f64,
                storage: has_storage.then_some(0.25),
                friction_velocity: 0.1 * i as f64,
                temperature: has_temperature.then_some(8.0),
            })
            .collect();

        BinnedMeans {
            bins,
            has_storage,
            has_temperature,
            num_cats: 4,
            light_threshold: 10.0,
            edges: vec![0.0, 0.15, 0.25, 0.35, 0.45],
            nighttime_rows: 120,
            complete_rows: 100,
        }
    }

    #[test]
    fn test_write_empty_means() {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new().unwrap();

        let mut empty = means(false, false);
        empty.bins.clear();
        assert!(writer.write_means(&empty, temp_file.path()).is_ok());
    }

    #[test]
    fn test_columns_follow_optional_series() -> Result<()> {
        let writer = ParquetWriter::new();

        let temp_file = NamedTempFile::new()?;
        writer.write_means(&means(false, false), temp_file.path())?;
        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 4);
        assert_eq!(info.columns, vec!["bin", "count", "friction_velocity", "flux"]);

        let temp_file = NamedTempFile::new()?;
        writer.write_means(&means(true, true), temp_file.path())?;
        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(
            info.columns,
            vec![
                "bin",
                "count",
                "friction_velocity",
                "flux",
                "storage",
                "apparent_flux",
                "temperature"
            ]
        );
        assert_eq!(info.row_group_sizes, vec![4]);
        assert!(info.summary().contains("Total rows: 4"));
        assert!(info.summary().contains("Row groups: 1 (4 rows each)"));

        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        let compressions = ["snappy", "gzip", "lz4", "zstd", "none"];

        for compression in &compressions {
            let writer = ParquetWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new().unwrap();

            let result = writer.write_means(&means(true, false), temp_file.path());
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(ParquetWriter::new().with_compression("brotli9").is_err());
        Ok(())
    }
}
