pub mod chart;
pub mod csv_writer;
pub mod parquet_writer;

pub use chart::{ChartSeries, Marker, SeriesAxis, UstarChart};
pub use csv_writer::CsvWriter;
pub use parquet_writer::{ParquetFileInfo, ParquetWriter};
