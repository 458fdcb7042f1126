use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Unrecognised variable mapping key(s): {}", keys.join(", "))]
    InvalidMapping { keys: Vec<String> },

    #[error("Variable '{name}' ({key}) not found in dataset")]
    MissingVariable { key: String, name: String },

    #[error(
        "Cannot split {distinct} distinct friction velocity value(s) into {num_cats} quantile bins: bin edges are not unique"
    )]
    DegenerateBinning { num_cats: usize, distinct: usize },

    #[error("Grid cell ({lat_index}, {lon_index}) outside {n_lat}x{n_lon} grid")]
    GridCellOutOfRange {
        lat_index: usize,
        lon_index: usize,
        n_lat: usize,
        n_lon: usize,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Support for {0} input is not enabled in this build")]
    FeatureDisabled(&'static str),

    #[error("Chart rendering error: {0}")]
    Plot(String),
}
