/// Default dataset variable names, one per canonical column
pub const DEFAULT_FLUX_NAME: &str = "Fc";
pub const DEFAULT_STORAGE_NAME: &str = "Fc_storage";
pub const DEFAULT_INSOLATION_NAME: &str = "Fsd";
pub const DEFAULT_FRICTION_VELOCITY_NAME: &str = "ustar";
pub const DEFAULT_TEMPERATURE_NAME: &str = "Ta";

/// Mapping keys accepted in a variable-name mapping
pub const FLUX_KEY: &str = "flux_name";
pub const STORAGE_KEY: &str = "storage_name";
pub const INSOLATION_KEY: &str = "insolation_name";
pub const FRICTION_VELOCITY_KEY: &str = "friction_velocity_name";
pub const TEMPERATURE_KEY: &str = "temperature_name";

/// Fill value used by flux-tower processing chains for missing data
pub const MISSING_VALUE_SENTINEL: f64 = -9999.0;

/// Analysis defaults
pub const DEFAULT_NUM_CATS: usize = 30;
pub const DEFAULT_LIGHT_THRESHOLD: f64 = 10.0; // W m-2

/// Coordinate and dimension names recognised in gridded inputs
pub const TIME_NAMES: [&str; 2] = ["time", "Time"];
pub const LATITUDE_NAMES: [&str; 2] = ["latitude", "lat"];
pub const LONGITUDE_NAMES: [&str; 2] = ["longitude", "lon"];

/// Input file extensions
pub const NETCDF_EXTENSIONS: [&str; 4] = ["nc", "nc4", "cdf", "netcdf"];
pub const CSV_EXTENSION: &str = "csv";

/// Chart defaults
pub const DEFAULT_CHART_WIDTH: u32 = 1200;
pub const DEFAULT_CHART_HEIGHT: u32 = 800;

/// Parquet defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
