pub mod constants;
pub mod filename;
pub mod progress;
pub mod time;

pub use constants::*;
pub use filename::{generate_default_chart_filename, generate_default_filename};
pub use progress::ProgressReporter;
pub use time::{parse_timestamp, TimeUnits};
