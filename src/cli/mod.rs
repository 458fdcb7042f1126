pub mod args;
pub mod commands;

pub use args::{AnalysisArgs, Cli, Commands, OutputFormat};
pub use commands::run;
