use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ustar-diagnostics")]
#[command(about = "Friction-velocity (u*) threshold diagnostics for flux-tower CO2 data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bin nighttime fluxes by u* quantile and draw the diagnostic chart
    Plot {
        #[command(flatten)]
        analysis: AnalysisArgs,

        #[arg(
            short,
            long,
            help = "Output SVG file path [default: output/ustar-{stem}-{YYMMDD}.svg]"
        )]
        output_file: Option<PathBuf>,

        #[arg(long, help = "Draw a vertical reference line at this u* (m s-1)")]
        ustar_threshold: Option<f64>,

        #[arg(long, help = "Chart width in pixels")]
        width: Option<u32>,

        #[arg(long, help = "Chart height in pixels")]
        height: Option<u32>,
    },

    /// Print or export the per-bin means behind the chart
    Bins {
        #[command(flatten)]
        analysis: AnalysisArgs,

        #[arg(short, long, help = "Output file for csv or parquet export")]
        output_file: Option<PathBuf>,

        #[arg(
            short,
            long,
            value_enum,
            help = "Output format [default: from output file extension, else table]"
        )]
        format: Option<OutputFormat>,

        #[arg(short, long, default_value = "snappy")]
        compression: String,
    },

    /// List dataset variables and report completeness of the canonical columns
    Inspect {
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
}

/// Input selection and binning parameters shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct AnalysisArgs {
    #[arg(short, long = "input", help = "Input dataset (.nc, .nc4 or .csv)")]
    pub input: PathBuf,

    #[arg(long, help = "Settings file (TOML)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Number of u* quantile bins [default: 30]")]
    pub num_cats: Option<usize>,

    #[arg(long, help = "Insolation below which a row is nighttime, W m-2 [default: 10]")]
    pub light_threshold: Option<f64>,

    #[arg(
        long = "var",
        value_name = "KEY=NAME",
        value_parser = parse_key_val,
        help = "Rename a dataset variable, e.g. --var flux_name=NEE"
    )]
    pub variables: Vec<(String, String)>,

    #[arg(long, help = "Latitude index of the grid cell [default: 0]")]
    pub lat_index: Option<usize>,

    #[arg(long, help = "Longitude index of the grid cell [default: 0]")]
    pub lon_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Parquet,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=NAME, got '{}'", s))?;
    if key.trim().is_empty() || value.trim().is_empty() {
        return Err(format!("expected KEY=NAME, got '{}'", s));
    }
    Ok((key.trim().to_string(), value.trim().to_string()))
}
