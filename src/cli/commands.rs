use crate::cli::args::{AnalysisArgs, Cli, Commands, OutputFormat};
use crate::error::{ProcessingError, Result};
use crate::models::{BinnedMeans, CanonicalVariable};
use crate::pipeline::UstarPipeline;
use crate::processors::{DataPreparer, IntegrityChecker};
use crate::readers::open_dataset;
use crate::settings::Settings;
use crate::utils::filename::{generate_default_chart_filename, generate_default_filename};
use crate::utils::progress::ProgressReporter;
use crate::writers::{CsvWriter, ParquetWriter};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, Level};
use validator::Validate;

pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Plot {
            analysis,
            output_file,
            ustar_threshold,
            width,
            height,
        } => {
            let mut settings = resolve_settings(&analysis)?;
            if ustar_threshold.is_some() {
                settings.analysis.ustar_threshold = ustar_threshold;
            }

            let pipeline = UstarPipeline::from_settings(&settings)?;
            let progress = ProgressReporter::new_spinner(
                &format!("Loading {}...", analysis.input.display()),
                false,
            );
            let diagnostic = pipeline.run(&analysis.input)?;
            progress.finish_and_clear();

            let mut chart = diagnostic.chart;
            if let Some(width) = width {
                chart = chart.with_width(width);
            }
            if let Some(height) = height {
                chart = chart.with_height(height);
            }

            let output_file =
                output_file.unwrap_or_else(|| generate_default_chart_filename(&analysis.input));
            chart.save_svg(&output_file)?;

            println!("{}", diagnostic.means.summary());
            println!("Chart written to {}", output_file.display());
        }

        Commands::Bins {
            analysis,
            output_file,
            format,
            compression,
        } => {
            let settings = resolve_settings(&analysis)?;
            let format = format
                .or_else(|| output_file.as_deref().and_then(format_from_extension))
                .unwrap_or(OutputFormat::Table);

            let pipeline = UstarPipeline::from_settings(&settings)?;
            let progress = ProgressReporter::new_spinner(
                &format!("Loading {}...", analysis.input.display()),
                format == OutputFormat::Json,
            );
            let diagnostic = pipeline.run(&analysis.input)?;
            progress.finish_and_clear();
            export_means(
                &diagnostic.means,
                format,
                output_file,
                &analysis.input,
                &compression,
            )?;
        }

        Commands::Inspect { analysis } => {
            let settings = resolve_settings(&analysis)?;
            let preparer = DataPreparer::from_mapping(&settings.variables)?;

            println!("Inspecting dataset: {}", analysis.input.display());
            let dataset = open_dataset(&analysis.input)?;
            let shape = dataset.grid_shape();
            println!(
                "Grid: {} time steps x {} latitude x {} longitude",
                shape.n_time, shape.n_lat, shape.n_lon
            );

            let mut variables = dataset.variable_names();
            variables.sort();
            println!("Variables: {}", variables.join(", "));

            let overrides = preparer.names().overrides();
            if !overrides.is_empty() {
                let renamed: Vec<String> =
                    overrides.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                println!("Renamed: {}", renamed.join(", "));
            }

            println!("\nCanonical columns:");
            for variable in CanonicalVariable::ALL {
                let name = preparer.names().get(variable);
                let status = match (dataset.has_variable(name), variable.is_optional()) {
                    (true, _) => "found",
                    (false, true) => "absent (optional)",
                    (false, false) => "MISSING (required)",
                };
                println!("  {:<24} {:<12} {}", variable.key(), name, status);
            }

            let table = preparer.prepare(dataset.as_ref(), settings.grid)?;
            drop(dataset);

            let checker = IntegrityChecker::new(settings.analysis.light_threshold);
            let report = checker.check_integrity(&table);
            println!("\n{}", checker.generate_summary(&report));
        }
    }

    Ok(())
}

/// Settings file first, then command-line overrides
fn resolve_settings(args: &AnalysisArgs) -> Result<Settings> {
    let mut settings = Settings::load(args.config.as_deref())?;

    if let Some(num_cats) = args.num_cats {
        settings.analysis.num_cats = num_cats;
    }
    if let Some(light_threshold) = args.light_threshold {
        settings.analysis.light_threshold = light_threshold;
    }
    if let Some(lat_index) = args.lat_index {
        settings.grid.lat_index = lat_index;
    }
    if let Some(lon_index) = args.lon_index {
        settings.grid.lon_index = lon_index;
    }
    for (key, name) in &args.variables {
        settings.variables.insert(key.clone(), name.clone());
    }

    settings.analysis.validate()?;
    debug!("Resolved settings: {:?}", settings);
    Ok(settings)
}

/// Print the binned means, or write them when the format is a file format or `-o` is given
fn export_means(
    means: &BinnedMeans,
    format: OutputFormat,
    output_file: Option<PathBuf>,
    input: &Path,
    compression: &str,
) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", means.summary()),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(means)?;
            match output_file {
                Some(output_file) => {
                    let output_file = export_path(Some(output_file), input, "json")?;
                    std::fs::write(&output_file, json)?;
                    println!("Wrote {} bins to {}", means.len(), output_file.display());
                }
                None => println!("{}", json),
            }
        }
        OutputFormat::Csv => {
            let output_file = export_path(output_file, input, "csv")?;
            CsvWriter::new().write_means(means, &output_file)?;
            println!("Wrote {} bins to {}", means.len(), output_file.display());
        }
        OutputFormat::Parquet => {
            let output_file = export_path(output_file, input, "parquet")?;
            let writer = ParquetWriter::new().with_compression(compression)?;
            writer.write_means(means, &output_file)?;

            let file_info = writer.get_file_info(&output_file)?;
            println!("\n{}", file_info.summary());
        }
    }
    Ok(())
}

fn format_from_extension(path: &Path) -> Option<OutputFormat> {
    match path.extension()?.to_str()?.to_lowercase().as_str() {
        "csv" => Some(OutputFormat::Csv),
        "parquet" => Some(OutputFormat::Parquet),
        "json" => Some(OutputFormat::Json),
        _ => None,
    }
}

fn export_path(output_file: Option<PathBuf>, input: &Path, extension: &str) -> Result<PathBuf> {
    let output_file = output_file.unwrap_or_else(|| generate_default_filename(input, extension));
    if let Some(parent) = output_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(output_file)
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    let installed = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    installed.map_err(|e| ProcessingError::Config(format!("Failed to initialise logging: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BinMean;

    fn analysis_args() -> AnalysisArgs {
        AnalysisArgs {
            input: PathBuf::from("site.csv"),
            config: None,
            num_cats: Some(12),
            light_threshold: None,
            variables: vec![("flux_name".to_string(), "NEE".to_string())],
            lat_index: None,
            lon_index: Some(2),
        }
    }

    #[test]
    fn test_resolve_settings_applies_overrides() {
        let settings = resolve_settings(&analysis_args()).unwrap();
        assert_eq!(settings.analysis.num_cats, 12);
        assert_eq!(settings.analysis.light_threshold, 10.0);
        assert_eq!(settings.grid.lon_index, 2);
        assert_eq!(
            settings.variables.get("flux_name").map(String::as_str),
            Some("NEE")
        );
    }

    #[test]
    fn test_resolve_settings_rejects_zero_bins() {
        let mut args = analysis_args();
        args.num_cats = Some(0);
        assert!(matches!(
            resolve_settings(&args),
            Err(ProcessingError::Validation(_))
        ));
    }

    fn binned_means() -> BinnedMeans {
        BinnedMeans {
            bins: vec![BinMean {
                bin: 1,
                count: 4,
                flux: 2.5,
                storage: None,
                friction_velocity: 0.2,
                temperature: None,
            }],
            has_storage: false,
            has_temperature: false,
            num_cats: 1,
            light_threshold: 10.0,
            edges: vec![0.1, 0.3],
            nighttime_rows: 4,
            complete_rows: 4,
        }
    }

    #[test]
    fn test_json_export_written_to_output_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let output_file = dir.path().join("nested").join("bins.json");
        let format = format_from_extension(&output_file).unwrap();
        assert_eq!(format, OutputFormat::Json);

        export_means(
            &binned_means(),
            format,
            Some(output_file.clone()),
            Path::new("site.csv"),
            "snappy",
        )?;

        let written: BinnedMeans = serde_json::from_str(&std::fs::read_to_string(&output_file)?)?;
        assert_eq!(written, binned_means());
        Ok(())
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            format_from_extension(Path::new("bins.parquet")),
            Some(OutputFormat::Parquet)
        );
        assert_eq!(
            format_from_extension(Path::new("bins.CSV")),
            Some(OutputFormat::Csv)
        );
        assert_eq!(format_from_extension(Path::new("bins.svg")), None);
    }
}
