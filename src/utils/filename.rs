use chrono::{Datelike, Local};
use std::path::{Path, PathBuf};

/// Default chart filename: ustar-{stem}-{YYMMDD}.svg
pub fn generate_default_chart_filename(input: &Path) -> PathBuf {
    generate_default_filename(input, "svg")
}

/// Default export filename for the binned-mean table, e.g. ustar-{stem}-{YYMMDD}.parquet
pub fn generate_default_filename(input: &Path, extension: &str) -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100; // Get last 2 digits of year
    let month = now.month();
    let day = now.day();

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("dataset");

    let filename = format!(
        "ustar-{}-{:02}{:02}{:02}.{}",
        stem, year, month, day, extension
    );
    PathBuf::from("output").join(filename)
}
