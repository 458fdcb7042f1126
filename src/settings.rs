use crate::error::Result;
use crate::readers::GridCell;
use crate::utils::constants::{DEFAULT_LIGHT_THRESHOLD, DEFAULT_NUM_CATS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use validator::Validate;

/// Binning and filtering parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AnalysisConfig {
    #[validate(range(min = 1))]
    pub num_cats: usize,

    pub light_threshold: f64,

    /// Only drawn on the chart; has no effect on binning
    pub ustar_threshold: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            num_cats: DEFAULT_NUM_CATS,
            light_threshold: DEFAULT_LIGHT_THRESHOLD,
            ustar_threshold: None,
        }
    }
}

/// Everything a run can be configured with, loaded from an optional TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub analysis: AnalysisConfig,
    pub grid: GridCell,
    /// Mapping key -> dataset variable name, e.g. `flux_name = "NEE"`
    pub variables: HashMap<String, String>,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.analysis.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.analysis.num_cats, 30);
        assert_eq!(settings.analysis.light_threshold, 10.0);
        assert_eq!(settings.grid, GridCell::new(0, 0));
        assert!(settings.variables.is_empty());
    }

    #[test]
    fn test_load_toml() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "[analysis]")?;
        writeln!(file, "num_cats = 12")?;
        writeln!(file, "ustar_threshold = 0.25")?;
        writeln!(file, "[grid]")?;
        writeln!(file, "lat_index = 1")?;
        writeln!(file, "lon_index = 0")?;
        writeln!(file, "[variables]")?;
        writeln!(file, "flux_name = \"NEE\"")?;

        let settings = Settings::load(Some(file.path()))?;
        assert_eq!(settings.analysis.num_cats, 12);
        assert_eq!(settings.analysis.light_threshold, 10.0);
        assert_eq!(settings.analysis.ustar_threshold, Some(0.25));
        assert_eq!(settings.grid, GridCell::new(1, 0));
        assert_eq!(settings.variables.get("flux_name").map(String::as_str), Some("NEE"));
        Ok(())
    }

    #[test]
    fn test_zero_bins_rejected() {
        let config = AnalysisConfig {
            num_cats: 0,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(AnalysisConfig::default().validate().is_ok());
    }
}
