use crate::error::{ProcessingError, Result};
use crate::models::{BinMean, BinnedMeans, Observation, ObservationTable};
use crate::settings::AnalysisConfig;
use crate::utils::constants::{DEFAULT_LIGHT_THRESHOLD, DEFAULT_NUM_CATS};
use tracing::{debug, info};

/// Nighttime filter, equal-frequency u* binning and per-bin means
#[derive(Debug, Clone)]
pub struct Aggregator {
    light_threshold: f64,
    num_cats: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            light_threshold: DEFAULT_LIGHT_THRESHOLD,
            num_cats: DEFAULT_NUM_CATS,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            light_threshold: config.light_threshold,
            num_cats: config.num_cats,
        }
    }

    pub fn with_light_threshold(mut self, light_threshold: f64) -> Self {
        self.light_threshold = light_threshold;
        self
    }

    pub fn with_num_cats(mut self, num_cats: usize) -> Self {
        self.num_cats = num_cats;
        self
    }

    pub fn light_threshold(&self) -> f64 {
        self.light_threshold
    }

    pub fn num_cats(&self) -> usize {
        self.num_cats
    }

    /// Rows with insolation strictly below the light threshold
    pub fn nighttime<'a>(&self, table: &'a ObservationTable) -> Vec<&'a Observation> {
        table
            .observations
            .iter()
            .filter(|o| o.is_nighttime(self.light_threshold))
            .collect()
    }

    pub fn aggregate(&self, table: &ObservationTable) -> Result<BinnedMeans> {
        self.validate()?;

        let nighttime = self.nighttime(table);
        let complete: Vec<&Observation> = nighttime
            .iter()
            .copied()
            .filter(|o| table.is_complete(o))
            .collect();

        debug!(
            "{} of {} rows are nighttime, {} of those complete",
            nighttime.len(),
            table.len(),
            complete.len()
        );

        if complete.is_empty() {
            return Err(ProcessingError::MissingData(format!(
                "No complete nighttime observations (insolation < {})",
                self.light_threshold
            )));
        }

        let ustar: Vec<f64> = complete
            .iter()
            .filter_map(|o| o.friction_velocity)
            .collect();
        let edges = quantile_edges(&ustar, self.num_cats)?;
        debug!("u* quantile edges: {:?}", edges);

        let mut accumulators = vec![BinAccumulator::default(); self.num_cats];
        for observation in &complete {
            if let Some(u) = observation.friction_velocity {
                accumulators[assign_bin(&edges, u) - 1].add(observation);
            }
        }

        let bins: Vec<BinMean> = accumulators
            .iter()
            .enumerate()
            .filter_map(|(i, acc)| acc.mean(i + 1, table.has_storage, table.has_temperature))
            .collect();

        info!(
            "Binned {} nighttime observations into {} u* classes",
            complete.len(),
            bins.len()
        );

        Ok(BinnedMeans {
            bins,
            has_storage: table.has_storage,
            has_temperature: table.has_temperature,
            num_cats: self.num_cats,
            light_threshold: self.light_threshold,
            edges,
            nighttime_rows: nighttime.len(),
            complete_rows: complete.len(),
        })
    }

    fn validate(&self) -> Result<()> {
        if self.num_cats == 0 {
            return Err(ProcessingError::InvalidParameter(
                "num_cats must be at least 1".to_string(),
            ));
        }
        if !self.light_threshold.is_finite() {
            return Err(ProcessingError::InvalidParameter(format!(
                "light_threshold must be finite, got {}",
                self.light_threshold
            )));
        }
        Ok(())
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Equal-frequency bin edges: `num_cats + 1` quantiles at `i / num_cats`.
///
/// Quantiles interpolate linearly between order statistics. Repeated edges
/// cannot delimit distinct bins and are rejected.
pub fn quantile_edges(values: &[f64], num_cats: usize) -> Result<Vec<f64>> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Err(ProcessingError::MissingData(
            "No friction velocity values to bin".to_string(),
        ));
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let distinct = |sorted: &[f64]| {
        let mut unique = sorted.to_vec();
        unique.dedup();
        unique.len()
    };

    // More bins than observations cannot be equal-frequency
    if num_cats > sorted.len() {
        return Err(ProcessingError::DegenerateBinning {
            num_cats,
            distinct: distinct(&sorted),
        });
    }

    let last = (sorted.len() - 1) as f64;
    let edges: Vec<f64> = (0..=num_cats)
        .map(|i| {
            let position = last * i as f64 / num_cats as f64;
            let lower = position.floor() as usize;
            let upper = position.ceil() as usize;
            let fraction = position - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
        })
        .collect();

    if edges.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ProcessingError::DegenerateBinning {
            num_cats,
            distinct: distinct(&sorted),
        });
    }

    Ok(edges)
}

/// 1-based bin of `value` in right-closed intervals; the first bin includes its lower edge
pub fn assign_bin(edges: &[f64], value: f64) -> usize {
    let upper_edges = &edges[1..];
    let idx = upper_edges.partition_point(|e| *e < value);
    idx.min(upper_edges.len() - 1) + 1
}

#[derive(Debug, Clone, Default)]
struct BinAccumulator {
    count: usize,
    flux: f64,
    storage: f64,
    friction_velocity: f64,
    temperature: f64,
}

impl BinAccumulator {
    fn add(&mut self, observation: &Observation) {
        self.count += 1;
        self.flux += observation.flux.unwrap_or_default();
        self.storage += observation.storage.unwrap_or_default();
        self.friction_velocity += observation.friction_velocity.unwrap_or_default();
        self.temperature += observation.temperature.unwrap_or_default();
    }

    fn mean(&self, bin: usize, has_storage: bool, has_temperature: bool) -> Option<BinMean> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(BinMean {
            bin,
            count: self.count,
            flux: self.flux / n,
            storage: has_storage.then(|| self.storage / n),
            friction_velocity: self.friction_velocity / n,
            temperature: has_temperature.then(|| self.temperature / n),
        })
    }
}
