use serde::{Deserialize, Serialize};

/// Per-bin arithmetic means of the nighttime, complete observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinMean {
    /// Quantile bin label, 1-based
    pub bin: usize,
    pub count: usize,
    pub flux: f64,
    pub storage: Option<f64>,
    pub friction_velocity: f64,
    pub temperature: Option<f64>,
}

impl BinMean {
    /// Turbulent flux plus storage, an estimate of net ecosystem exchange
    pub fn apparent_flux(&self) -> Option<f64> {
        self.storage.map(|s| self.flux + s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinnedMeans {
    pub bins: Vec<BinMean>,
    pub has_storage: bool,
    pub has_temperature: bool,
    pub num_cats: usize,
    pub light_threshold: f64,
    /// Quantile edges of friction velocity, `num_cats + 1` values
    pub edges: Vec<f64>,
    pub nighttime_rows: usize,
    pub complete_rows: usize,
}

impl BinnedMeans {
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn get(&self, bin: usize) -> Option<&BinMean> {
        self.bins.iter().find(|b| b.bin == bin)
    }

    pub fn friction_velocity_range(&self) -> Option<(f64, f64)> {
        min_max(self.bins.iter().map(|b| b.friction_velocity))
    }

    /// Range over every flux-like series that would be drawn on the primary axis
    pub fn flux_range(&self) -> Option<(f64, f64)> {
        min_max(self.bins.iter().flat_map(|b| {
            [Some(b.flux), b.storage, b.apparent_flux()]
                .into_iter()
                .flatten()
        }))
    }

    pub fn temperature_range(&self) -> Option<(f64, f64)> {
        min_max(self.bins.iter().filter_map(|b| b.temperature))
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "u* Bin Means:\n  Bins: {} of {} requested\n  Light threshold: {} W m-2\n  Nighttime rows: {}\n  Complete rows used: {}\n",
            self.bins.len(),
            self.num_cats,
            self.light_threshold,
            self.nighttime_rows,
            self.complete_rows
        );

        summary.push_str(&format!(
            "\n  {:>4} {:>6} {:>9} {:>10}",
            "bin", "n", "u*", "Fc"
        ));
        if self.has_storage {
            summary.push_str(&format!(" {:>10} {:>10}", "Fc_storage", "NEE"));
        }
        if self.has_temperature {
            summary.push_str(&format!(" {:>8}", "Ta"));
        }
        summary.push('\n');

        for b in &self.bins {
            summary.push_str(&format!(
                "  {:>4} {:>6} {:>9.3} {:>10.3}",
                b.bin, b.count, b.friction_velocity, b.flux
            ));
            if let (Some(storage), Some(apparent)) = (b.storage, b.apparent_flux()) {
                summary.push_str(&format!(" {:>10.3} {:>10.3}", storage, apparent));
            }
            if let Some(ta) = b.temperature {
                summary.push_str(&format!(" {:>8.2}", ta));
            }
            summary.push('\n');
        }

        summary
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
