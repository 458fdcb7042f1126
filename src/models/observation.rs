use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::CanonicalVariable;

/// One timestamp of flux-tower data at the selected grid cell.
///
/// `None` marks a missing value. Storage and temperature are always `None`
/// when the owning table lacks those columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub time: NaiveDateTime,
    pub flux: Option<f64>,
    pub storage: Option<f64>,
    pub insolation: Option<f64>,
    pub friction_velocity: Option<f64>,
    pub temperature: Option<f64>,
}

impl Observation {
    pub fn value(&self, variable: CanonicalVariable) -> Option<f64> {
        match variable {
            CanonicalVariable::Flux => self.flux,
            CanonicalVariable::Storage => self.storage,
            CanonicalVariable::Insolation => self.insolation,
            CanonicalVariable::FrictionVelocity => self.friction_velocity,
            CanonicalVariable::Temperature => self.temperature,
        }
    }

    /// Strictly below the threshold; missing insolation is never nighttime.
    pub fn is_nighttime(&self, light_threshold: f64) -> bool {
        matches!(self.insolation, Some(fsd) if fsd < light_threshold)
    }
}

/// Counters collected while a table was prepared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparationStats {
    pub raw_rows: usize,
    pub duplicate_rows: usize,
    pub sentinel_values: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationTable {
    pub observations: Vec<Observation>,
    pub has_storage: bool,
    pub has_temperature: bool,
    pub stats: PreparationStats,
}

impl ObservationTable {
    pub fn new(observations: Vec<Observation>, has_storage: bool, has_temperature: bool) -> Self {
        Self {
            observations,
            has_storage,
            has_temperature,
            stats: PreparationStats::default(),
        }
    }

    pub fn with_stats(mut self, stats: PreparationStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Canonical columns present in this table, in display order
    pub fn columns(&self) -> Vec<CanonicalVariable> {
        CanonicalVariable::ALL
            .into_iter()
            .filter(|v| self.has_column(*v))
            .collect()
    }

    pub fn has_column(&self, variable: CanonicalVariable) -> bool {
        match variable {
            CanonicalVariable::Storage => self.has_storage,
            CanonicalVariable::Temperature => self.has_temperature,
            _ => true,
        }
    }

    /// True when every column carried into binning has a value.
    ///
    /// Insolation is only used for the nighttime filter and is not checked.
    pub fn is_complete(&self, observation: &Observation) -> bool {
        observation.flux.is_some()
            && observation.friction_velocity.is_some()
            && (!self.has_storage || observation.storage.is_some())
            && (!self.has_temperature || observation.temperature.is_some())
    }

    pub fn missing_count(&self, variable: CanonicalVariable) -> usize {
        if !self.has_column(variable) {
            return 0;
        }
        self.observations
            .iter()
            .filter(|o| o.value(variable).is_none())
            .count()
    }

    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.observations.iter().map(|o| o.time).min()?;
        let last = self.observations.iter().map(|o| o.time).max()?;
        Some((first, last))
    }
}
