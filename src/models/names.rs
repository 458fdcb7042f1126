use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{ProcessingError, Result};
use crate::utils::constants::*;

/// Internal column vocabulary every dataset is mapped onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalVariable {
    Flux,
    Storage,
    Insolation,
    FrictionVelocity,
    Temperature,
}

impl CanonicalVariable {
    pub const ALL: [CanonicalVariable; 5] = [
        CanonicalVariable::Flux,
        CanonicalVariable::Storage,
        CanonicalVariable::Insolation,
        CanonicalVariable::FrictionVelocity,
        CanonicalVariable::Temperature,
    ];

    /// Key used for this variable in a name mapping
    pub fn key(&self) -> &'static str {
        match self {
            CanonicalVariable::Flux => FLUX_KEY,
            CanonicalVariable::Storage => STORAGE_KEY,
            CanonicalVariable::Insolation => INSOLATION_KEY,
            CanonicalVariable::FrictionVelocity => FRICTION_VELOCITY_KEY,
            CanonicalVariable::Temperature => TEMPERATURE_KEY,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.key() == key)
    }

    /// Optional variables are dropped, not rejected, when a dataset lacks them
    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            CanonicalVariable::Storage | CanonicalVariable::Temperature
        )
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CanonicalVariable::Flux => "CO2 flux",
            CanonicalVariable::Storage => "CO2 storage flux",
            CanonicalVariable::Insolation => "Incoming shortwave radiation",
            CanonicalVariable::FrictionVelocity => "Friction velocity",
            CanonicalVariable::Temperature => "Air temperature",
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            CanonicalVariable::Flux | CanonicalVariable::Storage => "umol m-2 s-1",
            CanonicalVariable::Insolation => "W m-2",
            CanonicalVariable::FrictionVelocity => "m s-1",
            CanonicalVariable::Temperature => "degC",
        }
    }
}

impl fmt::Display for CanonicalVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Default dataset names for each canonical variable.
pub const DEFAULT_NAMES: DefaultNames = DefaultNames {
    flux: DEFAULT_FLUX_NAME,
    storage: DEFAULT_STORAGE_NAME,
    insolation: DEFAULT_INSOLATION_NAME,
    friction_velocity: DEFAULT_FRICTION_VELOCITY_NAME,
    temperature: DEFAULT_TEMPERATURE_NAME,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultNames {
    pub flux: &'static str,
    pub storage: &'static str,
    pub insolation: &'static str,
    pub friction_velocity: &'static str,
    pub temperature: &'static str,
}

impl DefaultNames {
    pub fn get(&self, variable: CanonicalVariable) -> &'static str {
        match variable {
            CanonicalVariable::Flux => self.flux,
            CanonicalVariable::Storage => self.storage,
            CanonicalVariable::Insolation => self.insolation,
            CanonicalVariable::FrictionVelocity => self.friction_velocity,
            CanonicalVariable::Temperature => self.temperature,
        }
    }
}

/// Dataset-specific names resolved for each canonical variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableNames {
    pub flux: String,
    pub storage: String,
    pub insolation: String,
    pub friction_velocity: String,
    pub temperature: String,
}

impl Default for VariableNames {
    fn default() -> Self {
        Self {
            flux: DEFAULT_NAMES.flux.to_string(),
            storage: DEFAULT_NAMES.storage.to_string(),
            insolation: DEFAULT_NAMES.insolation.to_string(),
            friction_velocity: DEFAULT_NAMES.friction_velocity.to_string(),
            temperature: DEFAULT_NAMES.temperature.to_string(),
        }
    }
}

impl VariableNames {
    /// Overlay a `key -> dataset name` mapping on the defaults.
    ///
    /// Every key must be one of the canonical mapping keys; all unknown keys
    /// are reported together.
    pub fn from_mapping(mapping: &HashMap<String, String>) -> Result<Self> {
        let mut unknown: Vec<String> = mapping
            .keys()
            .filter(|k| CanonicalVariable::from_key(k).is_none())
            .cloned()
            .collect();

        if !unknown.is_empty() {
            unknown.sort();
            return Err(ProcessingError::InvalidMapping { keys: unknown });
        }

        let mut names = Self::default();
        for (key, name) in mapping {
            if let Some(variable) = CanonicalVariable::from_key(key) {
                names.set(variable, name.clone());
            }
        }

        Ok(names)
    }

    pub fn get(&self, variable: CanonicalVariable) -> &str {
        match variable {
            CanonicalVariable::Flux => &self.flux,
            CanonicalVariable::Storage => &self.storage,
            CanonicalVariable::Insolation => &self.insolation,
            CanonicalVariable::FrictionVelocity => &self.friction_velocity,
            CanonicalVariable::Temperature => &self.temperature,
        }
    }

    pub fn set(&mut self, variable: CanonicalVariable, name: String) {
        match variable {
            CanonicalVariable::Flux => self.flux = name,
            CanonicalVariable::Storage => self.storage = name,
            CanonicalVariable::Insolation => self.insolation = name,
            CanonicalVariable::FrictionVelocity => self.friction_velocity = name,
            CanonicalVariable::Temperature => self.temperature = name,
        }
    }

    /// Mapping keys whose dataset name differs from the default
    pub fn overrides(&self) -> BTreeMap<&'static str, &str> {
        CanonicalVariable::ALL
            .into_iter()
            .filter(|v| self.get(*v) != DEFAULT_NAMES.get(*v))
            .map(|v| (v.key(), self.get(v)))
            .collect()
    }
}
