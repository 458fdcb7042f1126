pub mod binned;
pub mod names;
pub mod observation;

pub use binned::{BinMean, BinnedMeans};
pub use names::{CanonicalVariable, DefaultNames, VariableNames, DEFAULT_NAMES};
pub use observation::{Observation, ObservationTable, PreparationStats};
