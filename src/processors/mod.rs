pub mod aggregator;
pub mod data_preparer;
pub mod integrity_checker;

pub use aggregator::{assign_bin, quantile_edges, Aggregator};
pub use data_preparer::DataPreparer;
pub use integrity_checker::{ColumnStatistics, IntegrityChecker, IntegrityReport};
