pub use dataframe::{DataFrame, DataFrameError};
pub use driver::{discover_input, Driver, DriverError, Report};
pub use extract::{Aggregation, ExtractError, MetricExtractor, MetricTable};
pub use importance::{estimate, EstimateError, Importance, ImportanceOptions, Importances};
pub use random_forest::RandomForestOptions;
pub use report::{ImportanceRecord, ReportError};

pub mod dataframe;
pub mod driver;
pub mod extract;
pub mod folds;
pub mod importance;
pub mod report;

mod decision_tree;
mod functions;
mod random_forest;
mod table;
