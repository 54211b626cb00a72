pub mod aggregation;
pub mod executor;

pub use executor::AdReportExecutor;
