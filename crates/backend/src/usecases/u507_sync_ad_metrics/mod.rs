pub mod date_range_cache;
pub mod executor;

pub use date_range_cache::{DateRange, DateRangeCache};
pub use executor::AdMetricsSyncExecutor;
