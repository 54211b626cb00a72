pub mod classification;
pub mod executor;
pub mod line_resolver;

pub use executor::SalesSyncExecutor;
