pub mod executor;

pub use executor::ProductSyncExecutor;
