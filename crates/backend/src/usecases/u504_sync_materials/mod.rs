pub mod executor;

pub use executor::MaterialSyncExecutor;
