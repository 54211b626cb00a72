pub mod executor;

pub use executor::ExpiryLotSyncExecutor;
