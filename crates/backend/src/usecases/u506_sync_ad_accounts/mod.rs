pub mod executor;

pub use executor::AdAccountSyncExecutor;
