pub mod executor;

pub use executor::ClientSyncExecutor;
