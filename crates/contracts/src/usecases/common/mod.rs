pub mod sync_result;

pub use sync_result::{SyncCounts, SyncResult};
