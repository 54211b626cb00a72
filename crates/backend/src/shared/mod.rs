pub mod ads_platform;
pub mod bulk;
pub mod config;
pub mod context;
pub mod data;
pub mod erp;
pub mod error;
pub mod identity_index;
pub mod normalizer;
pub mod sync_lock;
