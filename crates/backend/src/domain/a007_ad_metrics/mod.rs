pub mod from_platform;
pub mod range_cache_repository;
pub mod repository;
