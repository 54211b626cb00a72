pub mod from_erp;
pub mod repository;
