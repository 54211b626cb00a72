pub mod from_erp;
pub mod line_repository;
pub mod repository;
