pub mod from_erp;
pub mod product_type;
pub mod repository;
