pub mod a001_client;
pub mod a002_product;
pub mod a003_sale;
pub mod a004_material_component;
pub mod a005_expiry_lot;
pub mod a006_ad_account;
pub mod a007_ad_metrics;
