pub mod u501_sync_clients;
pub mod u502_sync_products;
pub mod u503_sync_sales;
pub mod u504_sync_materials;
pub mod u505_sync_expiry_lots;
pub mod u506_sync_ad_accounts;
pub mod u507_sync_ad_metrics;
pub mod u508_ad_report;
