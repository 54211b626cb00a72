use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Партия с датой истечения срока годности
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiryLot {
    #[serde(rename = "lotId")]
    pub lot_id: i64,
    #[serde(rename = "expiryDate")]
    pub expiry_date: NaiveDate,
    pub quantity: i64,
    #[serde(rename = "productId")]
    pub product_id: i64,
}
