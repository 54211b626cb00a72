use crate::domain::a001_client::aggregate::{ClientId, CustomerType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Префикс кода, которым ERP помечает кредитные ноты
pub const CREDIT_NOTE_PREFIX: char = 'R';

/// Вид документа продажи в ERP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveType {
    #[serde(rename = "out_invoice")]
    Invoice,
    #[serde(rename = "out_refund")]
    Refund,
}

/// Продажа (счет или кредитная нота)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub code: String,
    pub date: NaiveDate,
    #[serde(rename = "clientId")]
    pub client_id: ClientId,
    #[serde(rename = "shipCity")]
    pub ship_city: String,
    #[serde(rename = "shipState")]
    pub ship_state: String,
    #[serde(rename = "shipCountry")]
    pub ship_country: String,
    #[serde(rename = "businessUnit")]
    pub business_unit: String,
    pub salesperson: String,
    /// Со знаком: отрицательная сумма у кредитных нот
    #[serde(rename = "totalAmount")]
    pub total_amount: f64,
    /// Снимок классификации клиента на момент записи продажи
    #[serde(rename = "customerTypeAtTime")]
    pub customer_type_at_time: Option<CustomerType>,
}

impl Sale {
    pub fn is_credit_note(&self) -> bool {
        is_credit_note_code(&self.code)
    }
}

pub fn is_credit_note_code(code: &str) -> bool {
    code.starts_with(CREDIT_NOTE_PREFIX)
}

/// Строка продажи. Ссылка на товар может отсутствовать: такие строки
/// сохраняются с пустыми атрибутами товара.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleLine {
    pub id: Option<i64>,
    #[serde(rename = "saleCode")]
    pub sale_code: String,
    /// temporary_id найденного товара
    #[serde(rename = "productId")]
    pub product_id: Option<i64>,
    pub name: String,
    pub sku: String,
    pub brand: String,
    pub category: String,
    pub quantity: f64,
    #[serde(rename = "unitPrice")]
    pub unit_price: f64,
    pub subtotal: f64,
}
