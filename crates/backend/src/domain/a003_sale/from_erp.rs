use crate::shared::error::SyncError;
use crate::shared::normalizer::{self, Reference};
use contracts::domain::a001_client::aggregate::Client;
use contracts::domain::a003_sale::aggregate::{MoveType, Sale};
use serde::Deserialize;
use serde_json::{json, Value};

pub const MOVE_MODEL: &str = "account.move";
pub const MOVE_FIELDS: &[&str] = &[
    "id",
    "name",
    "invoice_date",
    "partner_id",
    "move_type",
    "branch_id",
    "invoice_user_id",
    "amount_total_signed",
];

pub const LINE_MODEL: &str = "account.move.line";
pub const LINE_FIELDS: &[&str] = &[
    "id",
    "move_id",
    "product_id",
    "name",
    "quantity",
    "price_unit",
    "price_subtotal",
];

/// Проведенные счета и кредитные ноты клиентам
pub fn move_domain() -> Value {
    json!([
        ["move_type", "in", ["out_invoice", "out_refund"]],
        ["state", "=", "posted"]
    ])
}

/// Товарные строки указанных документов
pub fn line_domain(move_ids: &[i64]) -> Value {
    json!([
        ["move_id", "in", move_ids],
        ["display_type", "=", "product"]
    ])
}

/// Строка документа продажи в форме ответа ERP
#[derive(Debug, Clone, Deserialize)]
pub struct ErpSaleLineRecord {
    pub id: i64,
    #[serde(deserialize_with = "normalizer::reference", default)]
    pub move_id: Option<Reference>,
    #[serde(deserialize_with = "normalizer::reference", default)]
    pub product_id: Option<Reference>,
    #[serde(deserialize_with = "normalizer::text", default)]
    pub name: String,
    #[serde(deserialize_with = "normalizer::number", default)]
    pub quantity: f64,
    #[serde(deserialize_with = "normalizer::number", default)]
    pub price_unit: f64,
    #[serde(deserialize_with = "normalizer::number", default)]
    pub price_subtotal: f64,
}

/// Документ продажи в форме ответа ERP. Строки выгружаются отдельным запросом.
#[derive(Debug, Clone, Deserialize)]
pub struct ErpSaleRecord {
    #[serde(default)]
    pub id: i64,
    #[serde(deserialize_with = "normalizer::text", default)]
    pub name: String,
    #[serde(deserialize_with = "normalizer::text", default)]
    pub invoice_date: String,
    #[serde(deserialize_with = "normalizer::reference", default)]
    pub partner_id: Option<Reference>,
    pub move_type: MoveType,
    #[serde(deserialize_with = "normalizer::reference", default)]
    pub branch_id: Option<Reference>,
    #[serde(deserialize_with = "normalizer::reference", default)]
    pub invoice_user_id: Option<Reference>,
    #[serde(deserialize_with = "normalizer::number", default)]
    pub amount_total_signed: f64,
}

impl ErpSaleRecord {
    pub fn client_id(&self) -> Option<i64> {
        normalizer::id_of(&self.partner_id)
    }

    /// Продажа склада. Адрес доставки берется из карточки клиента:
    /// документ ERP собственного адреса не несет.
    pub fn to_sale(&self, client: &Client) -> Result<Sale, SyncError> {
        let date = normalizer::parse_date(&self.invoice_date).ok_or_else(|| {
            SyncError::record(&self.name, format!("invalid invoice date '{}'", self.invoice_date))
        })?;

        Ok(Sale {
            code: self.name.clone(),
            date,
            client_id: client.id,
            ship_city: client.city.clone(),
            ship_state: client.state.clone(),
            ship_country: client.country.clone(),
            business_unit: normalizer::label_of(&self.branch_id),
            salesperson: normalizer::label_of(&self.invoice_user_id),
            total_amount: self.amount_total_signed,
            customer_type_at_time: None,
        })
    }
}
