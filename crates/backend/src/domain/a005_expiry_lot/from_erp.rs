use crate::shared::error::SyncError;
use crate::shared::normalizer::{self, Reference};
use chrono::NaiveDate;
use contracts::domain::a005_expiry_lot::aggregate::ExpiryLot;
use serde::Deserialize;
use serde_json::{json, Value};

pub const MODEL: &str = "stock.lot";
pub const FIELDS: &[&str] = &["id", "name", "product_id", "product_qty"];

pub fn domain() -> Value {
    json!([["product_qty", ">", 0]])
}

// en dash, em dash, non-breaking hyphen
const DASH_VARIANTS: [char; 3] = ['\u{2013}', '\u{2014}', '\u{2011}'];

/// Имя партии хранит дату истечения в виде `dd-mm-yyyy`
pub fn parse_expiry_name(name: &str) -> Option<NaiveDate> {
    let normalized: String = name
        .trim()
        .chars()
        .map(|c| if DASH_VARIANTS.contains(&c) { '-' } else { c })
        .collect();
    NaiveDate::parse_from_str(&normalized, "%d-%m-%Y").ok()
}

/// Партия в форме ответа ERP
#[derive(Debug, Clone, Deserialize)]
pub struct ErpLotRecord {
    pub id: i64,
    #[serde(deserialize_with = "normalizer::text", default)]
    pub name: String,
    #[serde(deserialize_with = "normalizer::reference", default)]
    pub product_id: Option<Reference>,
    #[serde(deserialize_with = "normalizer::number", default)]
    pub product_qty: f64,
}

impl ErpLotRecord {
    /// `product_temporary_id`: товар склада, к которому привязана партия
    pub fn to_lot(&self, product_temporary_id: i64) -> Result<ExpiryLot, SyncError> {
        let expiry_date = parse_expiry_name(&self.name).ok_or_else(|| {
            SyncError::record(self.id, format!("lot name '{}' is not a dd-mm-yyyy date", self.name))
        })?;
        Ok(ExpiryLot {
            lot_id: self.id,
            expiry_date,
            quantity: self.product_qty.round() as i64,
            product_id: product_temporary_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_variants_are_normalized() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 31);
        assert_eq!(parse_expiry_name("31-03-2026"), expected);
        assert_eq!(parse_expiry_name(" 31\u{2013}03\u{2014}2026 "), expected);
        assert_eq!(parse_expiry_name("31\u{2011}03\u{2011}2026"), expected);
    }

    #[test]
    fn non_date_names_are_rejected() {
        assert_eq!(parse_expiry_name("LOTE-A1"), None);
        assert_eq!(parse_expiry_name("2026-03-31"), None);
        assert_eq!(parse_expiry_name("31/03/2026"), None);
    }

    #[test]
    fn lot_keeps_rounded_quantity() {
        let record: ErpLotRecord = serde_json::from_value(json!({
            "id": 5,
            "name": "01-12-2025",
            "product_id": [901, "Crema"],
            "product_qty": 24.0
        }))
        .unwrap();
        let lot = record.to_lot(501).unwrap();
        assert_eq!(lot.quantity, 24);
        assert_eq!(lot.product_id, 501);
    }
}
