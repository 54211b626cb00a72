use crate::shared::normalizer::{self, Reference};
use contracts::domain::a001_client::aggregate::Client;
use serde::Deserialize;
use serde_json::{json, Value};

pub const MODEL: &str = "res.partner";
pub const FIELDS: &[&str] = &["id", "name", "city", "state_id", "country_id"];

/// Активные и архивные контрагенты, у которых есть продажи
pub fn domain() -> Value {
    json!([
        ["customer_rank", ">", 0],
        "|",
        ["active", "=", true],
        ["active", "=", false]
    ])
}

/// Контрагент в форме ответа ERP
#[derive(Debug, Clone, Deserialize)]
pub struct ErpClientRecord {
    pub id: i64,
    #[serde(deserialize_with = "normalizer::text", default)]
    pub name: String,
    #[serde(deserialize_with = "normalizer::text", default)]
    pub city: String,
    #[serde(deserialize_with = "normalizer::reference", default)]
    pub state_id: Option<Reference>,
    #[serde(deserialize_with = "normalizer::reference", default)]
    pub country_id: Option<Reference>,
}

impl ErpClientRecord {
    /// Новый клиент склада: штат и страна берутся из меток ссылок
    pub fn to_aggregate(&self) -> Client {
        Client::new(
            self.id,
            self.name.clone(),
            self.city.clone(),
            normalizer::label_of(&self.state_id),
            normalizer::label_of(&self.country_id),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::domain::a001_client::aggregate::CustomerType;

    #[test]
    fn false_fields_become_empty_strings() {
        let record: ErpClientRecord = serde_json::from_value(json!({
            "id": 42,
            "name": "Farmacia Centro",
            "city": false,
            "state_id": [14, "Jalisco"],
            "country_id": false
        }))
        .unwrap();

        let client = record.to_aggregate();
        assert_eq!(client.id, 42);
        assert_eq!(client.city, "");
        assert_eq!(client.state, "Jalisco");
        assert_eq!(client.country, "");
        assert_eq!(client.customer_type, CustomerType::NewCustomer);
        assert_eq!(client.transaction_count, 0);
    }
}
