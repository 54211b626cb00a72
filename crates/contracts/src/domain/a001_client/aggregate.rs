use serde::{Deserialize, Serialize};

/// Идентификатор клиента, присвоенный ERP
pub type ClientId = i64;

// ============================================================================
// Customer type
// ============================================================================

/// Классификация клиента по истории покупок
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerType {
    /// Менее двух подтвержденных продаж
    NewCustomer,
    /// Регулярный клиент
    Portfolio,
    /// Вернулся после длительного перерыва
    Recovered,
}

impl CustomerType {
    /// Метка, которая хранится в складе данных
    pub fn label(&self) -> &'static str {
        match self {
            CustomerType::NewCustomer => "Cliente Nuevo",
            CustomerType::Portfolio => "Cliente Cartera",
            CustomerType::Recovered => "Cliente Recuperado",
        }
    }

    /// Разбор хранимой метки. Короткая форма "Cartera" встречается в старых строках.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Cliente Nuevo" => Some(CustomerType::NewCustomer),
            "Cliente Cartera" | "Cartera" => Some(CustomerType::Portfolio),
            "Cliente Recuperado" | "Recuperado" => Some(CustomerType::Recovered),
            _ => None,
        }
    }
}

impl Default for CustomerType {
    fn default() -> Self {
        CustomerType::NewCustomer
    }
}

// ============================================================================
// Aggregate
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    #[serde(rename = "customerType")]
    pub customer_type: CustomerType,
    /// Количество подтвержденных счетов (не уменьшается)
    #[serde(rename = "transactionCount")]
    pub transaction_count: i64,
}

impl Client {
    /// Новый клиент всегда начинает как NewCustomer без транзакций
    pub fn new(id: ClientId, name: String, city: String, state: String, country: String) -> Self {
        Self {
            id,
            name,
            city,
            state,
            country,
            customer_type: CustomerType::NewCustomer,
            transaction_count: 0,
        }
    }

    /// Совпадают ли изменяемые поля профиля
    pub fn same_profile(&self, other: &Client) -> bool {
        self.name == other.name
            && self.city == other.city
            && self.state == other.state
            && self.country == other.country
    }

    /// Перезаписать изменяемые поля профиля. Классификация и счетчик не трогаются.
    pub fn apply_profile(&mut self, other: &Client) {
        self.name = other.name.clone();
        self.city = other.city.clone();
        self.state = other.state.clone();
        self.country = other.country.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_and_accept_short_form() {
        for t in [
            CustomerType::NewCustomer,
            CustomerType::Portfolio,
            CustomerType::Recovered,
        ] {
            assert_eq!(CustomerType::from_label(t.label()), Some(t));
        }
        assert_eq!(CustomerType::from_label("Cartera"), Some(CustomerType::Portfolio));
        assert_eq!(CustomerType::from_label("VIP"), None);
    }

    #[test]
    fn apply_profile_keeps_classification() {
        let mut stored = Client::new(7, "A".into(), "X".into(), "Y".into(), "Z".into());
        stored.customer_type = CustomerType::Recovered;
        stored.transaction_count = 5;

        let incoming = Client::new(7, "B".into(), "X".into(), "Y".into(), "Z".into());
        assert!(!stored.same_profile(&incoming));

        stored.apply_profile(&incoming);
        assert!(stored.same_profile(&incoming));
        assert_eq!(stored.customer_type, CustomerType::Recovered);
        assert_eq!(stored.transaction_count, 5);
    }
}
