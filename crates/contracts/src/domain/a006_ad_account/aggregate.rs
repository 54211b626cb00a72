use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Рекламный аккаунт
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdAccount {
    pub account_id: String,
    pub account_name: String,
    pub account_key: String,
    pub is_active: bool,
    pub has_valid_token: bool,
    pub last_sync_date: Option<DateTime<Utc>>,
}

impl AdAccount {
    /// Сравнение описательных полей, приходящих из внешнего реестра аккаунтов
    pub fn same_descriptor(&self, other: &AdAccount) -> bool {
        self.account_name == other.account_name
            && self.account_key == other.account_key
            && self.is_active == other.is_active
    }
}
