pub mod jsonrpc_client;

use crate::shared::error::SyncError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use jsonrpc_client::JsonRpcErpClient;

/// Источник записей ERP.
///
/// Каждый вызов может упасть: `NoConnection`, если сессию не удалось
/// открыть, и `Fault` с кодом и текстом, если ERP отклонила запрос.
#[async_trait]
pub trait ErpSource: Send + Sync {
    async fn search_read(
        &self,
        model: &str,
        domain: Value,
        fields: &[&str],
    ) -> Result<Vec<Value>, SyncError>;
}

/// Разобрать записи по одной. Запись, которая не ложится в `T`,
/// возвращается как ошибка записи и не мешает остальным.
pub fn decode_each<T: DeserializeOwned>(
    records: Vec<Value>,
    key_field: &str,
) -> Vec<Result<T, SyncError>> {
    records
        .into_iter()
        .map(|record| {
            let key = record
                .get(key_field)
                .map(|k| k.to_string())
                .unwrap_or_else(|| "?".to_string());
            serde_json::from_value(record).map_err(|e| SyncError::record(key, e))
        })
        .collect()
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// ERP в памяти: ответы по имени модели и журнал вызовов
    #[derive(Default)]
    pub struct FakeErp {
        pub records: HashMap<String, Vec<Value>>,
        pub faults: HashMap<String, (String, String)>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeErp {
        pub fn with(mut self, model: &str, records: Vec<Value>) -> Self {
            self.records.insert(model.to_string(), records);
            self
        }

        pub fn failing(mut self, model: &str, code: &str, message: &str) -> Self {
            self.faults
                .insert(model.to_string(), (code.to_string(), message.to_string()));
            self
        }
    }

    #[async_trait]
    impl ErpSource for FakeErp {
        async fn search_read(
            &self,
            model: &str,
            _domain: Value,
            _fields: &[&str],
        ) -> Result<Vec<Value>, SyncError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(model.to_string());
            }
            if let Some((code, message)) = self.faults.get(model) {
                return Err(SyncError::Fault {
                    code: code.clone(),
                    message: message.clone(),
                });
            }
            Ok(self.records.get(model).cloned().unwrap_or_default())
        }
    }
}
