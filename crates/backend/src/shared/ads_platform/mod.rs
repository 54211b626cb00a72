pub mod graph_client;

use crate::shared::error::SyncError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

pub use graph_client::GraphApiClient;

/// Ответ на один под-запрос пакетного POST
#[derive(Debug, Clone, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub body: Option<String>,
}

/// Рекламная платформа
#[async_trait]
pub trait AdsPlatform: Send + Sync {
    /// Постраничный GET: элементы `data` всех страниц по цепочке `paging.next`
    async fn get_all(&self, path: &str, params: &[(&str, String)]) -> Result<Vec<Value>, SyncError>;

    /// Один POST с массивом относительных URL. Позиция ответа совпадает
    /// с позицией под-запроса, пустой ответ приходит как `None`.
    async fn post_batch(
        &self,
        relative_urls: &[String],
    ) -> Result<Vec<Option<BatchResponse>>, SyncError>;
}

/// Относительный URL дневных показателей сущности за период
pub fn insights_relative_url(
    entity_id: &str,
    level: &str,
    fields: &str,
    since: NaiveDate,
    until: NaiveDate,
) -> String {
    let time_range = json!({
        "since": since.format("%Y-%m-%d").to_string(),
        "until": until.format("%Y-%m-%d").to_string(),
    })
    .to_string();
    format!(
        "{}/insights?fields={}&time_range={}&level={}&time_increment=1&limit=5000",
        entity_id,
        urlencoding::encode(fields),
        urlencoding::encode(&time_range),
        level
    )
}

fn body_data(response: &BatchResponse) -> Option<Vec<Value>> {
    let body: Value = serde_json::from_str(response.body.as_deref()?).ok()?;
    match body.get("data")? {
        Value::Array(items) => Some(items.clone()),
        _ => None,
    }
}

/// Выполнить GET-запросы пакетами по `batch_size` с паузой `pause` между
/// пакетами (после последнего паузы нет).
///
/// Ответы с кодом, отличным от 200, и упавшие пакеты пропускаются с
/// предупреждением: их ключей не будет в результате.
pub async fn batched_get<K>(
    platform: &dyn AdsPlatform,
    requests: Vec<(K, String)>,
    batch_size: usize,
    pause: Duration,
) -> HashMap<K, Vec<Value>>
where
    K: Eq + Hash + Clone + std::fmt::Display,
{
    let mut results = HashMap::new();
    let batch_size = batch_size.max(1);
    let batch_count = requests.len().div_ceil(batch_size);

    for (index, batch) in requests.chunks(batch_size).enumerate() {
        let urls: Vec<String> = batch.iter().map(|(_, url)| url.clone()).collect();
        match platform.post_batch(&urls).await {
            Ok(responses) => {
                for ((key, _), response) in batch.iter().zip(responses) {
                    let Some(response) = response else {
                        tracing::warn!("Empty batch response for {}", key);
                        continue;
                    };
                    if response.code != 200 {
                        tracing::warn!("Batch request for {} returned {}", key, response.code);
                        continue;
                    }
                    match body_data(&response) {
                        Some(items) => {
                            results.insert(key.clone(), items);
                        }
                        None => tracing::warn!("Batch response for {} has no data", key),
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Batch {} of {} failed: {}", index + 1, batch_count, e);
            }
        }

        if index + 1 < batch_count && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    results
}


#[cfg(test)]
mod tests {
    use super::fake::FakePlatform;
    use super::*;

    #[test]
    fn time_range_is_url_encoded() {
        let url = insights_relative_url(
            "120",
            "campaign",
            "spend,clicks",
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        );
        assert!(url.starts_with("120/insights?fields=spend%2Cclicks"));
        assert!(url.contains("time_range=%7B%22since%22%3A%222025-01-01%22"));
        assert!(url.contains("time_increment=1"));
    }

    #[tokio::test]
    async fn requests_are_split_into_batches_and_errors_skipped() {
        let platform = FakePlatform::default()
            .insights("a", vec![json!({"spend": "1"})])
            .insights("b", vec![json!({"spend": "2"}), json!({"spend": "3"})])
            .reject("c");

        let requests: Vec<(String, String)> = ["a", "b", "c"]
            .iter()
            .map(|id| (id.to_string(), format!("{}/insights", id)))
            .collect();

        let results = batched_get(&platform, requests, 2, Duration::ZERO).await;

        assert_eq!(*platform.batch_sizes.lock().unwrap(), vec![2, 1]);
        assert_eq!(results.get("a").map(Vec::len), Some(1));
        assert_eq!(results.get("b").map(Vec::len), Some(2));
        assert!(!results.contains_key("c"));
    }
}
