use super::{AdsPlatform, BatchResponse};
use crate::shared::config::AdsConfig;
use crate::shared::error::SyncError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: GraphError,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    #[serde(default)]
    code: Value,
    #[serde(default)]
    message: String,
}

fn fault_from_body(status: reqwest::StatusCode, body: &str) -> SyncError {
    match serde_json::from_str::<GraphErrorEnvelope>(body) {
        Ok(envelope) => SyncError::Fault {
            code: match envelope.error.code {
                Value::Null => status.as_u16().to_string(),
                other => other.to_string(),
            },
            message: envelope.error.message,
        },
        Err(_) => SyncError::Fault {
            code: status.as_u16().to_string(),
            message: body.to_string(),
        },
    }
}

/// HTTP-клиент Graph API рекламной платформы
pub struct GraphApiClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    page_limit: u32,
}

impl GraphApiClient {
    pub fn new(config: &AdsConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            page_limit: config.page_limit,
        })
    }

    async fn read_page(&self, request: reqwest::RequestBuilder) -> Result<Page, SyncError> {
        let response = request
            .send()
            .await
            .map_err(|e| SyncError::NoConnection(format!("ads platform: {}", e)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::NoConnection(format!("ads platform: {}", e)))?;
        if !status.is_success() {
            return Err(fault_from_body(status, &body));
        }
        serde_json::from_str(&body)
            .map_err(|e| SyncError::Unexpected(anyhow::anyhow!("Invalid page JSON: {}", e)))
    }
}

#[async_trait]
impl AdsPlatform for GraphApiClient {
    async fn get_all(&self, path: &str, params: &[(&str, String)]) -> Result<Vec<Value>, SyncError> {
        if self.access_token.is_empty() {
            return Err(SyncError::NoConnection("ads platform: no access token".into()));
        }

        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("limit", self.page_limit.to_string()));
        query.push(("access_token", self.access_token.clone()));

        let mut items = Vec::new();
        let mut page = self.read_page(self.http.get(&url).query(&query)).await?;
        let mut pages = 1;
        loop {
            items.append(&mut page.data);
            // next уже содержит токен и все параметры
            let Some(next) = page.paging.and_then(|p| p.next) else {
                break;
            };
            page = self.read_page(self.http.get(&next)).await?;
            pages += 1;
        }

        tracing::info!("GET {}: {} items in {} pages", path, items.len(), pages);
        Ok(items)
    }

    async fn post_batch(
        &self,
        relative_urls: &[String],
    ) -> Result<Vec<Option<BatchResponse>>, SyncError> {
        let batch: Vec<Value> = relative_urls
            .iter()
            .map(|url| json!({"method": "GET", "relative_url": url}))
            .collect();
        let form = [
            ("access_token", self.access_token.clone()),
            ("batch", Value::Array(batch).to_string()),
        ];

        let response = self
            .http
            .post(&self.base_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| SyncError::NoConnection(format!("ads platform: {}", e)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::NoConnection(format!("ads platform: {}", e)))?;
        if !status.is_success() {
            return Err(fault_from_body(status, &body));
        }

        let responses: Vec<Option<BatchResponse>> = serde_json::from_str(&body)
            .map_err(|e| SyncError::Unexpected(anyhow::anyhow!("Invalid batch JSON: {}", e)))?;
        tracing::debug!(
            "Batch of {} requests answered with {} responses",
            relative_urls.len(),
            responses.len()
        );
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_becomes_fault() {
        let body = r#"{"error":{"message":"Invalid OAuth access token.","code":190}}"#;
        match fault_from_body(reqwest::StatusCode::BAD_REQUEST, body) {
            SyncError::Fault { code, message } => {
                assert_eq!(code, "190");
                assert_eq!(message, "Invalid OAuth access token.");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn non_json_error_keeps_status() {
        match fault_from_body(reqwest::StatusCode::BAD_GATEWAY, "upstream down") {
            SyncError::Fault { code, .. } => assert_eq!(code, "502"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
