use super::ErpSource;
use crate::shared::config::ErpConfig;
use crate::shared::error::SyncError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: Value,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<RpcErrorData>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorData {
    #[serde(default)]
    message: String,
}

impl RpcError {
    fn into_fault(self) -> SyncError {
        let message = self
            .data
            .map(|d| d.message)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.message);
        let code = match self.code {
            Value::String(s) => s,
            other => other.to_string(),
        };
        SyncError::Fault { code, message }
    }
}

/// Клиент JSON-RPC API ERP (`/jsonrpc`).
///
/// Создается явно и передается в исполнители. Вход выполняется лениво при
/// первом запросе, uid сессии кэшируется в клиенте.
pub struct JsonRpcErpClient {
    http: reqwest::Client,
    endpoint: String,
    config: ErpConfig,
    uid: OnceCell<i64>,
    request_id: AtomicU64,
}

impl JsonRpcErpClient {
    pub fn new(config: ErpConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .no_proxy()
            .build()?;
        let endpoint = format!("{}/jsonrpc", config.url.trim_end_matches('/'));
        Ok(Self {
            http,
            endpoint,
            config,
            uid: OnceCell::new(),
            request_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, service: &str, method: &str, args: Value) -> Result<Value, SyncError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "method": "call",
            "params": {"service": service, "method": method, "args": args},
            "id": id,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SyncError::NoConnection(format!("ERP at {}: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Fault {
                code: status.as_u16().to_string(),
                message: body,
            });
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Invalid JSON-RPC response from {}: {}", self.endpoint, e))?;

        if let Some(error) = rpc.error {
            return Err(error.into_fault());
        }
        Ok(rpc.result.unwrap_or(Value::Null))
    }

    async fn login(&self) -> Result<i64, SyncError> {
        tracing::info!(
            "ERP login to '{}' as '{}'",
            self.config.database,
            self.config.login
        );
        let result = self
            .call(
                "common",
                "login",
                json!([self.config.database, self.config.login, self.config.password]),
            )
            .await?;
        // неверные учетные данные ERP возвращает как false
        result.as_i64().ok_or_else(|| {
            SyncError::NoConnection(format!("ERP rejected login for '{}'", self.config.login))
        })
    }

    async fn uid(&self) -> Result<i64, SyncError> {
        self.uid.get_or_try_init(|| self.login()).await.copied()
    }
}

#[async_trait]
impl ErpSource for JsonRpcErpClient {
    async fn search_read(
        &self,
        model: &str,
        domain: Value,
        fields: &[&str],
    ) -> Result<Vec<Value>, SyncError> {
        let uid = self.uid().await?;
        tracing::debug!("ERP search_read {} fields={:?}", model, fields);

        let result = self
            .call(
                "object",
                "execute_kw",
                json!([
                    self.config.database,
                    uid,
                    self.config.password,
                    model,
                    "search_read",
                    [domain],
                    {"fields": fields},
                ]),
            )
            .await?;

        match result {
            Value::Array(records) => {
                tracing::info!("ERP {}: got {} records", model, records.len());
                Ok(records)
            }
            Value::Null => Ok(Vec::new()),
            other => Err(SyncError::Unexpected(anyhow::anyhow!(
                "search_read on {} returned {}",
                model,
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_error_prefers_server_detail() {
        let error: RpcError = serde_json::from_value(json!({
            "code": 200,
            "message": "Odoo Server Error",
            "data": {"message": "Invalid field 'foo' on model 'res.partner'"}
        }))
        .unwrap();
        match error.into_fault() {
            SyncError::Fault { code, message } => {
                assert_eq!(code, "200");
                assert!(message.contains("Invalid field"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let client = JsonRpcErpClient::new(ErpConfig {
            url: "https://erp.example.com/".into(),
            database: "prod".into(),
            login: "bot".into(),
            password: String::new(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(client.endpoint, "https://erp.example.com/jsonrpc");
    }
}
