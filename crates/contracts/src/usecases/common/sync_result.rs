use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Счетчики одного прогона синхронизации
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounts {
    pub inserted: i64,
    pub updated: i64,
    pub unchanged: i64,
    pub skipped: i64,
    pub errors: i64,
}

/// Результат любой публичной операции синхронизации.
///
/// Сериализуется как `{"status": "success", "message": ..., "inserted": ...}`
/// или `{"status": "error", "message": ..., "fault_code": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncResult {
    Success {
        message: String,
        #[serde(flatten)]
        counts: SyncCounts,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fault_code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fault_string: Option<String>,
    },
}

impl SyncResult {
    pub fn success(message: impl Into<String>, counts: SyncCounts) -> Self {
        SyncResult::Success {
            message: message.into(),
            counts,
            data: None,
        }
    }

    /// Успешный результат с полезной нагрузкой (например, отчет)
    pub fn with_data(message: impl Into<String>, data: Value) -> Self {
        SyncResult::Success {
            message: message.into(),
            counts: SyncCounts::default(),
            data: Some(data),
        }
    }

    /// Приложить детализацию к успешному результату. Ошибка возвращается как есть.
    pub fn with_details(self, details: Value) -> Self {
        match self {
            SyncResult::Success { message, counts, .. } => SyncResult::Success {
                message,
                counts,
                data: Some(details),
            },
            error => error,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        SyncResult::Error {
            message: message.into(),
            fault_code: None,
            fault_string: None,
        }
    }

    /// Ошибка удаленного вызова с кодом и текстом
    pub fn fault(
        message: impl Into<String>,
        fault_code: impl Into<String>,
        fault_string: impl Into<String>,
    ) -> Self {
        SyncResult::Error {
            message: message.into(),
            fault_code: Some(fault_code.into()),
            fault_string: Some(fault_string.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SyncResult::Success { .. })
    }

    pub fn counts(&self) -> Option<&SyncCounts> {
        match self {
            SyncResult::Success { counts, .. } => Some(counts),
            SyncResult::Error { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            SyncResult::Success { message, .. } | SyncResult::Error { message, .. } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_flat_with_status_tag() {
        let result = SyncResult::success(
            "ok",
            SyncCounts {
                inserted: 3,
                errors: 1,
                ..Default::default()
            },
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["inserted"], 3);
        assert_eq!(json["errors"], 1);
        assert!(json.get("data").is_none());
    }

    #[test]
    fn fault_carries_code_and_string() {
        let json = serde_json::to_value(SyncResult::fault("query failed", "2", "bad domain")).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["fault_code"], "2");
        assert_eq!(json["fault_string"], "bad domain");
    }
}
