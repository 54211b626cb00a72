use contracts::usecases::common::SyncResult;
use thiserror::Error;

/// Ошибки синхронизации
#[derive(Debug, Error)]
pub enum SyncError {
    /// Нет активного соединения с внешней системой
    #[error("no active connection to {0}")]
    NoConnection(String),

    /// Удаленная система вернула ошибку запроса
    #[error("remote fault {code}: {message}")]
    Fault { code: String, message: String },

    /// Запись не прошла нормализацию или разрешение ссылок
    #[error("record {key}: {reason}")]
    Record { key: String, reason: String },

    #[error("storage error: {0}")]
    Storage(#[from] sea_orm::DbErr),

    /// Другой прогон уже держит блокировку сущности
    #[error("{0} sync is already running")]
    Busy(&'static str),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl SyncError {
    pub fn record(key: impl ToString, reason: impl ToString) -> Self {
        SyncError::Record {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Свернуть ошибку в результат операции
    pub fn into_result(self, operation: &str) -> SyncResult {
        match self {
            SyncError::Fault { code, message } => SyncResult::fault(
                format!("Error running the {} query: {}", operation, message),
                code,
                message,
            ),
            other => SyncResult::error(format!("Error in {}: {}", operation, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_keeps_remote_detail() {
        let result = SyncError::Fault {
            code: "1".into(),
            message: "Invalid field".into(),
        }
        .into_result("clients");
        match result {
            SyncResult::Error {
                fault_code,
                fault_string,
                ..
            } => {
                assert_eq!(fault_code.as_deref(), Some("1"));
                assert_eq!(fault_string.as_deref(), Some("Invalid field"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn other_errors_become_plain_error_results() {
        let result = SyncError::NoConnection("erp".into()).into_result("sales");
        assert!(!result.is_success());
        assert!(result.message().contains("no active connection to erp"));
    }
}
