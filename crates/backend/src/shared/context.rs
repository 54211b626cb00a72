use super::config::SyncSettings;
use super::sync_lock::SyncLocks;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Общее окружение исполнителей: соединение со складом, блокировки и настройки.
/// Клонируется дешево, все исполнители одного процесса делят одни блокировки.
#[derive(Clone)]
pub struct SyncContext {
    pub conn: Arc<DatabaseConnection>,
    pub locks: SyncLocks,
    pub settings: SyncSettings,
}

impl SyncContext {
    pub fn new(conn: DatabaseConnection, settings: SyncSettings) -> Self {
        Self {
            conn: Arc::new(conn),
            locks: SyncLocks::new(),
            settings,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.conn
    }
}

#[cfg(test)]
pub async fn test_context() -> SyncContext {
    let conn = super::data::db::connect_in_memory()
        .await
        .expect("in-memory warehouse");
    SyncContext::new(conn, SyncSettings::default())
}
