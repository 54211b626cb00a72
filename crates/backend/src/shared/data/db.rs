use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;

fn build_sqlite_url(path: &Path) -> String {
    // Разделители пути приводятся к `/`, для путей Windows добавляется ведущий слэш
    let normalized = path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    format!("sqlite://{}{}?mode=rwc", prefix, normalized)
}

/// Открыть базу склада и применить миграции.
///
/// Соединение возвращается вызывающему и явно передается в репозитории и executors.
pub async fn connect(db_path: &Path) -> anyhow::Result<DatabaseConnection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if db_path.is_absolute() {
        db_path.to_path_buf()
    } else {
        std::env::current_dir()?.join(db_path)
    };
    let db_url = build_sqlite_url(&absolute_path);
    tracing::info!("Connecting to warehouse: {}", db_url);

    let mut options = ConnectOptions::new(db_url);
    options.sqlx_logging(false);
    let conn = Database::connect(options).await?;

    run_migrations(&conn).await?;
    Ok(conn)
}

/// Отдельный склад в памяти с полной схемой для тестов
pub async fn connect_in_memory() -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    // иначе каждое соединение пула получит свою пустую базу
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let conn = Database::connect(options).await?;
    run_migrations(&conn).await?;
    Ok(conn)
}

pub async fn run_migrations(conn: &DatabaseConnection) -> anyhow::Result<()> {
    let pool = conn.get_sqlite_connection_pool();
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::debug!("Database migrations applied successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_url_handles_windows_paths() {
        assert_eq!(
            build_sqlite_url(Path::new("/var/db/w.db")),
            "sqlite:///var/db/w.db?mode=rwc"
        );
        assert_eq!(
            build_sqlite_url(Path::new("C:\\data\\w.db")),
            "sqlite:///C:/data/w.db?mode=rwc"
        );
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let conn = connect_in_memory().await.unwrap();
        run_migrations(&conn).await.unwrap();
    }
}
