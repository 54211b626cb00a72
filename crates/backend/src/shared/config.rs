use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub erp: ErpConfig,
    pub ads: AdsConfig,
    #[serde(default)]
    pub sync: SyncSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Параметры подключения к RPC-эндпоинту ERP
#[derive(Debug, Deserialize, Clone)]
pub struct ErpConfig {
    pub url: String,
    pub database: String,
    pub login: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_erp_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdsConfig {
    #[serde(default = "default_ads_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub access_token: String,
    /// Показатели раньше этой даты не запрашиваются
    #[serde(default = "default_min_date")]
    pub min_date: NaiveDate,
    /// Подзапросов в одном пакетном POST
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_pause")]
    pub batch_pause_secs: u64,
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    #[serde(default)]
    pub accounts: Vec<AdAccountConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdAccountConfig {
    pub account_id: String,
    pub account_name: String,
    pub account_key: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Настройки, общие для всех прогонов сверки
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SyncSettings {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Перерыв между покупками, после которого клиент считается восстановленным
    #[serde(default = "default_recovery_days")]
    pub recovery_days: i64,
    #[serde(default = "default_date_cache_ttl")]
    pub date_cache_ttl_secs: i64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            recovery_days: default_recovery_days(),
            date_cache_ttl_secs: default_date_cache_ttl(),
        }
    }
}

fn default_erp_timeout() -> u64 {
    120
}

fn default_ads_base_url() -> String {
    "https://graph.facebook.com/v18.0".to_string()
}

fn default_min_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn default_batch_size() -> usize {
    50
}

fn default_batch_pause() -> u64 {
    2
}

fn default_page_limit() -> u32 {
    500
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    1000
}

fn default_recovery_days() -> i64 {
    180
}

fn default_date_cache_ttl() -> i64 {
    24 * 60 * 60
}

/// Конфигурация по умолчанию, встроенная в бинарник
const DEFAULT_CONFIG: &str = r#"
[database]
path = "target/db/warehouse.db"

[erp]
url = "http://localhost:8069"
database = "erp"
login = "sync@localhost"
password = ""

[ads]
base_url = "https://graph.facebook.com/v18.0"
min_date = "2025-01-01"

[sync]
chunk_size = 1000
recovery_days = 180
date_cache_ttl_secs = 86400
"#;

/// Загрузить конфигурацию из config.toml
///
/// Порядок поиска:
/// 1. Рядом с исполняемым файлом
/// 2. Текущая директория
/// 3. Встроенная конфигурация по умолчанию
pub fn load_config() -> anyhow::Result<Config> {
    for config_path in candidate_paths() {
        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            let contents = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&contents)?;
            return Ok(config);
        }
        tracing::debug!("config.toml not found at: {}", config_path.display());
    }

    tracing::info!("Using default embedded configuration");
    let config: Config = toml::from_str(DEFAULT_CONFIG)?;
    Ok(config)
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            paths.push(exe_dir.join("config.toml"));
        }
    }
    paths.push(PathBuf::from("config.toml"));
    paths
}

/// Путь к файлу базы из конфигурации.
/// Относительный путь считается от директории исполняемого файла
pub fn get_database_path(config: &Config) -> anyhow::Result<PathBuf> {
    let db_path_str = &config.database.path;
    let db_path = Path::new(db_path_str);

    if db_path.is_absolute() {
        return Ok(db_path.to_path_buf());
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return Ok(exe_dir.join(db_path));
        }
    }

    Ok(PathBuf::from(db_path_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads() {
        let config: Result<Config, _> = toml::from_str(DEFAULT_CONFIG);
        assert!(config.is_ok());
        let config = config.unwrap();
        assert_eq!(config.database.path, "target/db/warehouse.db");
        assert_eq!(config.ads.batch_size, 50);
        assert_eq!(config.ads.batch_pause_secs, 2);
        assert_eq!(config.ads.min_date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(config.sync, SyncSettings::default());
    }

    #[test]
    fn test_sync_section_is_optional() {
        let config: Config = toml::from_str(
            r#"
            [database]
            path = "/tmp/w.db"
            [erp]
            url = "http://erp"
            database = "prod"
            login = "bot"
            [ads]
            access_token = "t"
            [[ads.accounts]]
            account_id = "123"
            account_name = "Main"
            account_key = "MAIN"
            "#,
        )
        .unwrap();
        assert_eq!(config.sync.chunk_size, 1000);
        assert_eq!(config.sync.recovery_days, 180);
        assert_eq!(config.erp.timeout_secs, 120);
        assert_eq!(config.ads.accounts.len(), 1);
        assert!(config.ads.accounts[0].is_active);
        assert_eq!(
            get_database_path(&config).unwrap(),
            PathBuf::from("/tmp/w.db")
        );
    }
}
