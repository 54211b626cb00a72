use super::date_range_cache::{DateRange, DateRangeCache};
use crate::domain::a006_ad_account::repository as accounts;
use crate::domain::a007_ad_metrics::from_platform::{
    self, EntityDescriptor, InsightRecord, INSIGHT_FIELDS_PARAM,
};
use crate::domain::a007_ad_metrics::repository;
use crate::shared::ads_platform::{self, AdsPlatform};
use crate::shared::bulk;
use crate::shared::config::AdsConfig;
use crate::shared::context::SyncContext;
use crate::shared::erp;
use crate::shared::error::SyncError;
use crate::shared::identity_index::{IdentityIndex, KeySet};
use crate::shared::sync_lock::EntityKind;
use chrono::{Duration, NaiveDate, Utc};
use contracts::domain::a007_ad_metrics::aggregate::{AdLevel, AdMetricRow};
use contracts::usecases::common::{SyncCounts, SyncResult};
use std::sync::Arc;

/// Сущности без даты начала запрашиваются за последние 30 дней диапазона
const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// Начало периода показателей сущности внутри диапазона.
/// `None`, если сущность стартует после конца диапазона.
fn entity_since(start: Option<NaiveDate>, range: DateRange) -> Option<NaiveDate> {
    let since = match start {
        Some(start) => start.max(range.since),
        None => (range.until - Duration::days(DEFAULT_LOOKBACK_DAYS)).max(range.since),
    };
    (since <= range.until).then_some(since)
}

/// Executor для дневных показателей кампаний, групп и объявлений
pub struct AdMetricsSyncExecutor {
    ctx: SyncContext,
    platform: Arc<dyn AdsPlatform>,
    config: AdsConfig,
    cache: DateRangeCache,
}

impl AdMetricsSyncExecutor {
    pub fn new(
        ctx: SyncContext,
        platform: Arc<dyn AdsPlatform>,
        config: AdsConfig,
        cache: DateRangeCache,
    ) -> Self {
        Self {
            ctx,
            platform,
            config,
            cache,
        }
    }

    /// Выгрузить показатели одного уровня аккаунта и сверить их по
    /// (уровень, entity_id, metrics_date)
    pub async fn sync_metrics(&self, account_id: &str, level: AdLevel) -> SyncResult {
        self.run_sync(account_id, level)
            .await
            .unwrap_or_else(|e| e.into_result("ad metrics sync"))
    }

    /// Сбросить сохраненные диапазоны дат одного аккаунта или всех сразу
    pub async fn clear_date_ranges(&self, account_id: Option<&str>) -> SyncResult {
        self.run_clear(account_id)
            .await
            .unwrap_or_else(|e| e.into_result("date range reset"))
    }

    async fn run_clear(&self, account_id: Option<&str>) -> Result<SyncResult, SyncError> {
        let _guard = self.ctx.locks.try_acquire(&[EntityKind::AdMetrics])?;
        let conn = self.ctx.db();
        let removed = match account_id {
            Some(id) => self.cache.invalidate(conn, id).await?,
            None => self.cache.invalidate_all(conn).await?,
        };
        tracing::info!("Date range cache reset: {} entries removed", removed);
        Ok(SyncResult::with_data(
            format!("Removed {} cached date ranges", removed),
            serde_json::json!({ "removed": removed }),
        ))
    }

    async fn list_entities(
        &self,
        account_id: &str,
        level: AdLevel,
    ) -> Result<Vec<Result<EntityDescriptor, SyncError>>, SyncError> {
        let path = format!("act_{}/{}", account_id, level.edge());
        let params = [("fields", from_platform::entity_fields(level).join(","))];
        let items = self.platform.get_all(&path, &params).await?;
        Ok(erp::decode_each(items, "id"))
    }

    async fn run_sync(&self, account_id: &str, level: AdLevel) -> Result<SyncResult, SyncError> {
        let _guard = self.ctx.locks.try_acquire(&[EntityKind::AdMetrics])?;
        let conn = self.ctx.db();

        let account = accounts::get_by_id(conn, account_id)
            .await?
            .ok_or_else(|| SyncError::record(account_id, "unknown ad account"))?;
        if !account.is_active {
            tracing::warn!("Ad account {} is inactive, nothing to sync", account_id);
            return Ok(SyncResult::error(format!("Ad account {} is inactive", account_id)));
        }

        let today = Utc::now().date_naive();
        let range = self
            .cache
            .resolve(conn, account_id, level, self.config.min_date, today)
            .await?;
        tracing::info!(
            "Ad metrics sync: account {}, level {}, {}..{}",
            account_id,
            level.as_str(),
            range.since,
            range.until
        );

        let mut counts = SyncCounts::default();

        // 1. Сущности уровня и их периоды
        let mut entities = Vec::new();
        let mut requests = Vec::new();
        for item in self.list_entities(account_id, level).await? {
            let entity = match item {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", level.as_str(), e);
                    counts.errors += 1;
                    continue;
                }
            };
            let Some(since) = entity_since(entity.start_date(level), range) else {
                tracing::debug!("{} {} starts after {}", level.as_str(), entity.id, range.until);
                counts.skipped += 1;
                continue;
            };
            requests.push((
                entity.id.clone(),
                ads_platform::insights_relative_url(
                    &entity.id,
                    level.as_str(),
                    &INSIGHT_FIELDS_PARAM,
                    since,
                    range.until,
                ),
            ));
            entities.push(entity);
        }
        let listed = entities.len();

        // 2. Дневные показатели пакетами
        let mut insights = ads_platform::batched_get(
            self.platform.as_ref(),
            requests,
            self.config.batch_size,
            std::time::Duration::from_secs(self.config.batch_pause_secs),
        )
        .await;

        // 3. Сверка с сохраненными строками диапазона
        let existing = repository::find_in_range(conn, account_id, level, range.since, range.until).await?;
        let index = IdentityIndex::build(existing, |r| (r.entity_id.clone(), r.metrics_date));
        let mut claimed = KeySet::default();

        let mut fresh: Vec<AdMetricRow> = Vec::new();
        for entity in &entities {
            let rows = match insights.remove(&entity.id) {
                Some(rows) if !rows.is_empty() => rows,
                _ => {
                    tracing::debug!("No insights for {} {}", level.as_str(), entity.id);
                    counts.skipped += 1;
                    continue;
                }
            };
            for raw in rows {
                let row = serde_json::from_value::<InsightRecord>(raw)
                    .map_err(|e| SyncError::record(&entity.id, e))
                    .and_then(|insight| {
                        from_platform::to_row(level, entity, &insight, account_id, &account.account_name)
                    });
                let row = match row {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Skipping insight: {}", e);
                        counts.errors += 1;
                        continue;
                    }
                };

                let key = (row.entity_id.clone(), row.metrics_date);
                if !claimed.claim(key.clone()) {
                    tracing::debug!("Duplicate insight day {} for {}", row.metrics_date, row.entity_id);
                    counts.skipped += 1;
                    continue;
                }
                match index.get(&key) {
                    Some(stored) if stored.same_content(&row) => counts.unchanged += 1,
                    Some(_) => match repository::update(conn, &row).await {
                        Ok(()) => counts.updated += 1,
                        Err(e) => {
                            tracing::error!("Failed to update {} on {}: {}", row.entity_id, row.metrics_date, e);
                            counts.errors += 1;
                        }
                    },
                    None => fresh.push(row),
                }
            }
        }

        let mut rows = Vec::with_capacity(fresh.len());
        for row in &fresh {
            match repository::active_model(row) {
                Ok(model) => rows.push((format!("{}@{}", row.entity_id, row.metrics_date), model)),
                Err(e) => {
                    tracing::error!("Cannot store {} on {}: {}", row.entity_id, row.metrics_date, e);
                    counts.errors += 1;
                }
            }
        }
        let outcome = bulk::insert_chunked(conn, rows, self.ctx.settings.chunk_size).await;
        counts.inserted = outcome.inserted as i64;
        counts.errors += outcome.errors() as i64;

        accounts::touch_last_sync(conn, account_id, Utc::now()).await?;

        tracing::info!(
            "Ad metrics sync finished: entities={}, inserted={}, updated={}, unchanged={}, skipped={}, errors={}",
            listed,
            counts.inserted,
            counts.updated,
            counts.unchanged,
            counts.skipped,
            counts.errors
        );
        Ok(SyncResult::success(
            format!(
                "Synced {} metrics of account {}: {} inserted, {} updated",
                level.as_str(),
                account_id,
                counts.inserted,
                counts.updated
            ),
            counts,
        ))
    }
}
