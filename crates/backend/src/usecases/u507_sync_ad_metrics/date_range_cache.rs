//! Кэш диапазона дат выгрузки показателей.
//!
//! Записи лежат в таблице склада `a007_date_range_cache`, поэтому срок
//! жизни `ttl` действует между отдельными запусками. Запись можно сбросить
//! явно для одного аккаунта или целиком.

use crate::domain::a007_ad_metrics::range_cache_repository as storage;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use contracts::domain::a007_ad_metrics::aggregate::AdLevel;
use sea_orm::{ConnectionTrait, DbErr};

/// Диапазон дат включительно
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub since: NaiveDate,
    pub until: NaiveDate,
}

#[derive(Debug, Clone, Copy)]
pub struct DateRangeCache {
    ttl: Duration,
}

impl DateRangeCache {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs.max(0)),
        }
    }

    pub async fn get<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: &str,
        level: AdLevel,
    ) -> Result<Option<DateRange>, DbErr> {
        self.get_at(conn, account_id, level, Utc::now()).await
    }

    pub async fn get_at<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: &str,
        level: AdLevel,
        now: DateTime<Utc>,
    ) -> Result<Option<DateRange>, DbErr> {
        let Some(entry) = storage::get(conn, account_id, level).await? else {
            return Ok(None);
        };
        if now - entry.stored_at >= self.ttl {
            return Ok(None);
        }
        Ok(Some(DateRange {
            since: entry.since,
            until: entry.until,
        }))
    }

    pub async fn put<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: &str,
        level: AdLevel,
        range: DateRange,
    ) -> Result<(), DbErr> {
        self.put_at(conn, account_id, level, range, Utc::now()).await
    }

    pub async fn put_at<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: &str,
        level: AdLevel,
        range: DateRange,
        now: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        storage::upsert(conn, account_id, level, range.since, range.until, now).await
    }

    /// Сбросить все уровни одного аккаунта
    pub async fn invalidate<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: &str,
    ) -> Result<u64, DbErr> {
        let removed = storage::delete_by_account(conn, account_id).await?;
        tracing::debug!("Date range cache invalidated for account {}", account_id);
        Ok(removed)
    }

    pub async fn invalidate_all<C: ConnectionTrait>(&self, conn: &C) -> Result<u64, DbErr> {
        let removed = storage::delete_all(conn).await?;
        tracing::debug!("Date range cache cleared");
        Ok(removed)
    }

    /// Диапазон из кэша, иначе от `min_date` до `today` с сохранением
    pub async fn resolve<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: &str,
        level: AdLevel,
        min_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<DateRange, DbErr> {
        if let Some(range) = self.get(conn, account_id, level).await? {
            tracing::debug!(
                "Using cached date range {}..{} for {} {}",
                range.since,
                range.until,
                account_id,
                level.as_str()
            );
            return Ok(range);
        }
        let range = DateRange {
            since: min_date.min(today),
            until: today,
        };
        self.put(conn, account_id, level, range).await?;
        Ok(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db;

    fn range(until_day: u32) -> DateRange {
        DateRange {
            since: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            until: NaiveDate::from_ymd_opt(2025, 3, until_day).unwrap(),
        }
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let conn = db::connect_in_memory().await.unwrap();
        let cache = DateRangeCache::new(60);
        let t0 = Utc::now();
        cache.put_at(&conn, "act1", AdLevel::Campaign, range(10), t0).await.unwrap();

        let at = |secs| t0 + Duration::seconds(secs);
        assert_eq!(
            cache.get_at(&conn, "act1", AdLevel::Campaign, at(59)).await.unwrap(),
            Some(range(10))
        );
        assert_eq!(cache.get_at(&conn, "act1", AdLevel::Campaign, at(60)).await.unwrap(), None);
        assert_eq!(cache.get_at(&conn, "act1", AdLevel::Ad, t0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalidate_drops_one_account() {
        let conn = db::connect_in_memory().await.unwrap();
        let cache = DateRangeCache::new(3600);
        cache.put(&conn, "act1", AdLevel::Campaign, range(1)).await.unwrap();
        cache.put(&conn, "act1", AdLevel::AdSet, range(2)).await.unwrap();
        cache.put(&conn, "act2", AdLevel::Campaign, range(3)).await.unwrap();

        assert_eq!(cache.invalidate(&conn, "act1").await.unwrap(), 2);
        assert_eq!(cache.get(&conn, "act1", AdLevel::Campaign).await.unwrap(), None);
        assert_eq!(cache.get(&conn, "act1", AdLevel::AdSet).await.unwrap(), None);
        assert_eq!(cache.get(&conn, "act2", AdLevel::Campaign).await.unwrap(), Some(range(3)));

        assert_eq!(cache.invalidate_all(&conn).await.unwrap(), 1);
        assert_eq!(cache.get(&conn, "act2", AdLevel::Campaign).await.unwrap(), None);
    }

    #[tokio::test]
    async fn range_survives_a_new_cache_instance() {
        let conn = db::connect_in_memory().await.unwrap();
        let min = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();

        let first = DateRangeCache::new(3600)
            .resolve(&conn, "act1", AdLevel::Ad, min, today)
            .await
            .unwrap();
        assert_eq!(first, DateRange { since: min, until: today });

        // a later run with a later "today" still gets the stored range until it expires
        let later = DateRangeCache::new(3600)
            .resolve(&conn, "act1", AdLevel::Ad, min, today.succ_opt().unwrap())
            .await
            .unwrap();
        assert_eq!(later, first);
    }
}
