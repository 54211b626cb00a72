use super::aggregation;
use crate::domain::a007_ad_metrics::repository;
use crate::shared::context::SyncContext;
use crate::shared::error::SyncError;
use chrono::NaiveDate;
use contracts::domain::a007_ad_metrics::aggregate::AdLevel;
use contracts::usecases::common::SyncResult;

/// Сводный отчет по дневным показателям за период
pub struct AdReportExecutor {
    ctx: SyncContext,
}

impl AdReportExecutor {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    pub async fn report(
        &self,
        level: AdLevel,
        account_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> SyncResult {
        self.build(level, account_id, from, to)
            .await
            .unwrap_or_else(|e| e.into_result("ad report"))
    }

    async fn build(
        &self,
        level: AdLevel,
        account_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<SyncResult, SyncError> {
        if from > to {
            return Err(SyncError::record(
                account_id,
                format!("report range {}..{} is empty", from, to),
            ));
        }
        let rows = repository::find_in_range(self.ctx.db(), account_id, level, from, to).await?;
        let report = aggregation::aggregate(&rows);
        tracing::info!(
            "Ad report: account {}, level {}, {}..{}: {} rows into {} entities",
            account_id,
            level.as_str(),
            from,
            to,
            rows.len(),
            report.len()
        );

        let data = serde_json::to_value(&report).map_err(anyhow::Error::from)?;
        Ok(SyncResult::with_data(
            format!("{} {} entities", report.len(), level.as_str()),
            data,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::context::test_context;
    use contracts::domain::a007_ad_metrics::aggregate::{
        AdDetails, AdMetricRow, EntityDetails, InsightMetrics,
    };
    use sea_orm::EntityTrait;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, day).unwrap()
    }

    async fn store(ctx: &SyncContext, entity: &str, day: u32, spend: f64) {
        let row = AdMetricRow {
            entity_id: entity.into(),
            metrics_date: d(day),
            date_stop: Some(d(day)),
            account_id: "111".into(),
            account_name: None,
            name: Some(format!("Ad {}", entity)),
            status: None,
            metrics: InsightMetrics {
                spend,
                ..Default::default()
            },
            details: EntityDetails::Ad(AdDetails::default()),
        };
        repository::Entity::insert(repository::active_model(&row).unwrap())
            .exec_without_returning(ctx.db())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn report_covers_only_the_range() {
        let ctx = test_context().await;
        store(&ctx, "9", 1, 1.0).await;
        store(&ctx, "9", 2, 2.0).await;
        store(&ctx, "9", 20, 50.0).await;

        let result = AdReportExecutor::new(ctx)
            .report(AdLevel::Ad, "111", d(1), d(10))
            .await;
        let SyncResult::Success { data: Some(data), message, .. } = result else {
            panic!("unexpected result");
        };
        assert_eq!(message, "1 ad entities");
        assert_eq!(data[0]["entity_id"], "9");
        assert_eq!(data[0]["spend"], 3.0);
        assert_eq!(data[0]["days"], 2);
    }

    #[tokio::test]
    async fn inverted_range_is_an_error_result() {
        let ctx = test_context().await;
        let result = AdReportExecutor::new(ctx)
            .report(AdLevel::Campaign, "111", d(10), d(1))
            .await;
        assert!(!result.is_success());
    }
}
