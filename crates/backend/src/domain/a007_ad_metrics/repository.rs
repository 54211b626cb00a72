use chrono::{NaiveDate, Utc};
use contracts::domain::a007_ad_metrics::aggregate::{AdLevel, AdMetricRow, EntityDetails, InsightMetrics};
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait, EntityTrait, QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a007_ad_metric")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub level: String,
    pub entity_id: String,
    pub metrics_date: NaiveDate,
    pub date_stop: Option<NaiveDate>,
    pub account_id: String,
    pub account_name: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub impressions: i64,
    pub clicks: i64,
    pub spend: f64,
    pub reach: i64,
    pub frequency: f64,
    pub cpm: f64,
    pub cpc: f64,
    pub ctr: f64,
    pub inline_link_clicks: i64,
    pub inline_link_click_ctr: f64,
    pub unique_clicks: i64,
    pub unique_ctr: f64,
    /// JSON уровня сущности (`EntityDetails`)
    pub details: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for AdMetricRow {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let details: EntityDetails = serde_json::from_str(&m.details).map_err(|e| {
            anyhow::anyhow!("details of {} {} are not valid: {}", m.level, m.entity_id, e)
        })?;
        Ok(AdMetricRow {
            entity_id: m.entity_id,
            metrics_date: m.metrics_date,
            date_stop: m.date_stop,
            account_id: m.account_id,
            account_name: m.account_name,
            name: m.name,
            status: m.status,
            metrics: InsightMetrics {
                impressions: m.impressions,
                clicks: m.clicks,
                spend: m.spend,
                reach: m.reach,
                frequency: m.frequency,
                cpm: m.cpm,
                cpc: m.cpc,
                ctr: m.ctr,
                inline_link_clicks: m.inline_link_clicks,
                inline_link_click_ctr: m.inline_link_click_ctr,
                unique_clicks: m.unique_clicks,
                unique_ctr: m.unique_ctr,
            },
            details,
        })
    }
}

/// Модель для вставки; вложенные структуры сериализуются только здесь
pub fn active_model(row: &AdMetricRow) -> anyhow::Result<ActiveModel> {
    let now = Utc::now();
    let m = &row.metrics;
    Ok(ActiveModel {
        id: ActiveValue::NotSet,
        level: Set(row.level().as_str().to_string()),
        entity_id: Set(row.entity_id.clone()),
        metrics_date: Set(row.metrics_date),
        date_stop: Set(row.date_stop),
        account_id: Set(row.account_id.clone()),
        account_name: Set(row.account_name.clone()),
        name: Set(row.name.clone()),
        status: Set(row.status.clone()),
        impressions: Set(m.impressions),
        clicks: Set(m.clicks),
        spend: Set(m.spend),
        reach: Set(m.reach),
        frequency: Set(m.frequency),
        cpm: Set(m.cpm),
        cpc: Set(m.cpc),
        ctr: Set(m.ctr),
        inline_link_clicks: Set(m.inline_link_clicks),
        inline_link_click_ctr: Set(m.inline_link_click_ctr),
        unique_clicks: Set(m.unique_clicks),
        unique_ctr: Set(m.unique_ctr),
        details: Set(serde_json::to_string(&row.details)?),
        created_at: Set(Some(now)),
        updated_at: Set(Some(now)),
    })
}

/// Дневные строки аккаунта и уровня в диапазоне дат включительно.
/// Строки с поврежденными деталями пропускаются с предупреждением.
pub async fn find_in_range<C: ConnectionTrait>(
    conn: &C,
    account_id: &str,
    level: AdLevel,
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<Vec<AdMetricRow>> {
    let models = Entity::find()
        .filter(Column::AccountId.eq(account_id))
        .filter(Column::Level.eq(level.as_str()))
        .filter(Column::MetricsDate.gte(from))
        .filter(Column::MetricsDate.lte(to))
        .order_by_asc(Column::EntityId)
        .order_by_asc(Column::MetricsDate)
        .all(conn)
        .await?;

    let mut rows = Vec::with_capacity(models.len());
    for model in models {
        match AdMetricRow::try_from(model) {
            Ok(row) => rows.push(row),
            Err(e) => tracing::warn!("Skipping stored metric row: {}", e),
        }
    }
    Ok(rows)
}

/// Перезапись строки по ключу (уровень, entity_id, metrics_date)
pub async fn update<C: ConnectionTrait>(conn: &C, row: &AdMetricRow) -> anyhow::Result<()> {
    let mut active = active_model(row)?;
    active.created_at = ActiveValue::NotSet;
    let result = Entity::update_many()
        .set(active)
        .filter(Column::Level.eq(row.level().as_str()))
        .filter(Column::EntityId.eq(row.entity_id.as_str()))
        .filter(Column::MetricsDate.eq(row.metrics_date))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        anyhow::bail!(
            "no stored row for {} {} on {}",
            row.level().as_str(),
            row.entity_id,
            row.metrics_date
        );
    }
    Ok(())
}
