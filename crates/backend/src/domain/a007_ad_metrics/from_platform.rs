use crate::shared::error::SyncError;
use crate::shared::normalizer;
use chrono::NaiveDate;
use contracts::domain::a007_ad_metrics::aggregate::{
    AdDetails, AdLevel, AdMetricRow, AdSetDetails, AttributionSpec, CampaignDetails, Creative,
    EntityDetails, InsightMetrics, PromotedObject, Targeting, TrackingSpec,
};
use once_cell::sync::Lazy;
use serde::Deserialize;

const CAMPAIGN_FIELDS: &[&str] = &[
    "id",
    "name",
    "status",
    "objective",
    "buying_type",
    "bid_strategy",
    "budget_remaining",
    "special_ad_category",
    "start_time",
    "created_time",
];

const ADSET_FIELDS: &[&str] = &[
    "id",
    "name",
    "status",
    "campaign_id",
    "optimization_goal",
    "billing_event",
    "bid_strategy",
    "daily_budget",
    "lifetime_budget",
    "targeting",
    "attribution_spec",
    "promoted_object",
    "start_time",
    "created_time",
];

const AD_FIELDS: &[&str] = &[
    "id",
    "name",
    "status",
    "campaign_id",
    "adset_id",
    "creative",
    "tracking_specs",
    "created_time",
];

pub const INSIGHT_FIELDS: &[&str] = &[
    "impressions",
    "clicks",
    "spend",
    "reach",
    "frequency",
    "cpm",
    "cpc",
    "ctr",
    "inline_link_clicks",
    "inline_link_click_ctr",
    "unique_clicks",
    "unique_ctr",
    "date_start",
    "date_stop",
];

/// Значение параметра `fields` для запроса показателей
pub static INSIGHT_FIELDS_PARAM: Lazy<String> = Lazy::new(|| INSIGHT_FIELDS.join(","));

pub fn entity_fields(level: AdLevel) -> &'static [&'static str] {
    match level {
        AdLevel::Campaign => CAMPAIGN_FIELDS,
        AdLevel::AdSet => ADSET_FIELDS,
        AdLevel::Ad => AD_FIELDS,
    }
}

/// Сущность (кампания, группа или объявление) из листинга аккаунта.
/// Поля чужих уровней остаются пустыми.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityDescriptor {
    pub id: String,
    #[serde(deserialize_with = "normalizer::optional_text", default)]
    pub name: Option<String>,
    #[serde(deserialize_with = "normalizer::optional_text", default)]
    pub status: Option<String>,
    #[serde(deserialize_with = "normalizer::optional_text", default)]
    pub start_time: Option<String>,
    #[serde(deserialize_with = "normalizer::optional_text", default)]
    pub created_time: Option<String>,

    #[serde(deserialize_with = "normalizer::optional_text", default)]
    pub objective: Option<String>,
    #[serde(deserialize_with = "normalizer::optional_text", default)]
    pub buying_type: Option<String>,
    #[serde(deserialize_with = "normalizer::optional_text", default)]
    pub bid_strategy: Option<String>,
    #[serde(deserialize_with = "normalizer::optional_number", default)]
    pub budget_remaining: Option<f64>,
    #[serde(deserialize_with = "normalizer::optional_text", default)]
    pub special_ad_category: Option<String>,

    #[serde(deserialize_with = "normalizer::text", default)]
    pub campaign_id: String,
    #[serde(deserialize_with = "normalizer::optional_text", default)]
    pub optimization_goal: Option<String>,
    #[serde(deserialize_with = "normalizer::optional_text", default)]
    pub billing_event: Option<String>,
    #[serde(deserialize_with = "normalizer::optional_number", default)]
    pub daily_budget: Option<f64>,
    #[serde(deserialize_with = "normalizer::optional_number", default)]
    pub lifetime_budget: Option<f64>,
    #[serde(default)]
    pub targeting: Option<Targeting>,
    #[serde(default)]
    pub attribution_spec: Vec<AttributionSpec>,
    #[serde(default)]
    pub promoted_object: Option<PromotedObject>,

    #[serde(deserialize_with = "normalizer::text", default)]
    pub adset_id: String,
    #[serde(default)]
    pub creative: Option<Creative>,
    #[serde(default)]
    pub tracking_specs: Vec<TrackingSpec>,
}

impl EntityDescriptor {
    pub fn details(&self, level: AdLevel) -> EntityDetails {
        match level {
            AdLevel::Campaign => EntityDetails::Campaign(CampaignDetails {
                objective: self.objective.clone(),
                buying_type: self.buying_type.clone(),
                bid_strategy: self.bid_strategy.clone(),
                budget_remaining: self.budget_remaining,
                special_ad_category: self.special_ad_category.clone(),
            }),
            AdLevel::AdSet => EntityDetails::AdSet(AdSetDetails {
                campaign_id: self.campaign_id.clone(),
                optimization_goal: self.optimization_goal.clone(),
                billing_event: self.billing_event.clone(),
                bid_strategy: self.bid_strategy.clone(),
                daily_budget: self.daily_budget,
                lifetime_budget: self.lifetime_budget,
                targeting: self.targeting.clone(),
                attribution_spec: self.attribution_spec.clone(),
                promoted_object: self.promoted_object.clone(),
            }),
            AdLevel::Ad => EntityDetails::Ad(AdDetails {
                campaign_id: self.campaign_id.clone(),
                adset_id: self.adset_id.clone(),
                creative: self.creative.clone(),
                tracking_specs: self.tracking_specs.clone(),
            }),
        }
    }

    /// Дата начала показов: start_time у кампаний и групп, created_time у объявлений
    pub fn start_date(&self, level: AdLevel) -> Option<NaiveDate> {
        let raw = match level {
            AdLevel::Campaign | AdLevel::AdSet => {
                self.start_time.as_deref().or(self.created_time.as_deref())
            }
            AdLevel::Ad => self.created_time.as_deref(),
        };
        raw.and_then(normalizer::parse_date)
    }
}

/// Дневная строка ответа `insights` с `time_increment=1`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InsightRecord {
    #[serde(deserialize_with = "normalizer::text", default)]
    pub date_start: String,
    #[serde(deserialize_with = "normalizer::text", default)]
    pub date_stop: String,
    #[serde(deserialize_with = "normalizer::integer", default)]
    pub impressions: i64,
    #[serde(deserialize_with = "normalizer::integer", default)]
    pub clicks: i64,
    #[serde(deserialize_with = "normalizer::number", default)]
    pub spend: f64,
    #[serde(deserialize_with = "normalizer::integer", default)]
    pub reach: i64,
    #[serde(deserialize_with = "normalizer::number", default)]
    pub frequency: f64,
    #[serde(deserialize_with = "normalizer::number", default)]
    pub cpm: f64,
    #[serde(deserialize_with = "normalizer::number", default)]
    pub cpc: f64,
    #[serde(deserialize_with = "normalizer::number", default)]
    pub ctr: f64,
    #[serde(deserialize_with = "normalizer::integer", default)]
    pub inline_link_clicks: i64,
    #[serde(deserialize_with = "normalizer::number", default)]
    pub inline_link_click_ctr: f64,
    #[serde(deserialize_with = "normalizer::integer", default)]
    pub unique_clicks: i64,
    #[serde(deserialize_with = "normalizer::number", default)]
    pub unique_ctr: f64,
}

impl InsightRecord {
    fn metrics(&self) -> InsightMetrics {
        InsightMetrics {
            impressions: self.impressions,
            clicks: self.clicks,
            spend: self.spend,
            reach: self.reach,
            frequency: self.frequency,
            cpm: self.cpm,
            cpc: self.cpc,
            ctr: self.ctr,
            inline_link_clicks: self.inline_link_clicks,
            inline_link_click_ctr: self.inline_link_click_ctr,
            unique_clicks: self.unique_clicks,
            unique_ctr: self.unique_ctr,
        }
    }
}

/// Собрать строку склада из сущности и одного дня ее показателей
pub fn to_row(
    level: AdLevel,
    entity: &EntityDescriptor,
    insight: &InsightRecord,
    account_id: &str,
    account_name: &str,
) -> Result<AdMetricRow, SyncError> {
    let metrics_date = normalizer::parse_date(&insight.date_start).ok_or_else(|| {
        SyncError::record(
            &entity.id,
            format!("insight without a valid date_start '{}'", insight.date_start),
        )
    })?;

    Ok(AdMetricRow {
        entity_id: entity.id.clone(),
        metrics_date,
        date_stop: normalizer::parse_date(&insight.date_stop),
        account_id: account_id.to_string(),
        account_name: Some(account_name.to_string()).filter(|n| !n.is_empty()),
        name: entity.name.clone(),
        status: entity.status.clone(),
        metrics: insight.metrics(),
        details: entity.details(level),
    })
}
