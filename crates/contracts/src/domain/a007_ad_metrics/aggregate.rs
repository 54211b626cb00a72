use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ============================================================================
// Level
// ============================================================================

/// Уровень сущности рекламной платформы
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdLevel {
    Campaign,
    #[serde(rename = "adset")]
    AdSet,
    Ad,
}

impl AdLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdLevel::Campaign => "campaign",
            AdLevel::AdSet => "adset",
            AdLevel::Ad => "ad",
        }
    }

    /// Имя ребра графа под аккаунтом (`act_<id>/<edge>`)
    pub fn edge(&self) -> &'static str {
        match self {
            AdLevel::Campaign => "campaigns",
            AdLevel::AdSet => "adsets",
            AdLevel::Ad => "ads",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "campaign" | "campaigns" => Some(AdLevel::Campaign),
            "adset" | "adsets" | "ad_set" => Some(AdLevel::AdSet),
            "ad" | "ads" => Some(AdLevel::Ad),
            _ => None,
        }
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// Дневные показатели одной сущности
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightMetrics {
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
}

// ============================================================================
// Structured sub-objects
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocations {
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Правила таргетинга группы объявлений
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Targeting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_min: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_max: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genders: Vec<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_locations: Option<GeoLocations>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publisher_platforms: Vec<String>,
    /// Остальные ключи платформы сохраняются без интерпретации
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionSpec {
    pub event_type: String,
    pub window_days: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromotedObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Creative {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingSpec {
    #[serde(rename = "action.type", default)]
    pub action_type: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

// ============================================================================
// Entity details
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignDetails {
    pub objective: Option<String>,
    pub buying_type: Option<String>,
    pub bid_strategy: Option<String>,
    pub budget_remaining: Option<f64>,
    pub special_ad_category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdSetDetails {
    pub campaign_id: String,
    pub optimization_goal: Option<String>,
    pub billing_event: Option<String>,
    pub bid_strategy: Option<String>,
    pub daily_budget: Option<f64>,
    pub lifetime_budget: Option<f64>,
    pub targeting: Option<Targeting>,
    #[serde(default)]
    pub attribution_spec: Vec<AttributionSpec>,
    pub promoted_object: Option<PromotedObject>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdDetails {
    pub campaign_id: String,
    pub adset_id: String,
    pub creative: Option<Creative>,
    #[serde(default)]
    pub tracking_specs: Vec<TrackingSpec>,
}

/// Описательные поля, зависящие от уровня
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum EntityDetails {
    Campaign(CampaignDetails),
    #[serde(rename = "adset")]
    AdSet(AdSetDetails),
    Ad(AdDetails),
}

impl EntityDetails {
    pub fn level(&self) -> AdLevel {
        match self {
            EntityDetails::Campaign(_) => AdLevel::Campaign,
            EntityDetails::AdSet(_) => AdLevel::AdSet,
            EntityDetails::Ad(_) => AdLevel::Ad,
        }
    }

    /// Цель кампании, если она известна на этом уровне
    pub fn objective(&self) -> Option<&str> {
        match self {
            EntityDetails::Campaign(c) => c.objective.as_deref(),
            EntityDetails::AdSet(a) => a.optimization_goal.as_deref(),
            EntityDetails::Ad(_) => None,
        }
    }
}

// ============================================================================
// Insight row
// ============================================================================

/// Строка дневных показателей. Идентичность: (уровень, entity_id, metrics_date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdMetricRow {
    pub entity_id: String,
    pub metrics_date: NaiveDate,
    pub date_stop: Option<NaiveDate>,
    pub account_id: String,
    pub account_name: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub metrics: InsightMetrics,
    pub details: EntityDetails,
}

impl AdMetricRow {
    pub fn level(&self) -> AdLevel {
        self.details.level()
    }

    /// Совпадают ли данные, которые перезаписывает повторная синхронизация
    pub fn same_content(&self, other: &AdMetricRow) -> bool {
        self.date_stop == other.date_stop
            && self.account_name == other.account_name
            && self.name == other.name
            && self.status == other.status
            && self.metrics == other.metrics
            && self.details == other.details
    }
}

/// Свертка дневных строк одной сущности за период
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    pub entity_id: String,
    pub level: AdLevel,
    pub name: Option<String>,
    pub status: Option<String>,
    pub objective: Option<String>,
    pub account_name: Option<String>,
    pub date_start: NaiveDate,
    pub date_stop: NaiveDate,
    pub spend: f64,
    pub impressions: i64,
    pub clicks: i64,
    pub reach: i64,
    pub cpm: f64,
    pub cpc: f64,
    pub ctr: f64,
    /// Сколько дневных строк вошло в свертку
    pub days: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targeting_keeps_unknown_keys() {
        let raw = serde_json::json!({
            "age_min": 18,
            "geo_locations": {"countries": ["MX"], "location_types": ["home"]},
            "flexible_spec": [{"interests": [{"id": "1"}]}]
        });
        let targeting: Targeting = serde_json::from_value(raw).unwrap();
        assert_eq!(targeting.age_min, Some(18));
        assert_eq!(targeting.geo_locations.as_ref().unwrap().countries, vec!["MX"]);
        assert!(targeting.extra.contains_key("flexible_spec"));
    }

    #[test]
    fn details_are_tagged_by_level() {
        let details = EntityDetails::AdSet(AdSetDetails {
            campaign_id: "c1".into(),
            ..Default::default()
        });
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["level"], "adset");
        let back: EntityDetails = serde_json::from_value(json).unwrap();
        assert_eq!(back.level(), AdLevel::AdSet);
    }
}
