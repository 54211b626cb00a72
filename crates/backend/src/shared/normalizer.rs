//! Нестрогие декодеры полей внешних записей.
//!
//! ERP отвечает `false` на любое пустое поле, включая текст и ссылки, а
//! рекламная платформа присылает числа строками. Функции предназначены для
//! `#[serde(deserialize_with = "...", default)]`: структура записи получает
//! типизированные значения, отсутствующие поля сворачиваются в "" / 0 / None.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Ссылка `[id, label]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub id: i64,
    pub label: String,
}

/// Подпись ссылки, "" если ссылки нет
pub fn label_of(reference: &Option<Reference>) -> String {
    reference
        .as_ref()
        .map(|r| r.label.clone())
        .unwrap_or_default()
}

pub fn id_of(reference: &Option<Reference>) -> Option<i64> {
    reference.as_ref().map(|r| r.id)
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "true".to_string(),
        _ => String::new(),
    }
}

fn value_to_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// String, number, `false` or null → String
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_text(Value::deserialize(deserializer)?))
}

/// Как [`text`], но отсутствие остается `None`
pub fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = value_to_text(Value::deserialize(deserializer)?);
    Ok(if text.is_empty() { None } else { Some(text) })
}

pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_f64(&Value::deserialize(deserializer)?))
}

pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(_) | Value::String(_) => Some(value_to_f64(&value)),
        _ => None,
    })
}

pub fn integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_i64(&Value::deserialize(deserializer)?).unwrap_or(0))
}

/// Истиной считается только литерал `true`
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

/// `[id, label]`, голый id, `false` или null
pub fn reference<'de, D>(deserializer: D) -> Result<Option<Reference>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => {
            let id = items.first().and_then(value_to_i64);
            let label = items.get(1).cloned().map(value_to_text).unwrap_or_default();
            id.map(|id| Reference { id, label })
        }
        other => value_to_i64(&other).map(|id| Reference {
            id,
            label: String::new(),
        }),
    })
}

/// Array of ids, `false` or null → empty
pub fn id_list<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.iter().filter_map(value_to_i64).collect(),
        _ => Vec::new(),
    })
}

/// Принимает `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` и префиксы RFC 3339
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_utc())
        })
        .or_else(|| parse_date(raw).and_then(|d| d.and_hms_opt(0, 0, 0)))
}
