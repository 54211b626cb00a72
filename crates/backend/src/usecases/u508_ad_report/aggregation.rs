use contracts::domain::a007_ad_metrics::aggregate::{AdMetricRow, AggregatedMetrics};
use std::collections::BTreeMap;

/// Промежуточная свертка одной сущности
struct Accumulator {
    item: AggregatedMetrics,
    cpm_sum: f64,
    cpc_sum: f64,
    ctr_sum: f64,
}

impl Accumulator {
    fn start(row: &AdMetricRow) -> Self {
        Self {
            item: AggregatedMetrics {
                entity_id: row.entity_id.clone(),
                level: row.level(),
                name: None,
                status: None,
                objective: None,
                account_name: None,
                date_start: row.metrics_date,
                date_stop: row.date_stop.unwrap_or(row.metrics_date),
                spend: 0.0,
                impressions: 0,
                clicks: 0,
                reach: 0,
                cpm: 0.0,
                cpc: 0.0,
                ctr: 0.0,
                days: 0,
            },
            cpm_sum: 0.0,
            cpc_sum: 0.0,
            ctr_sum: 0.0,
        }
    }

    fn add(&mut self, row: &AdMetricRow) {
        let item = &mut self.item;
        // описательные поля берутся из первой строки, где они заданы
        if item.name.is_none() {
            item.name = row.name.clone();
        }
        if item.status.is_none() {
            item.status = row.status.clone();
        }
        if item.objective.is_none() {
            item.objective = row.details.objective().map(str::to_string);
        }
        if item.account_name.is_none() {
            item.account_name = row.account_name.clone();
        }

        item.date_start = item.date_start.min(row.metrics_date);
        item.date_stop = item.date_stop.max(row.date_stop.unwrap_or(row.metrics_date));

        let m = &row.metrics;
        item.spend += m.spend;
        item.impressions += m.impressions;
        item.clicks += m.clicks;
        item.reach = item.reach.max(m.reach);
        self.cpm_sum += m.cpm;
        self.cpc_sum += m.cpc;
        self.ctr_sum += m.ctr;
        item.days += 1;
    }

    fn finish(mut self) -> AggregatedMetrics {
        let days = self.item.days.max(1) as f64;
        self.item.cpm = self.cpm_sum / days;
        self.item.cpc = self.cpc_sum / days;
        self.item.ctr = self.ctr_sum / days;
        self.item
    }
}

/// Свернуть дневные строки по entity_id за один проход.
/// Результат упорядочен по entity_id.
pub fn aggregate(rows: &[AdMetricRow]) -> Vec<AggregatedMetrics> {
    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for row in rows {
        groups
            .entry(row.entity_id.as_str())
            .or_insert_with(|| Accumulator::start(row))
            .add(row);
    }
    groups.into_values().map(Accumulator::finish).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use contracts::domain::a007_ad_metrics::aggregate::{
        AdLevel, CampaignDetails, EntityDetails, InsightMetrics,
    };

    fn row(entity: &str, day: u32, spend: f64, reach: i64, cpm: f64) -> AdMetricRow {
        AdMetricRow {
            entity_id: entity.into(),
            metrics_date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            date_stop: NaiveDate::from_ymd_opt(2025, 3, day),
            account_id: "act".into(),
            account_name: Some("DNA".into()),
            name: if day == 2 { Some("Ventas".into()) } else { None },
            status: Some("ACTIVE".into()),
            metrics: InsightMetrics {
                spend,
                reach,
                cpm,
                impressions: 100,
                clicks: 3,
                ..Default::default()
            },
            details: EntityDetails::Campaign(CampaignDetails {
                objective: Some("OUTCOME_SALES".into()),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn rows_fold_per_entity() {
        let rows = vec![
            row("120", 3, 10.0, 500, 4.0),
            row("121", 1, 1.0, 10, 1.0),
            row("120", 2, 5.0, 800, 2.0),
        ];
        let report = aggregate(&rows);
        assert_eq!(report.len(), 2);

        let first = &report[0];
        assert_eq!(first.entity_id, "120");
        assert_eq!(first.level, AdLevel::Campaign);
        assert_eq!(first.name.as_deref(), Some("Ventas"));
        assert_eq!(first.objective.as_deref(), Some("OUTCOME_SALES"));
        assert_eq!(first.date_start, NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
        assert_eq!(first.date_stop, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        assert_eq!(first.spend, 15.0);
        assert_eq!(first.impressions, 200);
        assert_eq!(first.clicks, 6);
        assert_eq!(first.reach, 800);
        assert_eq!(first.cpm, 3.0);
        assert_eq!(first.days, 2);

        assert_eq!(report[1].entity_id, "121");
        assert_eq!(report[1].name, None);
    }

    #[test]
    fn empty_input_gives_empty_report() {
        assert!(aggregate(&[]).is_empty());
    }
}
