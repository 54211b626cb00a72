use chrono::{DateTime, NaiveDate, Utc};
use contracts::domain::a007_ad_metrics::aggregate::AdLevel;
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, EntityTrait, Set};

/// Сохраненный диапазон дат выгрузки по (аккаунт, уровень)
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a007_date_range_cache")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub account_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub level: String,
    pub since: NaiveDate,
    pub until: NaiveDate,
    pub stored_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub async fn get<C: ConnectionTrait>(
    conn: &C,
    account_id: &str,
    level: AdLevel,
) -> Result<Option<Model>, DbErr> {
    Entity::find_by_id((account_id.to_string(), level.as_str().to_string()))
        .one(conn)
        .await
}

pub async fn upsert<C: ConnectionTrait>(
    conn: &C,
    account_id: &str,
    level: AdLevel,
    since: NaiveDate,
    until: NaiveDate,
    stored_at: DateTime<Utc>,
) -> Result<(), DbErr> {
    let active = ActiveModel {
        account_id: Set(account_id.to_string()),
        level: Set(level.as_str().to_string()),
        since: Set(since),
        until: Set(until),
        stored_at: Set(stored_at),
    };
    Entity::insert(active)
        .on_conflict(
            OnConflict::columns([Column::AccountId, Column::Level])
                .update_columns([Column::Since, Column::Until, Column::StoredAt])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub async fn delete_by_account<C: ConnectionTrait>(conn: &C, account_id: &str) -> Result<u64, DbErr> {
    let result = Entity::delete_many()
        .filter(Column::AccountId.eq(account_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

pub async fn delete_all<C: ConnectionTrait>(conn: &C) -> Result<u64, DbErr> {
    Ok(Entity::delete_many().exec(conn).await?.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db;

    #[tokio::test]
    async fn upsert_replaces_the_stored_range() {
        let conn = db::connect_in_memory().await.unwrap();
        let d = |m, day| NaiveDate::from_ymd_opt(2025, m, day).unwrap();

        upsert(&conn, "act1", AdLevel::AdSet, d(1, 1), d(3, 1), Utc::now()).await.unwrap();
        upsert(&conn, "act1", AdLevel::AdSet, d(1, 1), d(3, 2), Utc::now()).await.unwrap();

        let stored = get(&conn, "act1", AdLevel::AdSet).await.unwrap().unwrap();
        assert_eq!(stored.level, "adset");
        assert_eq!(stored.until, d(3, 2));
        assert!(get(&conn, "act1", AdLevel::Ad).await.unwrap().is_none());
    }
}
