use chrono::{DateTime, Utc};
use contracts::domain::a006_ad_account::aggregate::AdAccount;
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a006_ad_account")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub account_id: String,
    pub account_name: String,
    pub account_key: String,
    pub is_active: bool,
    pub has_valid_token: bool,
    pub last_sync_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for AdAccount {
    fn from(m: Model) -> Self {
        AdAccount {
            account_id: m.account_id,
            account_name: m.account_name,
            account_key: m.account_key,
            is_active: m.is_active,
            has_valid_token: m.has_valid_token,
            last_sync_date: m.last_sync_date,
        }
    }
}

pub async fn list_all<C: ConnectionTrait>(conn: &C) -> anyhow::Result<Vec<AdAccount>> {
    let items = Entity::find()
        .order_by_asc(Column::AccountName)
        .all(conn)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(items)
}

pub async fn get_by_id<C: ConnectionTrait>(
    conn: &C,
    account_id: &str,
) -> anyhow::Result<Option<AdAccount>> {
    let result = Entity::find_by_id(account_id.to_string()).one(conn).await?;
    Ok(result.map(Into::into))
}

pub async fn insert<C: ConnectionTrait>(conn: &C, account: &AdAccount) -> Result<(), DbErr> {
    let now = Utc::now();
    let active = ActiveModel {
        account_id: Set(account.account_id.clone()),
        account_name: Set(account.account_name.clone()),
        account_key: Set(account.account_key.clone()),
        is_active: Set(account.is_active),
        has_valid_token: Set(account.has_valid_token),
        last_sync_date: Set(account.last_sync_date),
        created_at: Set(Some(now)),
        updated_at: Set(Some(now)),
    };
    Entity::insert(active).exec_without_returning(conn).await?;
    Ok(())
}

/// Перезапись описательных полей; дата последней синхронизации не трогается
pub async fn update_descriptor<C: ConnectionTrait>(
    conn: &C,
    account: &AdAccount,
) -> Result<(), DbErr> {
    let active = ActiveModel {
        account_id: Set(account.account_id.clone()),
        account_name: Set(account.account_name.clone()),
        account_key: Set(account.account_key.clone()),
        is_active: Set(account.is_active),
        updated_at: Set(Some(Utc::now())),
        ..Default::default()
    };
    active.update(conn).await?;
    Ok(())
}

/// Отметить успешную выгрузку показателей аккаунта
pub async fn touch_last_sync<C: ConnectionTrait>(
    conn: &C,
    account_id: &str,
    at: DateTime<Utc>,
) -> Result<(), DbErr> {
    let active = ActiveModel {
        account_id: Set(account_id.to_string()),
        last_sync_date: Set(Some(at)),
        updated_at: Set(Some(at)),
        ..Default::default()
    };
    active.update(conn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db;

    fn account(id: &str, key: &str) -> AdAccount {
        AdAccount {
            account_id: id.into(),
            account_name: format!("Account {}", id),
            account_key: key.into(),
            is_active: true,
            has_valid_token: true,
            last_sync_date: None,
        }
    }

    #[tokio::test]
    async fn descriptor_update_keeps_last_sync() {
        let conn = db::connect_in_memory().await.unwrap();
        insert(&conn, &account("1", "dna")).await.unwrap();

        let at = Utc::now();
        touch_last_sync(&conn, "1", at).await.unwrap();

        let mut renamed = account("1", "dna");
        renamed.account_name = "DNA Shop".into();
        renamed.is_active = false;
        update_descriptor(&conn, &renamed).await.unwrap();

        let stored = get_by_id(&conn, "1").await.unwrap().unwrap();
        assert_eq!(stored.account_name, "DNA Shop");
        assert!(!stored.is_active);
        assert!(stored.last_sync_date.is_some());
    }

    #[tokio::test]
    async fn account_key_is_unique() {
        let conn = db::connect_in_memory().await.unwrap();
        insert(&conn, &account("1", "dna")).await.unwrap();
        assert!(insert(&conn, &account("2", "dna")).await.is_err());
    }
}
