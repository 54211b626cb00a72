use chrono::NaiveDate;
use contracts::domain::a001_client::aggregate::{ClientId, CustomerType};
use contracts::domain::a003_sale::aggregate::Sale;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder, QuerySelect, Set};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a003_sale")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub date: NaiveDate,
    pub client_id: i64,
    pub ship_city: String,
    pub ship_state: String,
    pub ship_country: String,
    pub business_unit: String,
    pub salesperson: String,
    pub total_amount: f64,
    pub customer_type_at_time: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Sale {
    fn from(m: Model) -> Self {
        Sale {
            code: m.code,
            date: m.date,
            client_id: m.client_id,
            ship_city: m.ship_city,
            ship_state: m.ship_state,
            ship_country: m.ship_country,
            business_unit: m.business_unit,
            salesperson: m.salesperson,
            total_amount: m.total_amount,
            customer_type_at_time: m
                .customer_type_at_time
                .as_deref()
                .and_then(CustomerType::from_label),
        }
    }
}

pub fn active_model(sale: &Sale) -> ActiveModel {
    ActiveModel {
        code: Set(sale.code.clone()),
        date: Set(sale.date),
        client_id: Set(sale.client_id),
        ship_city: Set(sale.ship_city.clone()),
        ship_state: Set(sale.ship_state.clone()),
        ship_country: Set(sale.ship_country.clone()),
        business_unit: Set(sale.business_unit.clone()),
        salesperson: Set(sale.salesperson.clone()),
        total_amount: Set(sale.total_amount),
        customer_type_at_time: Set(sale
            .customer_type_at_time
            .map(|t| t.label().to_string())),
    }
}

/// Все известные коды продаж
pub async fn list_codes<C: ConnectionTrait>(conn: &C) -> anyhow::Result<Vec<String>> {
    let codes = Entity::find()
        .select_only()
        .column(Column::Code)
        .into_tuple::<String>()
        .all(conn)
        .await?;
    Ok(codes)
}

/// Дата последней сохраненной продажи каждого клиента
pub async fn last_sale_dates<C: ConnectionTrait>(
    conn: &C,
) -> anyhow::Result<HashMap<ClientId, NaiveDate>> {
    let rows = Entity::find()
        .select_only()
        .column(Column::ClientId)
        .column(Column::Date)
        .order_by_asc(Column::Date)
        .into_tuple::<(i64, NaiveDate)>()
        .all(conn)
        .await?;

    // строки упорядочены по дате, последняя запись клиента побеждает
    Ok(rows.into_iter().collect())
}

pub async fn get_by_code<C: ConnectionTrait>(conn: &C, code: &str) -> anyhow::Result<Option<Sale>> {
    let result = Entity::find_by_id(code.to_string()).one(conn).await?;
    Ok(result.map(Into::into))
}

/// Продажи клиента в хронологическом порядке
pub async fn list_by_client<C: ConnectionTrait>(
    conn: &C,
    client_id: ClientId,
) -> anyhow::Result<Vec<Sale>> {
    let items = Entity::find()
        .filter(Column::ClientId.eq(client_id))
        .order_by_asc(Column::Date)
        .order_by_asc(Column::Code)
        .all(conn)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(items)
}

/// Единственное допустимое изменение сохраненной продажи
pub async fn set_customer_type_at_time<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    customer_type: Option<CustomerType>,
) -> Result<(), DbErr> {
    Entity::update_many()
        .col_expr(
            Column::CustomerTypeAtTime,
            Expr::value(customer_type.map(|t| t.label().to_string())),
        )
        .filter(Column::Code.eq(code))
        .exec(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::a001_client::repository as clients;
    use crate::shared::data::db;
    use contracts::domain::a001_client::aggregate::Client;

    fn sale(code: &str, date: &str) -> Sale {
        Sale {
            code: code.into(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            client_id: 1,
            ship_city: String::new(),
            ship_state: String::new(),
            ship_country: String::new(),
            business_unit: String::new(),
            salesperson: String::new(),
            total_amount: 100.0,
            customer_type_at_time: None,
        }
    }

    #[tokio::test]
    async fn last_sale_date_is_the_latest_per_client() {
        let conn = db::connect_in_memory().await.unwrap();
        clients::insert(&conn, &Client::new(1, "A".into(), "".into(), "".into(), "".into()))
            .await
            .unwrap();

        for s in [sale("F2", "2025-03-01"), sale("F1", "2025-01-05"), sale("R1", "2025-02-01")] {
            Entity::insert(active_model(&s))
                .exec_without_returning(&conn)
                .await
                .unwrap();
        }

        let dates = last_sale_dates(&conn).await.unwrap();
        assert_eq!(dates.get(&1), NaiveDate::from_ymd_opt(2025, 3, 1).as_ref());

        let mut codes = list_codes(&conn).await.unwrap();
        codes.sort();
        assert_eq!(codes, vec!["F1", "F2", "R1"]);

        set_customer_type_at_time(&conn, "F1", Some(CustomerType::Portfolio))
            .await
            .unwrap();
        let stored = get_by_code(&conn, "F1").await.unwrap().unwrap();
        assert_eq!(stored.customer_type_at_time, Some(CustomerType::Portfolio));

        let history = list_by_client(&conn, 1).await.unwrap();
        let order: Vec<_> = history.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(order, vec!["F1", "R1", "F2"]);
    }
}
