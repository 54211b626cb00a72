use contracts::domain::a001_client::aggregate::{Client, ClientId, CustomerType};
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a001_client")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub customer_type: String,
    pub transaction_count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Client {
    fn from(m: Model) -> Self {
        let customer_type = CustomerType::from_label(&m.customer_type).unwrap_or_else(|| {
            tracing::warn!(
                "Unknown customer type '{}' for client {}, treating as new",
                m.customer_type,
                m.id
            );
            CustomerType::NewCustomer
        });
        Client {
            id: m.id,
            name: m.name,
            city: m.city,
            state: m.state,
            country: m.country,
            customer_type,
            transaction_count: m.transaction_count,
        }
    }
}

pub fn active_model(client: &Client) -> ActiveModel {
    ActiveModel {
        id: Set(client.id),
        name: Set(client.name.clone()),
        city: Set(client.city.clone()),
        state: Set(client.state.clone()),
        country: Set(client.country.clone()),
        customer_type: Set(client.customer_type.label().to_string()),
        transaction_count: Set(client.transaction_count),
    }
}

pub async fn list_all<C: ConnectionTrait>(conn: &C) -> anyhow::Result<Vec<Client>> {
    let items = Entity::find()
        .order_by_asc(Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(items)
}

pub async fn get_by_id<C: ConnectionTrait>(
    conn: &C,
    id: ClientId,
) -> anyhow::Result<Option<Client>> {
    let result = Entity::find_by_id(id).one(conn).await?;
    Ok(result.map(Into::into))
}

pub async fn insert<C: ConnectionTrait>(conn: &C, client: &Client) -> anyhow::Result<()> {
    Entity::insert(active_model(client))
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Полная перезапись строки клиента по id
pub async fn update<C: ConnectionTrait>(conn: &C, client: &Client) -> Result<(), DbErr> {
    active_model(client).update(conn).await?;
    Ok(())
}
