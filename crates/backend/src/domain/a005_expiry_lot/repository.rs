use chrono::NaiveDate;
use contracts::domain::a005_expiry_lot::aggregate::ExpiryLot;
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder, QuerySelect, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a005_expiry_lot")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub lot_id: i64,
    pub expiry_date: NaiveDate,
    pub quantity: i64,
    pub product_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ExpiryLot {
    fn from(m: Model) -> Self {
        ExpiryLot {
            lot_id: m.lot_id,
            expiry_date: m.expiry_date,
            quantity: m.quantity,
            product_id: m.product_id,
        }
    }
}

pub fn active_model(lot: &ExpiryLot) -> ActiveModel {
    ActiveModel {
        lot_id: Set(lot.lot_id),
        expiry_date: Set(lot.expiry_date),
        quantity: Set(lot.quantity),
        product_id: Set(lot.product_id),
    }
}

pub async fn list_all<C: ConnectionTrait>(conn: &C) -> anyhow::Result<Vec<ExpiryLot>> {
    let items = Entity::find()
        .order_by_asc(Column::LotId)
        .all(conn)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(items)
}

pub async fn list_ids<C: ConnectionTrait>(conn: &C) -> anyhow::Result<Vec<i64>> {
    let ids = Entity::find()
        .select_only()
        .column(Column::LotId)
        .into_tuple::<i64>()
        .all(conn)
        .await?;
    Ok(ids)
}

/// У существующей партии меняется только остаток
pub async fn update_quantity<C: ConnectionTrait>(
    conn: &C,
    lot_id: i64,
    quantity: i64,
) -> Result<(), DbErr> {
    let active = ActiveModel {
        lot_id: Set(lot_id),
        quantity: Set(quantity),
        ..Default::default()
    };
    active.update(conn).await?;
    Ok(())
}
