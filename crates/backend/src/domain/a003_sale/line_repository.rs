use contracts::domain::a003_sale::aggregate::SaleLine;
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait, EntityTrait, QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a003_sale_line")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub sale_code: String,
    pub product_id: Option<i64>,
    pub name: String,
    pub sku: String,
    pub brand: String,
    pub category: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub subtotal: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SaleLine {
    fn from(m: Model) -> Self {
        SaleLine {
            id: Some(m.id),
            sale_code: m.sale_code,
            product_id: m.product_id,
            name: m.name,
            sku: m.sku,
            brand: m.brand,
            category: m.category,
            quantity: m.quantity,
            unit_price: m.unit_price,
            subtotal: m.subtotal,
        }
    }
}

/// id назначает хранилище
pub fn active_model(line: &SaleLine) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        sale_code: Set(line.sale_code.clone()),
        product_id: Set(line.product_id),
        name: Set(line.name.clone()),
        sku: Set(line.sku.clone()),
        brand: Set(line.brand.clone()),
        category: Set(line.category.clone()),
        quantity: Set(line.quantity),
        unit_price: Set(line.unit_price),
        subtotal: Set(line.subtotal),
    }
}

pub async fn list_by_sale<C: ConnectionTrait>(
    conn: &C,
    sale_code: &str,
) -> anyhow::Result<Vec<SaleLine>> {
    let items = Entity::find()
        .filter(Column::SaleCode.eq(sale_code))
        .order_by_asc(Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(items)
}

pub async fn count_all<C: ConnectionTrait>(conn: &C) -> anyhow::Result<u64> {
    Ok(Entity::find().count(conn).await?)
}
