use contracts::domain::a002_product::aggregate::{Product, ProductType};
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a002_product")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub temporary_id: i64,
    pub confirmed_id: i64,
    pub name: String,
    pub sku: String,
    pub brand: String,
    pub category: String,
    pub stock_on_hand: f64,
    pub stock_on_order: f64,
    pub max_qty: f64,
    pub min_qty: f64,
    pub product_type: String,
    pub creation_date: Option<chrono::NaiveDateTime>,
    pub supplier: String,
    pub lead_time_days: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Product {
    fn from(m: Model) -> Self {
        Product {
            temporary_id: m.temporary_id,
            confirmed_id: m.confirmed_id,
            name: m.name,
            sku: m.sku,
            brand: m.brand,
            category: m.category,
            stock_on_hand: m.stock_on_hand,
            stock_on_order: m.stock_on_order,
            max_qty: m.max_qty,
            min_qty: m.min_qty,
            product_type: ProductType::from_label(&m.product_type).unwrap_or(ProductType::Other),
            creation_date: m.creation_date,
            supplier: m.supplier,
            lead_time_days: m.lead_time_days,
        }
    }
}

pub fn active_model(product: &Product) -> ActiveModel {
    ActiveModel {
        temporary_id: Set(product.temporary_id),
        confirmed_id: Set(product.confirmed_id),
        name: Set(product.name.clone()),
        sku: Set(product.sku.clone()),
        brand: Set(product.brand.clone()),
        category: Set(product.category.clone()),
        stock_on_hand: Set(product.stock_on_hand),
        stock_on_order: Set(product.stock_on_order),
        max_qty: Set(product.max_qty),
        min_qty: Set(product.min_qty),
        product_type: Set(product.product_type.label().to_string()),
        creation_date: Set(product.creation_date),
        supplier: Set(product.supplier.clone()),
        lead_time_days: Set(product.lead_time_days),
    }
}

pub async fn list_all<C: ConnectionTrait>(conn: &C) -> anyhow::Result<Vec<Product>> {
    let items = Entity::find()
        .order_by_asc(Column::TemporaryId)
        .all(conn)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(items)
}

pub async fn get_by_temporary_id<C: ConnectionTrait>(
    conn: &C,
    temporary_id: i64,
) -> anyhow::Result<Option<Product>> {
    let result = Entity::find_by_id(temporary_id).one(conn).await?;
    Ok(result.map(Into::into))
}

pub async fn insert<C: ConnectionTrait>(conn: &C, product: &Product) -> anyhow::Result<()> {
    Entity::insert(active_model(product))
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Перезапись изменяемых полей; дата создания не трогается
pub async fn update<C: ConnectionTrait>(conn: &C, product: &Product) -> Result<(), DbErr> {
    let mut active = active_model(product);
    active.creation_date = sea_orm::ActiveValue::NotSet;
    active.update(conn).await?;
    Ok(())
}
