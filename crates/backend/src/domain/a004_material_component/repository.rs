use contracts::domain::a004_material_component::aggregate::MaterialComponent;
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a004_material_component")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub parent_id: Option<i64>,
    pub child_id: Option<i64>,
    pub quantity: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for MaterialComponent {
    fn from(m: Model) -> Self {
        MaterialComponent {
            id: m.id,
            parent_id: m.parent_id,
            child_id: m.child_id,
            quantity: m.quantity,
        }
    }
}

pub fn active_model(component: &MaterialComponent) -> ActiveModel {
    ActiveModel {
        id: Set(component.id),
        parent_id: Set(component.parent_id),
        child_id: Set(component.child_id),
        quantity: Set(component.quantity),
    }
}

pub async fn list_all<C: ConnectionTrait>(conn: &C) -> anyhow::Result<Vec<MaterialComponent>> {
    let items = Entity::find()
        .order_by_asc(Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(items)
}

/// Спецификации перестраиваются целиком, поэтому старые ребра удаляются все
pub async fn delete_all<C: ConnectionTrait>(conn: &C) -> Result<u64, DbErr> {
    let result = Entity::delete_many().exec(conn).await?;
    Ok(result.rows_affected)
}
