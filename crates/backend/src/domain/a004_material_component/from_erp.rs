use crate::shared::identity_index::KeySet;
use crate::shared::normalizer::{self, Reference};
use contracts::domain::a004_material_component::aggregate::MaterialComponent;
use serde::Deserialize;
use serde_json::{json, Value};

pub const MODEL: &str = "mrp.bom.line";
pub const FIELDS: &[&str] = &["id", "parent_product_tmpl_id", "product_tmpl_id", "product_qty"];

pub fn domain() -> Value {
    json!([])
}

/// Строка спецификации в форме ответа ERP
#[derive(Debug, Clone, Deserialize)]
pub struct ErpBomLineRecord {
    pub id: i64,
    #[serde(deserialize_with = "normalizer::reference", default)]
    pub parent_product_tmpl_id: Option<Reference>,
    #[serde(deserialize_with = "normalizer::reference", default)]
    pub product_tmpl_id: Option<Reference>,
    #[serde(deserialize_with = "normalizer::number", default)]
    pub product_qty: f64,
}

impl ErpBomLineRecord {
    /// Концы ребра, которых нет среди товаров склада, остаются пустыми
    pub fn to_component(&self, products: &KeySet<i64>) -> MaterialComponent {
        let resolve = |reference: &Option<Reference>| {
            normalizer::id_of(reference).filter(|id| products.contains(id))
        };
        MaterialComponent {
            id: self.id,
            parent_id: resolve(&self.parent_product_tmpl_id),
            child_id: resolve(&self.product_tmpl_id),
            quantity: self.product_qty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ends_are_left_empty() {
        let record: ErpBomLineRecord = serde_json::from_value(json!({
            "id": 1,
            "parent_product_tmpl_id": [10, "Crema"],
            "product_tmpl_id": [99, "Frasco"],
            "product_qty": 1.5
        }))
        .unwrap();

        let component = record.to_component(&KeySet::build([10_i64, 20]));
        assert_eq!(component.parent_id, Some(10));
        assert_eq!(component.child_id, None);
        assert_eq!(component.quantity, 1.5);
    }
}
