use super::product_type::{self, ProductProfile, TypeInputs};
use crate::shared::normalizer::{self, Reference};
use contracts::domain::a002_product::aggregate::Product;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

pub const TEMPLATE_MODEL: &str = "product.template";
pub const VARIANT_MODEL: &str = "product.product";
pub const ORDERPOINT_MODEL: &str = "stock.warehouse.orderpoint";
pub const SUPPLIER_MODEL: &str = "product.supplierinfo";

const COMMON_FIELDS: &[&str] = &[
    "id",
    "name",
    "default_code",
    "qty_available",
    "incoming_qty",
    "product_brand_id",
    "categ_id",
    "route_ids",
    "product_variant_id",
    "create_date",
    "active",
];

pub const VARIANT_FIELDS: &[&str] = &["id", "product_tmpl_id"];
pub const ORDERPOINT_FIELDS: &[&str] = &["product_tmpl_id", "product_min_qty", "product_max_qty"];
pub const SUPPLIER_FIELDS: &[&str] = &["product_tmpl_id", "partner_id", "delay"];

/// Поля шаблона для профиля выгрузки
pub fn template_fields(profile: ProductProfile) -> Vec<&'static str> {
    let mut fields = COMMON_FIELDS.to_vec();
    fields.push(match profile {
        ProductProfile::FinishedGood => "sale_ok",
        ProductProfile::Supply => "purchase_ok",
    });
    fields
}

pub fn template_domain(profile: ProductProfile) -> Value {
    let flag = match profile {
        ProductProfile::FinishedGood => "sale_ok",
        ProductProfile::Supply => "purchase_ok",
    };
    json!([
        [flag, "=", true],
        "|",
        ["active", "=", true],
        ["active", "=", false]
    ])
}

fn default_true() -> bool {
    true
}

/// Шаблон товара в форме ответа ERP
#[derive(Debug, Clone, Deserialize)]
pub struct ErpProductRecord {
    pub id: i64,
    #[serde(deserialize_with = "normalizer::text", default)]
    pub name: String,
    #[serde(deserialize_with = "normalizer::text", default)]
    pub default_code: String,
    #[serde(deserialize_with = "normalizer::number", default)]
    pub qty_available: f64,
    #[serde(deserialize_with = "normalizer::number", default)]
    pub incoming_qty: f64,
    #[serde(deserialize_with = "normalizer::reference", default)]
    pub product_brand_id: Option<Reference>,
    #[serde(deserialize_with = "normalizer::reference", default)]
    pub categ_id: Option<Reference>,
    #[serde(deserialize_with = "normalizer::id_list", default)]
    pub route_ids: Vec<i64>,
    #[serde(deserialize_with = "normalizer::reference", default)]
    pub product_variant_id: Option<Reference>,
    #[serde(deserialize_with = "normalizer::flag", default)]
    pub sale_ok: bool,
    #[serde(deserialize_with = "normalizer::flag", default)]
    pub purchase_ok: bool,
    #[serde(deserialize_with = "normalizer::text", default)]
    pub create_date: String,
    #[serde(default = "default_true")]
    pub active: bool,
    // заполняются только для материалов, см. merge_supply_extras
    #[serde(deserialize_with = "normalizer::number", default)]
    pub product_min_qty: f64,
    #[serde(deserialize_with = "normalizer::number", default)]
    pub product_max_qty: f64,
    #[serde(deserialize_with = "normalizer::text", default)]
    pub supplier_name: String,
    #[serde(deserialize_with = "normalizer::integer", default)]
    pub supplier_delay: i64,
}

impl ErpProductRecord {
    pub fn to_aggregate(&self, profile: ProductProfile) -> Product {
        let sku = self.default_code.clone();
        let category = normalizer::label_of(&self.categ_id);
        let orderable = match profile {
            ProductProfile::FinishedGood => self.sale_ok,
            ProductProfile::Supply => self.purchase_ok,
        };
        let product_type = product_type::classify(
            profile,
            &TypeInputs {
                active: self.active,
                category: &category,
                sku: &sku,
                route_count: self.route_ids.len(),
                orderable,
            },
        );

        Product {
            temporary_id: self.id,
            confirmed_id: normalizer::id_of(&self.product_variant_id).unwrap_or(0),
            name: self.name.clone(),
            sku,
            brand: normalizer::label_of(&self.product_brand_id),
            category,
            stock_on_hand: self.qty_available,
            stock_on_order: self.incoming_qty,
            max_qty: self.product_max_qty,
            min_qty: self.product_min_qty,
            product_type,
            creation_date: normalizer::parse_datetime(&self.create_date),
            supplier: self.supplier_name.clone(),
            lead_time_days: i32::try_from(self.supplier_delay).unwrap_or(0),
        }
    }
}

fn template_id_of(record: &Value, field: &str) -> Option<i64> {
    match record.get(field)? {
        Value::Array(items) => items.first()?.as_i64(),
        other => other.as_i64(),
    }
}

/// Шаблоны без варианта в ответе получают id варианта из product.product
pub fn fill_missing_variants(templates: &mut [Value], variants: &[Value]) {
    let by_template: HashMap<i64, i64> = variants
        .iter()
        .filter_map(|v| Some((template_id_of(v, "product_tmpl_id")?, v.get("id")?.as_i64()?)))
        .collect();

    for template in templates.iter_mut() {
        let has_variant = matches!(template.get("product_variant_id"), Some(Value::Array(_)));
        if has_variant {
            continue;
        }
        let Some(id) = template.get("id").and_then(Value::as_i64) else {
            continue;
        };
        if let (Some(variant_id), Some(obj)) = (by_template.get(&id), template.as_object_mut()) {
            obj.insert("product_variant_id".into(), json!([variant_id, ""]));
        }
    }
}

/// Дописать к шаблонам материалов мин/макс из правил пополнения и
/// поставщика со сроком поставки
pub fn merge_supply_extras(templates: &mut [Value], orderpoints: &[Value], suppliers: &[Value]) {
    let mut minmax: HashMap<i64, (Value, Value)> = HashMap::new();
    for op in orderpoints {
        if let Some(id) = template_id_of(op, "product_tmpl_id") {
            minmax.insert(
                id,
                (
                    op.get("product_min_qty").cloned().unwrap_or(Value::Null),
                    op.get("product_max_qty").cloned().unwrap_or(Value::Null),
                ),
            );
        }
    }

    // первый поставщик в выдаче считается основным
    let mut seller: HashMap<i64, (Value, Value)> = HashMap::new();
    for s in suppliers {
        if let Some(id) = template_id_of(s, "product_tmpl_id") {
            let name = s
                .get("partner_id")
                .and_then(|p| p.get(1))
                .cloned()
                .unwrap_or(Value::Null);
            let delay = s.get("delay").cloned().unwrap_or(Value::Null);
            seller.entry(id).or_insert((name, delay));
        }
    }

    for template in templates.iter_mut() {
        let Some(id) = template.get("id").and_then(Value::as_i64) else {
            continue;
        };
        let Some(obj) = template.as_object_mut() else {
            continue;
        };
        if let Some((min, max)) = minmax.get(&id) {
            obj.insert("product_min_qty".into(), min.clone());
            obj.insert("product_max_qty".into(), max.clone());
        }
        if let Some((name, delay)) = seller.get(&id) {
            obj.insert("supplier_name".into(), name.clone());
            obj.insert("supplier_delay".into(), delay.clone());
        }
    }
}
