use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Тип товара, вычисляемый по таблице правил при нормализации
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Discontinued,
    Tolling,
    Commercial,
    Replenishable,
    NonReplenishable,
    Other,
}

impl ProductType {
    pub fn label(&self) -> &'static str {
        match self {
            ProductType::Discontinued => "DESCONTINUADO",
            ProductType::Tolling => "MAQUILAS",
            ProductType::Commercial => "PRODUCTO COMERCIAL",
            ProductType::Replenishable => "RESURTIBLE",
            ProductType::NonReplenishable => "NO RESURTIBLE",
            ProductType::Other => "OTROS",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "DESCONTINUADO" => Some(ProductType::Discontinued),
            "MAQUILAS" => Some(ProductType::Tolling),
            "PRODUCTO COMERCIAL" => Some(ProductType::Commercial),
            "RESURTIBLE" => Some(ProductType::Replenishable),
            "NO RESURTIBLE" => Some(ProductType::NonReplenishable),
            "OTROS" => Some(ProductType::Other),
            _ => None,
        }
    }
}

/// Товар или материал склада данных.
///
/// `temporary_id` назначается ERP с первого появления записи и служит основным
/// ключом сопоставления. `confirmed_id` равен 0, пока ERP не утвердила вариант.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "temporaryId")]
    pub temporary_id: i64,
    #[serde(rename = "confirmedId")]
    pub confirmed_id: i64,
    pub name: String,
    pub sku: String,
    pub brand: String,
    pub category: String,
    #[serde(rename = "stockOnHand")]
    pub stock_on_hand: f64,
    #[serde(rename = "stockOnOrder")]
    pub stock_on_order: f64,
    #[serde(rename = "maxQty")]
    pub max_qty: f64,
    #[serde(rename = "minQty")]
    pub min_qty: f64,
    #[serde(rename = "productType")]
    pub product_type: ProductType,
    #[serde(rename = "creationDate")]
    pub creation_date: Option<NaiveDateTime>,
    pub supplier: String,
    #[serde(rename = "leadTimeDays")]
    pub lead_time_days: i32,
}

impl Product {
    pub fn has_confirmed_id(&self) -> bool {
        self.confirmed_id != 0
    }

    /// Совпадают ли поля, которые перезаписывает обновляющая выгрузка
    pub fn same_mutable_fields(&self, other: &Product) -> bool {
        self.confirmed_id == other.confirmed_id
            && self.name == other.name
            && self.sku == other.sku
            && self.brand == other.brand
            && self.category == other.category
            && self.stock_on_hand == other.stock_on_hand
            && self.stock_on_order == other.stock_on_order
            && self.max_qty == other.max_qty
            && self.min_qty == other.min_qty
            && self.product_type == other.product_type
            && self.supplier == other.supplier
            && self.lead_time_days == other.lead_time_days
    }

    /// Полная перезапись изменяемых полей, ключ и дата создания сохраняются
    pub fn apply_mutable_fields(&mut self, other: &Product) {
        self.confirmed_id = other.confirmed_id;
        self.name = other.name.clone();
        self.sku = other.sku.clone();
        self.brand = other.brand.clone();
        self.category = other.category.clone();
        self.stock_on_hand = other.stock_on_hand;
        self.stock_on_order = other.stock_on_order;
        self.max_qty = other.max_qty;
        self.min_qty = other.min_qty;
        self.product_type = other.product_type;
        self.supplier = other.supplier.clone();
        self.lead_time_days = other.lead_time_days;
    }
}
