use contracts::domain::a002_product::aggregate::ProductType;

/// Профиль выгрузки товара: готовая продукция или материал (сырье, упаковка)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductProfile {
    FinishedGood,
    Supply,
}

impl ProductProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductProfile::FinishedGood => "products",
            ProductProfile::Supply => "supplies",
        }
    }
}

/// Признаки товара, от которых зависит тип
#[derive(Debug, Clone, Copy)]
pub struct TypeInputs<'a> {
    pub active: bool,
    pub category: &'a str,
    pub sku: &'a str,
    pub route_count: usize,
    /// sale_ok у готовой продукции, purchase_ok у материалов
    pub orderable: bool,
}

/// Таблица правил в фиксированном порядке приоритета.
/// Проверки категории и артикула: вхождение подстроки с учетом регистра.
pub fn classify(profile: ProductProfile, inputs: &TypeInputs<'_>) -> ProductType {
    if !inputs.active {
        return ProductType::Discontinued;
    }

    let has_routes = inputs.route_count > 0;
    match profile {
        ProductProfile::FinishedGood => {
            if inputs.category.contains("MAQUILAS") || inputs.sku.contains("MT") {
                ProductType::Tolling
            } else if inputs.sku.contains("PC") {
                ProductType::Commercial
            } else if inputs.sku.contains("PT") && has_routes && inputs.orderable {
                ProductType::Replenishable
            } else if inputs.sku.contains("PT") {
                ProductType::NonReplenishable
            } else {
                ProductType::Other
            }
        }
        ProductProfile::Supply => {
            if inputs.category.contains("MAQUILA") || inputs.sku.contains("MT") {
                ProductType::Tolling
            } else if has_routes && inputs.orderable {
                ProductType::Replenishable
            } else {
                ProductType::NonReplenishable
            }
        }
    }
}
