use crate::domain::a003_sale::from_erp::ErpSaleLineRecord;
use crate::shared::identity_index::IdentityIndex;
use crate::shared::normalizer;
use contracts::domain::a002_product::aggregate::Product;
use contracts::domain::a003_sale::aggregate::{is_credit_note_code, SaleLine};

/// Артикул в квадратных скобках в описании строки: `"[SKU123] Widget"`.
/// Берется текст между первой `[` и первой `]`.
pub fn bracket_sku(text: &str) -> Option<&str> {
    let open = text.find('[')?;
    let close = text.find(']')?;
    if close <= open {
        return None;
    }
    let sku = text[open + 1..close].trim();
    if sku.is_empty() {
        None
    } else {
        Some(sku)
    }
}

/// Индексы товаров склада для разрешения ссылок строк продаж
pub struct ProductLookup {
    by_temporary: IdentityIndex<i64, Product>,
    confirmed_to_temporary: IdentityIndex<i64, i64>,
    sku_to_temporary: IdentityIndex<String, i64>,
}

impl ProductLookup {
    pub fn build(products: Vec<Product>) -> Self {
        let confirmed_to_temporary = IdentityIndex::from_pairs(
            products
                .iter()
                .filter(|p| p.has_confirmed_id())
                .map(|p| (p.confirmed_id, p.temporary_id)),
        );
        let sku_to_temporary = IdentityIndex::from_pairs(
            products
                .iter()
                .filter(|p| !p.sku.is_empty())
                .map(|p| (p.sku.clone(), p.temporary_id)),
        );
        Self {
            by_temporary: IdentityIndex::build(products, |p| p.temporary_id),
            confirmed_to_temporary,
            sku_to_temporary,
        }
    }

    /// Подтвержденный id, затем временный id по id самой строки, затем
    /// артикул из описания
    pub fn resolve(&self, line: &ErpSaleLineRecord) -> Option<&Product> {
        if let Some(confirmed) = normalizer::id_of(&line.product_id) {
            if let Some(temporary) = self.confirmed_to_temporary.get(&confirmed) {
                return self.by_temporary.get(temporary);
            }
        }
        if let Some(product) = self.by_temporary.get(&line.id) {
            return Some(product);
        }
        let sku = bracket_sku(&line.name)?;
        let temporary = self.sku_to_temporary.get(&sku.to_string())?;
        self.by_temporary.get(temporary)
    }
}

/// Итог разрешения одной строки
#[derive(Debug, Clone, PartialEq)]
pub enum LineResolution {
    Resolved(SaleLine),
    /// Товар не найден, строка сохраняется без ссылки
    Unresolved(SaleLine),
    /// Товар не найден и обе цены нулевые
    Dropped,
}

pub fn resolve_line(lookup: &ProductLookup, sale_code: &str, line: &ErpSaleLineRecord) -> LineResolution {
    // у кредитных нот сумма строки хранится с обратным знаком
    let subtotal = if is_credit_note_code(sale_code) {
        -line.price_subtotal
    } else {
        line.price_subtotal
    };

    match lookup.resolve(line) {
        Some(product) => LineResolution::Resolved(SaleLine {
            id: None,
            sale_code: sale_code.to_string(),
            product_id: Some(product.temporary_id),
            name: product.name.clone(),
            sku: product.sku.clone(),
            brand: product.brand.clone(),
            category: product.category.clone(),
            quantity: line.quantity,
            unit_price: line.price_unit,
            subtotal,
        }),
        None if line.price_unit == 0.0 && line.price_subtotal == 0.0 => {
            tracing::info!(
                "Dropping line {} of {}: no product and zero prices ('{}')",
                line.id,
                sale_code,
                line.name
            );
            LineResolution::Dropped
        }
        None => {
            tracing::debug!("Line {} of {} has no matching product", line.id, sale_code);
            LineResolution::Unresolved(SaleLine {
                id: None,
                sale_code: sale_code.to_string(),
                product_id: None,
                name: line.name.clone(),
                sku: String::new(),
                brand: String::new(),
                category: String::new(),
                quantity: line.quantity,
                unit_price: line.price_unit,
                subtotal,
            })
        }
    }
}
