use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::orders::repo_types::{Order, OrderItem};
use crate::state::AppState;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i64,
    pub revenue: f64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub order_count: usize,
    pub total_revenue: f64,
    pub products: Vec<ProductSales>,
}

/// Resolves requested lines against the catalogue, snapshotting name and price.
pub async fn price_items(
    st: &AppState,
    lines: &[(Uuid, i32)],
) -> Result<Vec<OrderItem>, ApiError> {
    if lines.is_empty() {
        return Err(ApiError::BadRequest("Order has no items".into()));
    }
    let mut items = Vec::with_capacity(lines.len());
    for &(product_id, quantity) in lines {
        if quantity <= 0 {
            return Err(ApiError::BadRequest("Quantity must be positive".into()));
        }
        let product = st
            .products
            .find(product_id)
            .await?
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown product {product_id}")))?;
        items.push(OrderItem {
            product_id,
            product_name: product.name,
            unit_price: product.price,
            quantity,
        });
    }
    Ok(items)
}

/// Aggregates orders per product, highest revenue first.
pub fn summarize(orders: &[Order]) -> SalesReport {
    let mut per_product: HashMap<Uuid, ProductSales> = HashMap::new();
    for item in orders.iter().flat_map(|o| &o.items) {
        let entry = per_product
            .entry(item.product_id)
            .or_insert_with(|| ProductSales {
                product_id: item.product_id,
                name: item.product_name.clone(),
                quantity: 0,
                revenue: 0.0,
            });
        entry.quantity += i64::from(item.quantity);
        entry.revenue += item.line_total();
    }

    let mut products: Vec<ProductSales> = per_product.into_values().collect();
    products.sort_by(|a, b| {
        b.revenue
            .total_cmp(&a.revenue)
            .then_with(|| a.name.cmp(&b.name))
    });

    SalesReport {
        order_count: orders.len(),
        total_revenue: orders.iter().map(|o| o.total).sum(),
        products,
    }
}
