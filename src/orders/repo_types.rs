use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    pub product_name: String, // snapshot at order time
    pub unit_price: f64,
    pub quantity: i32,
}

impl OrderItem {
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub payment_intent_id: Option<String>,
    pub total: f64,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub payment_intent_id: Option<String>,
    pub total: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub items: Vec<OrderItem>,
}

impl Order {
    pub fn from_row(r: OrderRow, items: Vec<OrderItem>) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            payment_intent_id: r.payment_intent_id,
            total: r.total,
            created_at: r.created_at,
            items,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub payment_intent_id: Option<String>,
    pub items: Vec<OrderItem>,
    /// Uploads of `user_id` to flag as ordered.
    pub upload_ids: Vec<Uuid>,
}

impl NewOrder {
    pub fn total(&self) -> f64 {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}

/// Half-open creation-time window; `None` leaves that side unbounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub from: Option<OffsetDateTime>,
    pub to: Option<OffsetDateTime>,
}
