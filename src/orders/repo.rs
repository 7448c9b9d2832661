use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::orders::repo_types::{DateRange, NewOrder, Order, OrderItem, OrderRow};
use crate::store::PgStore;

#[async_trait]
pub trait OrderRepo: Send + Sync {
    /// Inserts the order with its items and flags the listed uploads, atomically.
    async fn create(&self, new: NewOrder) -> anyhow::Result<Order>;
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Order>>;
    async fn list_in_range(&self, range: DateRange) -> anyhow::Result<Vec<Order>>;
}

#[derive(FromRow)]
struct ItemRow {
    order_id: Uuid,
    #[sqlx(flatten)]
    item: OrderItem,
}

async fn attach_items(db: &PgPool, rows: Vec<OrderRow>) -> anyhow::Result<Vec<Order>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let items = sqlx::query_as::<_, ItemRow>(
        r#"
        SELECT order_id, product_id, product_name, unit_price, quantity
          FROM order_items
         WHERE order_id = ANY($1)
        "#,
    )
    .bind(&ids)
    .fetch_all(db)
    .await
    .context("load order items")?;

    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for row in items {
        by_order.entry(row.order_id).or_default().push(row.item);
    }
    Ok(rows
        .into_iter()
        .map(|r| {
            let items = by_order.remove(&r.id).unwrap_or_default();
            Order::from_row(r, items)
        })
        .collect())
}

#[async_trait]
impl OrderRepo for PgStore {
    async fn create(&self, new: NewOrder) -> anyhow::Result<Order> {
        let total = new.total();
        let mut tx = self.db.begin().await.context("begin tx")?;

        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO orders (id, user_id, payment_intent_id, total)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, payment_intent_id, total, created_at
            "#,
        )
        .bind(new.id)
        .bind(new.user_id)
        .bind(&new.payment_intent_id)
        .bind(total)
        .fetch_one(&mut *tx)
        .await
        .context("insert order")?;

        for item in &new.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, product_name, unit_price, quantity)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(new.id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.unit_price)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await
            .context("insert order item")?;
        }

        if !new.upload_ids.is_empty() {
            sqlx::query(
                r#"
                UPDATE uploads
                   SET ordered = TRUE, in_cart = FALSE, updated_at = now()
                 WHERE user_id = $1 AND id = ANY($2)
                "#,
            )
            .bind(new.user_id)
            .bind(&new.upload_ids)
            .execute(&mut *tx)
            .await
            .context("flag ordered uploads")?;
        }

        tx.commit().await.context("commit tx")?;
        Ok(Order::from_row(row, new.items))
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, payment_intent_id, total, created_at
              FROM orders
             WHERE user_id = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list orders by user")?;
        attach_items(&self.db, rows).await
    }

    async fn list_in_range(&self, range: DateRange) -> anyhow::Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, payment_intent_id, total, created_at
              FROM orders
             WHERE ($1::timestamptz IS NULL OR created_at >= $1)
               AND ($2::timestamptz IS NULL OR created_at < $2)
             ORDER BY created_at ASC
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.db)
        .await
        .context("list orders in range")?;
        attach_items(&self.db, rows).await
    }
}
