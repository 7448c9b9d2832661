use async_trait::async_trait;
use uuid::Uuid;

use crate::products::repo_types::{NewProduct, Product};
use crate::store::PgStore;

#[async_trait]
pub trait ProductRepo: Send + Sync {
    async fn create(&self, new: NewProduct) -> anyhow::Result<Product>;
    /// Full catalogue, oldest first.
    async fn list(&self) -> anyhow::Result<Vec<Product>>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Product>>;
}

#[async_trait]
impl ProductRepo for PgStore {
    async fn create(&self, new: NewProduct) -> anyhow::Result<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, category, image, price)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, category, image, price, created_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.category)
        .bind(&new.image)
        .bind(new.price)
        .fetch_one(&self.db)
        .await?;
        Ok(product)
    }

    async fn list(&self) -> anyhow::Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, category, image, price, created_at
            FROM products
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, category, image, price, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }
}
