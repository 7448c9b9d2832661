use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use crate::store::PgStore;
use crate::uploads::repo_types::{NewUpload, Upload, UploadFilter, UploadFlags};

#[async_trait]
pub trait UploadRepo: Send + Sync {
    async fn insert(&self, new: NewUpload) -> anyhow::Result<Upload>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Upload>>;
    /// Newest first.
    async fn list(&self, filter: &UploadFilter) -> anyhow::Result<Vec<Upload>>;
    async fn update_flags(&self, id: Uuid, flags: UploadFlags) -> anyhow::Result<Option<Upload>>;
    /// Returns `false` when no row was deleted.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

const COLUMNS: &str =
    "id, user_id, s3_key, content_type, size_bytes, in_cart, ordered, created_at, updated_at";

#[async_trait]
impl UploadRepo for PgStore {
    async fn insert(&self, new: NewUpload) -> anyhow::Result<Upload> {
        let row = sqlx::query_as::<_, Upload>(&format!(
            r#"
            INSERT INTO uploads (id, user_id, s3_key, content_type, size_bytes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(new.id)
        .bind(new.user_id)
        .bind(&new.s3_key)
        .bind(&new.content_type)
        .bind(new.size_bytes)
        .fetch_one(&self.db)
        .await
        .context("insert upload")?;
        Ok(row)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Upload>> {
        let row = sqlx::query_as::<_, Upload>(&format!(
            "SELECT {COLUMNS} FROM uploads WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find upload")?;
        Ok(row)
    }

    async fn list(&self, filter: &UploadFilter) -> anyhow::Result<Vec<Upload>> {
        let rows = sqlx::query_as::<_, Upload>(&format!(
            r#"
            SELECT {COLUMNS}
              FROM uploads
             WHERE ($1::uuid IS NULL OR user_id = $1)
               AND ($2::bool IS NULL OR in_cart = $2)
               AND ($3::bool IS NULL OR ordered = $3)
             ORDER BY created_at DESC
             LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.in_cart)
        .bind(filter.ordered)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.db)
        .await
        .context("list uploads")?;
        Ok(rows)
    }

    async fn update_flags(&self, id: Uuid, flags: UploadFlags) -> anyhow::Result<Option<Upload>> {
        let row = sqlx::query_as::<_, Upload>(&format!(
            r#"
            UPDATE uploads
               SET in_cart = COALESCE($2, in_cart),
                   ordered = COALESCE($3, ordered),
                   updated_at = now()
             WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(flags.in_cart)
        .bind(flags.ordered)
        .fetch_optional(&self.db)
        .await
        .context("update upload flags")?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM uploads WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete upload")?;
        Ok(res.rows_affected() > 0)
    }
}
