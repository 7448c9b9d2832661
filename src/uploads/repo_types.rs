use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A client image stored in object storage.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Upload {
    pub id: Uuid,
    pub user_id: Uuid,
    pub s3_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub in_cart: bool,
    pub ordered: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUpload {
    pub id: Uuid,
    pub user_id: Uuid,
    pub s3_key: String,
    pub content_type: String,
    pub size_bytes: i64,
}

#[derive(Debug, Clone, Default)]
pub struct UploadFilter {
    pub user_id: Option<Uuid>,
    pub in_cart: Option<bool>,
    pub ordered: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}

/// Partial update of the association flags; `None` leaves a flag unchanged.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFlags {
    pub in_cart: Option<bool>,
    pub ordered: Option<bool>,
}
