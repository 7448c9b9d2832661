use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::uploads::repo_types::Upload;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUploadBase64 {
    pub image: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUploadResponse {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content_type: String,
    pub size_bytes: i64,
    pub in_cart: bool,
    pub ordered: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub url: String,
}

impl UploadView {
    pub fn new(u: Upload, url: String) -> Self {
        Self {
            id: u.id,
            user_id: u.user_id,
            content_type: u.content_type,
            size_bytes: u.size_bytes,
            in_cart: u.in_cart,
            ordered: u.ordered,
            created_at: u.created_at,
            updated_at: u.updated_at,
            url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUploadQuery {
    pub user_id: Option<Uuid>,
    pub in_cart: Option<bool>,
    pub ordered: Option<bool>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// Clamps client-supplied paging to sane bounds.
pub fn page(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, 100), offset.max(0))
}
