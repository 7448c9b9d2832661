use anyhow::Context;
use base64ct::{Base64, Encoding};
use bytes::Bytes;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::upload_key;
use crate::uploads::repo_types::{NewUpload, Upload};

/// Presigned URLs handed to clients and vendors stay valid this long.
pub const PRESIGN_TTL_SECS: u64 = 30 * 60;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Puts the image in object storage, then records it.
pub async fn store_upload(st: &AppState, user_id: Uuid, item: UploadItem) -> anyhow::Result<Upload> {
    let id = Uuid::new_v4();
    let key = upload_key(user_id, id, &item.content_type);
    let size_bytes = item.body.len() as i64;

    st.storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;

    st.uploads
        .insert(NewUpload {
            id,
            user_id,
            s3_key: key,
            content_type: item.content_type,
            size_bytes,
        })
        .await
}

/// Deletes the stored object, then the row.
pub async fn remove_upload(st: &AppState, upload: &Upload) -> anyhow::Result<()> {
    st.storage
        .delete_object(&upload.s3_key)
        .await
        .with_context(|| format!("delete_object {}", upload.s3_key))?;
    st.uploads.delete(upload.id).await?;
    Ok(())
}

pub async fn presign(st: &AppState, s3_key: &str) -> anyhow::Result<String> {
    st.storage
        .presign_get(s3_key, PRESIGN_TTL_SECS)
        .await
        .with_context(|| format!("presign url for s3_key {}", s3_key))
}

/// Accepts raw base64 or a `data:<mime>;base64,<payload>` URL, as produced by
/// `canvas.toDataURL()`.
pub fn decode_image_payload(
    input: &str,
    content_type: Option<&str>,
) -> Result<UploadItem, ApiError> {
    let input = input.trim();
    let (mime, payload) = match input.strip_prefix("data:") {
        Some(rest) => {
            let (meta, data) = rest
                .split_once(',')
                .ok_or_else(|| ApiError::BadRequest("malformed data URL".into()))?;
            let mime = meta
                .strip_suffix(";base64")
                .ok_or_else(|| ApiError::BadRequest("data URL must be base64".into()))?;
            (Some(mime), data)
        }
        None => (None, input),
    };

    let content_type = mime
        .or(content_type)
        .unwrap_or("image/png")
        .to_ascii_lowercase();
    ensure_image(&content_type)?;

    let bytes = Base64::decode_vec(payload)
        .map_err(|_| ApiError::BadRequest("invalid base64".into()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("image is empty".into()));
    }

    Ok(UploadItem {
        body: Bytes::from(bytes),
        content_type,
    })
}

pub fn ensure_image(content_type: &str) -> Result<(), ApiError> {
    if content_type.starts_with("image/") {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "unsupported content type {content_type}"
        )))
    }
}
