use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{
    page, AdminUploadQuery, CreateUploadBase64, CreatedUploadResponse, Pagination, UploadView,
};
use super::repo_types::{Upload, UploadFilter, UploadFlags};
use super::services::{
    decode_image_payload, ensure_image, presign, remove_upload, store_upload, UploadItem,
};
use crate::{
    auth::{AdminUser, AuthUser},
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery},
    state::AppState,
};

pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/uploads", get(list_own_uploads).post(create_upload_multipart))
        .route("/uploads/base64", post(create_upload_base64))
        .route("/uploads/:id", patch(update_upload).delete(delete_upload))
        .route("/uploads/:id/image", get(redirect_to_image))
        .route("/admin/uploads", get(list_all_uploads))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// POST /uploads (multipart, field `file`)
#[instrument(skip(state, mp))]
pub async fn create_upload_multipart(
    State(state): State<AppState>,
    auth: AuthUser,
    mut mp: Multipart,
) -> ApiResult<(StatusCode, Json<CreatedUploadResponse>)> {
    let mut item = None;
    while let Some(field) = mp.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "application/octet-stream".into());
        ensure_image(&content_type)?;
        let body = field.bytes().await?;
        item = Some(UploadItem { body, content_type });
        break;
    }
    let item = item.ok_or_else(|| ApiError::BadRequest("file is required".into()))?;
    if item.body.is_empty() {
        return Err(ApiError::BadRequest("file is empty".into()));
    }

    let upload = store_upload(&state, auth.id, item).await?;
    info!(upload_id = %upload.id, user_id = %auth.id, "upload stored");
    Ok((
        StatusCode::CREATED,
        Json(CreatedUploadResponse {
            id: upload.id,
            created_at: upload.created_at,
        }),
    ))
}

/// POST /uploads/base64 { image: "data:image/png;base64,...", contentType? }
#[instrument(skip(state, body))]
pub async fn create_upload_base64(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CreateUploadBase64>,
) -> ApiResult<(StatusCode, Json<CreatedUploadResponse>)> {
    let item = decode_image_payload(&body.image, body.content_type.as_deref())?;
    let upload = store_upload(&state, auth.id, item).await?;
    info!(upload_id = %upload.id, user_id = %auth.id, "upload stored");
    Ok((
        StatusCode::CREATED,
        Json(CreatedUploadResponse {
            id: upload.id,
            created_at: upload.created_at,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_own_uploads(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(p): ApiQuery<Pagination>,
) -> ApiResult<Json<Vec<UploadView>>> {
    let (limit, offset) = page(p.limit, p.offset);
    let filter = UploadFilter {
        user_id: Some(auth.id),
        limit,
        offset,
        ..Default::default()
    };
    list_with_urls(&state, &filter).await.map(Json)
}

#[instrument(skip(state))]
pub async fn list_all_uploads(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(q): ApiQuery<AdminUploadQuery>,
) -> ApiResult<Json<Vec<UploadView>>> {
    let (limit, offset) = page(q.limit, q.offset);
    let filter = UploadFilter {
        user_id: q.user_id,
        in_cart: q.in_cart,
        ordered: q.ordered,
        limit,
        offset,
    };
    list_with_urls(&state, &filter).await.map(Json)
}

#[instrument(skip(state))]
pub async fn update_upload(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(flags): ApiJson<UploadFlags>,
) -> ApiResult<Json<UploadView>> {
    load_accessible(&state, auth, id).await?;
    let upload = state
        .uploads
        .update_flags(id, flags)
        .await?
        .ok_or_else(not_found)?;
    let url = presign(&state, &upload.s3_key).await?;
    Ok(Json(UploadView::new(upload, url)))
}

/// 307 → presigned url of the stored image
#[instrument(skip(state))]
pub async fn redirect_to_image(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Redirect> {
    let upload = load_accessible(&state, auth, id).await?;
    let url = presign(&state, &upload.s3_key).await?;
    Ok(Redirect::temporary(&url))
}

#[instrument(skip(state))]
pub async fn delete_upload(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    let upload = load_accessible(&state, auth, id).await?;
    remove_upload(&state, &upload).await?;
    info!(upload_id = %id, user_id = %auth.id, "upload deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_with_urls(state: &AppState, filter: &UploadFilter) -> ApiResult<Vec<UploadView>> {
    let uploads = state.uploads.list(filter).await?;
    let mut out = Vec::with_capacity(uploads.len());
    for u in uploads {
        let url = presign(state, &u.s3_key).await?;
        out.push(UploadView::new(u, url));
    }
    Ok(out)
}

/// Owners and admins see an upload; everyone else gets 404.
async fn load_accessible(state: &AppState, auth: AuthUser, id: Uuid) -> ApiResult<Upload> {
    let upload = state.uploads.find(id).await?.ok_or_else(not_found)?;
    if upload.user_id != auth.id && !auth.is_admin {
        warn!(upload_id = %id, user_id = %auth.id, "upload access denied");
        return Err(not_found());
    }
    Ok(upload)
}

fn not_found() -> ApiError {
    ApiError::NotFound("Upload not found".into())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support::{delete, get, patch_json, post_json, TestApp};

    const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgo=";

    async fn upload(t: &TestApp, token: &str) -> String {
        let (status, body) = post_json(
            &t.app(),
            "/api/uploads/base64",
            json!({ "image": PNG_DATA_URL }),
            Some(token),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn base64_upload_is_listed_for_owner_only() {
        let t = TestApp::new();
        let alice = t.user_token("alice@example.com", false).await;
        let bob = t.user_token("bob@example.com", false).await;
        let id = upload(&t, &alice).await;

        let (status, list) = get(&t.app(), "/api/uploads", Some(&alice)).await;
        assert_eq!(status, StatusCode::OK);
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["id"], id.as_str());
        assert_eq!(list[0]["contentType"], "image/png");
        assert!(list[0]["url"].as_str().unwrap().contains("uploads/"));

        let (_, list) = get(&t.app(), "/api/uploads", Some(&bob)).await;
        assert!(list.as_array().unwrap().is_empty());

        let (status, _) = get(&t.app(), &format!("/api/uploads/{id}/image"), Some(&bob)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_requires_token() {
        let t = TestApp::new();
        let (status, _) = post_json(
            &t.app(),
            "/api/uploads/base64",
            json!({ "image": PNG_DATA_URL }),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn multipart_upload_stores_file() {
        let t = TestApp::new();
        let token = t.user_token("alice@example.com", false).await;
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"design.jpg\"\r\n\
             Content-Type: image/jpeg\r\n\r\n\
             jpegbytes\r\n\
             --{boundary}--\r\n"
        );
        let resp = t
            .app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/uploads")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let stored = t.storage.keys();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].ends_with(".jpg"));
    }

    #[tokio::test]
    async fn image_redirects_to_presigned_url() {
        let t = TestApp::new();
        let token = t.user_token("alice@example.com", false).await;
        let id = upload(&t, &token).await;

        let resp = t
            .app()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/uploads/{id}/image"))
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
        let location = resp.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://fake.local/uploads/"));
    }

    #[tokio::test]
    async fn admin_filters_and_updates_flags() {
        let t = TestApp::new();
        let alice = t.user_token("alice@example.com", false).await;
        let admin = t.user_token("admin@example.com", true).await;
        let first = upload(&t, &alice).await;
        upload(&t, &alice).await;

        let (status, _) = get(&t.app(), "/api/admin/uploads", Some(&alice)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, updated) = patch_json(
            &t.app(),
            &format!("/api/uploads/{first}"),
            json!({ "inCart": true }),
            Some(&admin),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["inCart"], true);
        assert_eq!(updated["ordered"], false);

        let (_, all) = get(&t.app(), "/api/admin/uploads", Some(&admin)).await;
        assert_eq!(all.as_array().unwrap().len(), 2);

        let (_, in_cart) = get(&t.app(), "/api/admin/uploads?inCart=true", Some(&admin)).await;
        let in_cart = in_cart.as_array().unwrap();
        assert_eq!(in_cart.len(), 1);
        assert_eq!(in_cart[0]["id"], first.as_str());
    }

    #[tokio::test]
    async fn listing_pages_and_clamps() {
        let t = TestApp::new();
        let alice = t.user_token("alice@example.com", false).await;
        let admin = t.user_token("admin@example.com", true).await;
        for _ in 0..3 {
            upload(&t, &alice).await;
        }

        let count = |v: serde_json::Value| v.as_array().unwrap().len();
        for (query, expected) in [
            ("limit=2", 2),
            ("limit=2&offset=2", 1),
            ("offset=3", 0),
            ("limit=0", 1),
            ("limit=500", 3),
            ("offset=-5", 3),
        ] {
            let (status, list) = get(&t.app(), &format!("/api/uploads?{query}"), Some(&alice)).await;
            assert_eq!(status, StatusCode::OK, "{query}");
            assert_eq!(count(list), expected, "{query}");
        }

        let (_, own) = get(&t.app(), "/api/uploads", Some(&alice)).await;
        let (_, page) = get(&t.app(), "/api/admin/uploads?limit=1&offset=1", Some(&admin)).await;
        assert_eq!(page.as_array().unwrap().len(), 1);
        assert_eq!(page[0]["id"], own[1]["id"]);
    }

    #[tokio::test]
    async fn malformed_paging_is_json_400() {
        let t = TestApp::new();
        let token = t.user_token("alice@example.com", false).await;
        let (status, body) = get(&t.app(), "/api/uploads?limit=abc", Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn oversized_upload_is_413() {
        let t = TestApp::new();
        let token = t.user_token("alice@example.com", false).await;
        let image = "A".repeat(super::MAX_UPLOAD_BYTES + 1);
        let (status, body) = post_json(
            &t.app(),
            "/api/uploads/base64",
            json!({ "image": image }),
            Some(&token),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body["error"].is_string());
        assert!(t.storage.keys().is_empty());
    }

    #[tokio::test]
    async fn owner_deletes_upload() {
        let t = TestApp::new();
        let token = t.user_token("alice@example.com", false).await;
        let id = upload(&t, &token).await;
        assert_eq!(t.storage.keys().len(), 1);

        let (status, _) = delete(&t.app(), &format!("/api/uploads/{id}"), Some(&token)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(t.storage.keys().is_empty());

        let (status, _) = delete(&t.app(), &format!("/api/uploads/{id}"), Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rejects_non_image_payload() {
        let t = TestApp::new();
        let token = t.user_token("alice@example.com", false).await;
        let (status, _) = post_json(
            &t.app(),
            "/api/uploads/base64",
            json!({ "image": "aGVsbG8=", "contentType": "application/pdf" }),
            Some(&token),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
