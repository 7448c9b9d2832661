use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::provider::{MockupError, MockupRequest, MockupVendor};
use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    state::AppState,
    uploads::{
        handlers::MAX_UPLOAD_BYTES,
        services::{decode_image_payload, presign, remove_upload, store_upload},
    },
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMockupRequest {
    pub provider: MockupVendor,
    /// Design image as a data URL or raw base64.
    pub image: String,
    pub template: String,
    pub layer: Option<String>,
    #[serde(default)]
    pub variant_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMockupResponse {
    pub provider: MockupVendor,
    pub upload_id: Uuid,
    pub urls: Vec<String>,
}

pub fn mockup_routes() -> Router<AppState> {
    Router::new()
        .route("/mockups/providers", get(list_providers))
        .route("/mockups", post(generate_mockup))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

pub async fn list_providers(State(state): State<AppState>) -> Json<Vec<MockupVendor>> {
    Json(state.mockups.vendors())
}

#[instrument(skip(state, body), fields(provider = %body.provider))]
pub async fn generate_mockup(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<GenerateMockupRequest>,
) -> ApiResult<Json<GenerateMockupResponse>> {
    let provider = state.mockups.get(body.provider).ok_or_else(|| {
        ApiError::BadRequest(format!("mockup provider {} is not configured", body.provider))
    })?;

    let mut request = MockupRequest {
        image_url: String::new(),
        template: body.template,
        layer: body.layer,
        variant_ids: body.variant_ids,
    };
    provider.validate(&request).map_err(mockup_error)?;

    let design = decode_image_payload(&body.image, None)?;
    let upload = store_upload(&state, auth.id, design).await?;

    let rendered = match presign(&state, &upload.s3_key).await {
        Ok(url) => {
            request.image_url = url;
            provider.generate(&request).await.map_err(mockup_error)
        }
        Err(e) => Err(ApiError::from(e)),
    };
    let result = match rendered {
        Ok(result) => result,
        Err(e) => {
            // A design that produced no mockup is not kept.
            if let Err(cleanup) = remove_upload(&state, &upload).await {
                warn!(upload_id = %upload.id, error = %cleanup, "failed to discard design");
            }
            return Err(e);
        }
    };

    info!(upload_id = %upload.id, renders = result.urls.len(), "mockup generated");
    Ok(Json(GenerateMockupResponse {
        provider: body.provider,
        upload_id: upload.id,
        urls: result.urls,
    }))
}

fn mockup_error(e: MockupError) -> ApiError {
    error!(error = %e, "mockup generation failed");
    match e {
        MockupError::Invalid(m) => ApiError::BadRequest(m),
        MockupError::Timeout { .. } => ApiError::Timeout(e.to_string()),
        MockupError::Rejected { .. } | MockupError::Http(_) => ApiError::Vendor(e.to_string()),
    }
}
