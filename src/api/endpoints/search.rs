//! Search endpoint: photo or URL in, one match per backend out.
//!
//! `POST /api/search` accepts either a public `image_url` or an inline
//! `image` data URL (`data:image/jpeg;base64,...`). Inline images are
//! hosted by the pipeline before anything else runs.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::SearchOutcome;
use crate::pipeline::upload::{decode_data_url, detect_image_format};
use crate::pipeline::{ReferenceImage, SearchRequest};

/// Maximum decoded inline image size (10 MB).
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Request body limit: a 10 MB image grows by a third as base64.
pub const MAX_BODY_BYTES: usize = MAX_IMAGE_BYTES * 4 / 3 + 64 * 1024;

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// `POST /api/search`
pub async fn search(
    State(ctx): State<ApiContext>,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchOutcome>, ApiError> {
    let request = into_search_request(body)?;
    let outcome = ctx.core.pipeline().run(request).await?;
    Ok(Json(outcome))
}

fn into_search_request(body: SearchBody) -> Result<SearchRequest, ApiError> {
    let image_url = body.image_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
    let image = body.image.filter(|i| !i.trim().is_empty());
    let description = body.description.filter(|d| !d.trim().is_empty());

    let reference = match (image_url, image) {
        (None, None) => return Err(ApiError::BadRequest("image_url or image is required".into())),
        (Some(_), Some(_)) => {
            return Err(ApiError::BadRequest("Provide either image_url or image, not both".into()))
        }
        (Some(url), None) => {
            let parsed = url::Url::parse(&url)
                .map_err(|e| ApiError::BadRequest(format!("Invalid image_url: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ApiError::BadRequest("image_url must be http or https".into()));
            }
            ReferenceImage::Url(url)
        }
        (None, Some(data)) => {
            let bytes = decode_data_url(&data)
                .map_err(|e| ApiError::BadRequest(format!("Invalid image data: {e}")))?;
            if bytes.len() > MAX_IMAGE_BYTES {
                return Err(ApiError::BadRequest(format!(
                    "Image exceeds 10 MB size limit ({} bytes)",
                    bytes.len()
                )));
            }
            if detect_image_format(&bytes).is_none() {
                return Err(ApiError::BadRequest(
                    "Unsupported image format (expected JPEG, PNG, WebP or GIF)".into(),
                ));
            }
            ReferenceImage::Upload(bytes)
        }
    };

    Ok(SearchRequest {
        reference,
        description,
    })
}
