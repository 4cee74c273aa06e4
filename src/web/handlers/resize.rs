//! Image resize HTTP handler

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderName, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::avatar::render::MAX_CANVAS_DIMENSION;
use crate::errors::{AppError, AppResult};
use crate::resize::{OutputFormat, ResizeOptions, ResizeQuality, resize_image};
use crate::web::AppState;

const X_IMAGE_WIDTH: HeaderName = HeaderName::from_static("x-image-width");
const X_IMAGE_HEIGHT: HeaderName = HeaderName::from_static("x-image-height");

#[derive(Debug, Default, Deserialize)]
pub struct ResizeParams {
    pub width: Option<u32>,
    pub quality: Option<String>,
    pub format: Option<String>,
}

/// `POST /resize` with the encoded image as the request body
pub async fn resize(
    State(state): State<AppState>,
    Query(params): Query<ResizeParams>,
    body: Bytes,
) -> Result<Response, AppError> {
    let options = resize_options(&state, &params)?;

    let resized = tokio::task::spawn_blocking(move || resize_image(&body, &options))
        .await
        .map_err(|e| AppError::internal(format!("Resize task failed: {}", e)))??;

    Ok((
        [
            (header::CONTENT_TYPE, resized.format.mime_type().to_string()),
            (X_IMAGE_WIDTH, resized.width.to_string()),
            (X_IMAGE_HEIGHT, resized.height.to_string()),
        ],
        resized.bytes,
    )
        .into_response())
}

fn resize_options(state: &AppState, params: &ResizeParams) -> AppResult<ResizeOptions> {
    let defaults = &state.config.resize;

    let width = params.width.unwrap_or(defaults.default_width);
    if width > MAX_CANVAS_DIMENSION {
        return Err(AppError::validation(format!(
            "width must be at most {}",
            MAX_CANVAS_DIMENSION
        )));
    }

    let quality = match params.quality.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw.parse::<ResizeQuality>()?,
        _ => defaults.default_quality,
    };

    let format = match params.format.as_deref() {
        Some(raw) if !raw.trim().is_empty() => Some(OutputFormat::from_extension(raw)?),
        _ => None,
    };

    Ok(ResizeOptions {
        width,
        quality,
        format,
    })
}
