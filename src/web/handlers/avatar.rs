//! Avatar HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::{HeaderName, header},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

use crate::avatar::render::MAX_CANVAS_DIMENSION;
use crate::avatar::{Color, RenderRequest, derive_label};
use crate::config::AvatarConfig;
use crate::errors::{AppError, AppResult};
use crate::web::AppState;

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// `GET /avatar?<query_param_name>=<text>`
pub async fn avatar_from_query(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let text = params
        .get(state.engine.query_param_name())
        .cloned()
        .unwrap_or_default();
    avatar_response(&state, &text, &params).await
}

/// `GET /avatar/{text}`
///
/// The query parameter still wins when both are present.
pub async fn avatar_from_path(
    State(state): State<AppState>,
    Path(text): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let text = params
        .get(state.engine.query_param_name())
        .cloned()
        .unwrap_or(text);
    avatar_response(&state, &text, &params).await
}

async fn avatar_response(
    state: &AppState,
    text: &str,
    params: &HashMap<String, String>,
) -> Result<Response, AppError> {
    let label = derive_label(text);
    let request = build_request(&state.config.avatar, label, params)?;
    debug!("Avatar request for '{}' rendered as '{}'", text, request.text);

    let mut body = Vec::new();
    let status = state.engine.generate(request, &mut body).await?;

    let cache_control = format!(
        "public, max-age={}",
        state.config.avatar.cache_max_age.as_secs()
    );

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CACHE_CONTROL, cache_control),
            (X_CACHE, status.as_str().to_string()),
        ],
        body,
    )
        .into_response())
}

/// Merge configured defaults with per-request overrides
pub fn build_request(
    defaults: &AvatarConfig,
    label: String,
    params: &HashMap<String, String>,
) -> AppResult<RenderRequest> {
    let width = param::<u32>(params, "width")?.unwrap_or(defaults.width);
    let height = param::<u32>(params, "height")?.unwrap_or(defaults.height);
    let font_size = param::<u32>(params, "font_size")?.unwrap_or(defaults.font_size);
    let offset_y = param::<i32>(params, "offset_y")?.unwrap_or(defaults.offset_y);

    for (name, value) in [("width", width), ("height", height), ("font_size", font_size)] {
        if value > MAX_CANVAS_DIMENSION {
            return Err(AppError::validation(format!(
                "{} must be at most {}",
                name, MAX_CANVAS_DIMENSION
            )));
        }
    }

    if offset_y.unsigned_abs() > MAX_CANVAS_DIMENSION {
        return Err(AppError::validation(format!(
            "offset_y must be within -{max}..={max}",
            max = MAX_CANVAS_DIMENSION
        )));
    }

    Ok(RenderRequest {
        text: label,
        width: Some(width),
        height: Some(height),
        font_size: Some(font_size),
        text_color: param::<Color>(params, "color")?,
        background_color: param::<Color>(params, "background")?,
        offset_y: Some(offset_y),
    })
}

fn param<T>(params: &HashMap<String, String>, name: &str) -> AppResult<Option<T>>
where
    T: FromStr,
{
    match params.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::validation(format!("Invalid value '{}' for {}", raw, name))),
    }
}
