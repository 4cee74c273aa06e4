//! Router tests driven through `tower::ServiceExt::oneshot`

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::Value;
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

use kava::avatar::{AvatarEngine, EngineOptions};
use kava::config::Config;
use kava::web::WebServer;

fn app_with(config: Config) -> Router {
    let engine = AvatarEngine::new(EngineOptions::from(&config.avatar)).unwrap();
    WebServer::new(config, Arc::new(engine)).router()
}

fn app() -> Router {
    app_with(Config::default())
}

async fn send(app: &Router, method: Method, uri: &str, body: Body) -> (StatusCode, HeaderMap, Vec<u8>) {
    let request = Request::builder().method(method).uri(uri).body(body).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, bytes.to_vec())
}

fn json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

#[tokio::test]
async fn test_avatar_miss_then_hit() {
    let app = app();
    let uri = "/avatar?initials=john-smith&color=ffffff&background=000000";

    let (status, headers, first) = send(&app, Method::GET, uri, Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "image/png");
    assert_eq!(headers["x-cache"], "MISS");
    assert_eq!(headers["cache-control"], "public, max-age=86400");

    let decoded = image::load_from_memory(&first).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (300, 300));

    let (status, headers, second) = send(&app, Method::GET, uri, Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-cache"], "HIT");
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_avatar_path_form_shares_cache_with_query_form() {
    let app = app();

    let (status, headers, _) = send(&app, Method::GET, "/avatar/jane-doe", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-cache"], "MISS");

    let (_, headers, _) = send(&app, Method::GET, "/avatar?initials=jd", Body::empty()).await;
    assert_eq!(headers["x-cache"], "HIT");
}

#[tokio::test]
async fn test_avatar_without_text_renders_fallback() {
    let app = app();
    let (status, headers, body) = send(&app, Method::GET, "/avatar", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "image/png");
    assert!(image::load_from_memory(&body).is_ok());
}

#[tokio::test]
async fn test_avatar_custom_query_param_and_size() {
    let mut config = Config::default();
    config.avatar.query_param_name = "name".to_string();
    let app = app_with(config);

    let (status, _, body) = send(
        &app,
        Method::GET,
        "/avatar?name=ada&width=64&height=48&font_size=20",
        Body::empty(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 48));
}

#[tokio::test]
async fn test_avatar_invalid_color_is_bad_request() {
    let app = app();
    let (status, _, body) = send(
        &app,
        Method::GET,
        "/avatar?initials=ab&color=nothex",
        Body::empty(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = json(&body);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("color"));
}

#[tokio::test]
async fn test_avatar_extreme_offset_is_bad_request() {
    let app = app();
    for uri in [
        "/avatar?initials=ab&offset_y=-2147483648",
        "/avatar?initials=ab&offset_y=2147483647",
    ] {
        let (status, _, body) = send(&app, Method::GET, uri, Body::empty()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(json(&body)["error"].as_str().unwrap().contains("offset_y"));
    }
}

#[tokio::test]
async fn test_resize_png() {
    let app = app();
    let (status, headers, body) = send(
        &app,
        Method::POST,
        "/resize?width=100&quality=high",
        Body::from(png(400, 200)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "image/png");
    assert_eq!(headers["x-image-width"], "100");
    assert_eq!(headers["x-image-height"], "50");
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (100, 50));
}

#[tokio::test]
async fn test_resize_format_override() {
    let app = app();
    let (status, headers, body) = send(
        &app,
        Method::POST,
        "/resize?width=50&format=.jpg",
        Body::from(png(100, 100)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "image/jpeg");
    assert_eq!(image::guess_format(&body).unwrap(), ImageFormat::Jpeg);
}

#[tokio::test]
async fn test_resize_errors() {
    let app = app();

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/resize?format=xyz",
        Body::from(png(10, 10)),
    )
    .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(json(&body)["success"], false);

    let (status, _, _) = send(&app, Method::POST, "/resize", Body::empty()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/resize?quality=ultra",
        Body::from(png(10, 10)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 1x8192 at width 4096 would scale to 4096x33554432
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/resize?width=4096",
        Body::from(png(1, 8192)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["success"], false);
}

#[tokio::test]
async fn test_health_and_flush() {
    let app = app();
    send(&app, Method::GET, "/avatar?initials=ab", Body::empty()).await;

    let (status, _, body) = send(&app, Method::GET, "/health", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["data"]["cache"]["entries"], 1);
    assert_eq!(body["data"]["cache"]["misses"], 1);

    let (status, _, body) = send(&app, Method::POST, "/cache/flush", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["data"]["removed"], 1);

    let (_, headers, _) = send(&app, Method::GET, "/avatar?initials=ab", Body::empty()).await;
    assert_eq!(headers["x-cache"], "MISS");
}
