use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use crate::avatar::render::MAX_CANVAS_DIMENSION;
use crate::errors::{AppError, AppResult};
use crate::resize::ResizeQuality;
use defaults::*;

/// Environment variable prefix for configuration overrides.
///
/// Nested keys are separated by a double underscore, e.g.
/// `KAVA_AVATAR__CACHE_SIZE_MB=64`.
pub const ENV_PREFIX: &str = "KAVA_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub avatar: AvatarConfig,
    #[serde(default)]
    pub resize: ResizeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
    /// Body limit for the resize endpoint
    #[serde(default = "default_max_upload_size_mb")]
    pub max_upload_size_mb: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarConfig {
    /// External TrueType/OpenType font; the embedded font is used when unset
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    /// Query parameter the avatar handler reads the text from
    #[serde(default = "default_query_param_name")]
    pub query_param_name: String,
    /// Cache memory budget in megabytes (0 falls back to the default)
    #[serde(default = "default_cache_size_mb")]
    pub cache_size_mb: u64,
    /// Periodic cache flush interval (0 disables)
    #[serde(default = "default_flush_interval", with = "duration_serde")]
    pub flush_interval: Duration,
    /// `Cache-Control` max-age sent with avatar responses
    #[serde(default = "default_cache_max_age", with = "duration_serde")]
    pub cache_max_age: Duration,
    #[serde(default = "default_canvas_width")]
    pub width: u32,
    #[serde(default = "default_canvas_height")]
    pub height: u32,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_offset_y")]
    pub offset_y: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResizeConfig {
    #[serde(default = "default_resize_width")]
    pub default_width: u32,
    #[serde(default)]
    pub default_quality: ResizeQuality,
}

// Web defaults
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_request_timeout() -> Duration {
    humantime::parse_duration(DEFAULT_REQUEST_TIMEOUT).unwrap_or(Duration::from_secs(30))
}

fn default_max_upload_size_mb() -> usize {
    DEFAULT_MAX_UPLOAD_SIZE_MB
}

// Avatar defaults
fn default_query_param_name() -> String {
    DEFAULT_QUERY_PARAM_NAME.to_string()
}

fn default_cache_size_mb() -> u64 {
    DEFAULT_CACHE_SIZE_MB
}

fn default_flush_interval() -> Duration {
    Duration::from_secs(DEFAULT_FLUSH_INTERVAL_SECONDS)
}

fn default_cache_max_age() -> Duration {
    humantime::parse_duration(DEFAULT_CACHE_MAX_AGE).unwrap_or(Duration::from_secs(86_400))
}

fn default_canvas_width() -> u32 {
    DEFAULT_CANVAS_WIDTH
}

fn default_canvas_height() -> u32 {
    DEFAULT_CANVAS_HEIGHT
}

fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}

fn default_offset_y() -> i32 {
    DEFAULT_OFFSET_Y
}

// Resize defaults
fn default_resize_width() -> u32 {
    DEFAULT_RESIZE_WIDTH
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            max_upload_size_mb: default_max_upload_size_mb(),
        }
    }
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            query_param_name: default_query_param_name(),
            cache_size_mb: default_cache_size_mb(),
            flush_interval: default_flush_interval(),
            cache_max_age: default_cache_max_age(),
            width: default_canvas_width(),
            height: default_canvas_height(),
            font_size: default_font_size(),
            offset_y: default_offset_y(),
        }
    }
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            default_width: default_resize_width(),
            default_quality: ResizeQuality::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web: WebConfig::default(),
            avatar: AvatarConfig::default(),
            resize: ResizeConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration layered as defaults, then the TOML file (if present),
    /// then `KAVA_` environment variables.
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if Path::new(config_file).exists() {
            figment = figment.merge(Toml::file(config_file));
            info!("Configuration loaded from: {}", config_file);
        } else {
            info!(
                "Config file {} not found, using defaults and environment",
                config_file
            );
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load configuration from {config_file}"))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate values that would otherwise fail late, at first request
    pub fn validate(&self) -> AppResult<()> {
        if self.avatar.query_param_name.trim().is_empty() {
            return Err(AppError::configuration(
                "avatar.query_param_name must not be empty",
            ));
        }

        for (name, value) in [
            ("avatar.width", self.avatar.width),
            ("avatar.height", self.avatar.height),
            ("avatar.font_size", self.avatar.font_size),
            ("resize.default_width", self.resize.default_width),
        ] {
            if value > MAX_CANVAS_DIMENSION {
                return Err(AppError::configuration(format!(
                    "{} is {}, exceeding the maximum of {}",
                    name, value, MAX_CANVAS_DIMENSION
                )));
            }
        }

        if self.avatar.offset_y.unsigned_abs() > MAX_CANVAS_DIMENSION {
            return Err(AppError::configuration(format!(
                "avatar.offset_y is {}, outside -{max}..={max}",
                self.avatar.offset_y,
                max = MAX_CANVAS_DIMENSION
            )));
        }

        Ok(())
    }
}
