/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_REQUEST_TIMEOUT: &str = "30s";
pub const DEFAULT_MAX_UPLOAD_SIZE_MB: usize = 10;

// Avatar defaults
pub const DEFAULT_QUERY_PARAM_NAME: &str = "initials";
pub const DEFAULT_CACHE_SIZE_MB: u64 = 20;
pub const DEFAULT_FLUSH_INTERVAL_SECONDS: u64 = 0; // disabled
pub const DEFAULT_CACHE_MAX_AGE: &str = "1d";
pub const DEFAULT_CANVAS_WIDTH: u32 = 300;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 300;
pub const DEFAULT_FONT_SIZE: u32 = 100;
pub const DEFAULT_OFFSET_Y: i32 = 0;

// Resize defaults
pub const DEFAULT_RESIZE_WIDTH: u32 = 200;
