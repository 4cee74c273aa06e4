//! Avatar generation engine
//!
//! Looks the canonical label up in the cache and only renders on a miss. The
//! label must already be canonical (see [`derive_label`](super::derive_label));
//! the engine uses `request.text` verbatim as both render text and cache key.
//!
//! Concurrent misses on the same label each render independently and the last
//! write wins. There is no per-key request coalescing.

use bytes::Bytes;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use super::cache::{BoundedCache, FlushHandle};
use super::font::AvatarFont;
use super::render::{self, RenderRequest};
use crate::config::AvatarConfig;
use crate::config::defaults::{DEFAULT_CACHE_SIZE_MB, DEFAULT_QUERY_PARAM_NAME};
use crate::errors::{AppError, AppResult};

/// Construction options for [`AvatarEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// External font file; the embedded font is used when `None`
    pub font_path: Option<PathBuf>,
    /// Name of the query parameter the HTTP layer reads text from
    pub query_param_name: String,
    /// Cache budget in megabytes, 0 selects the default
    pub cache_size_mb: u64,
    /// Periodic flush interval, zero disables flushing
    pub flush_interval: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            font_path: None,
            query_param_name: DEFAULT_QUERY_PARAM_NAME.to_string(),
            cache_size_mb: DEFAULT_CACHE_SIZE_MB,
            flush_interval: Duration::ZERO,
        }
    }
}

impl EngineOptions {
    /// Cache budget in bytes, applying the default for an unset (zero) size
    pub fn cache_budget_bytes(&self) -> u64 {
        let megabytes = if self.cache_size_mb == 0 {
            DEFAULT_CACHE_SIZE_MB
        } else {
            self.cache_size_mb
        };
        megabytes.saturating_mul(1024 * 1024)
    }
}

impl From<&AvatarConfig> for EngineOptions {
    fn from(config: &AvatarConfig) -> Self {
        Self {
            font_path: config.font_path.clone(),
            query_param_name: config.query_param_name.clone(),
            cache_size_mb: config.cache_size_mb,
            flush_interval: config.flush_interval,
        }
    }
}

/// Whether a generated avatar came from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Avatar generator with its shared font and cache
pub struct AvatarEngine {
    font: Arc<AvatarFont>,
    cache: Arc<BoundedCache>,
    query_param_name: String,
    flush_interval: Duration,
    flush_handle: Mutex<Option<FlushHandle>>,
}

impl AvatarEngine {
    /// Load the font and create the cache. Font failures are fatal.
    pub fn new(options: EngineOptions) -> AppResult<Self> {
        let font = AvatarFont::from_optional_path(options.font_path.as_deref())?;
        Ok(Self::with_font(font, options))
    }

    /// Build an engine around an already loaded font
    pub fn with_font(font: AvatarFont, options: EngineOptions) -> Self {
        let budget = options.cache_budget_bytes();

        info!(
            "Avatar engine ready: font={}, cache={}MB, flush_interval={}",
            font.name(),
            budget / (1024 * 1024),
            if options.flush_interval.is_zero() {
                "disabled".to_string()
            } else {
                humantime::format_duration(options.flush_interval).to_string()
            }
        );

        Self {
            font: Arc::new(font),
            cache: Arc::new(BoundedCache::new(budget)),
            query_param_name: options.query_param_name,
            flush_interval: options.flush_interval,
            flush_handle: Mutex::new(None),
        }
    }

    /// Start the periodic cache flush if an interval is configured.
    ///
    /// Calling this again while the flush task runs has no effect. Must be
    /// called from within a tokio runtime.
    pub fn start_background_tasks(&self) {
        let mut handle = self
            .flush_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if handle.as_ref().is_some_and(|h| !h.is_stopped()) {
            return;
        }
        *handle = self.cache.start_periodic_flush(self.flush_interval);
    }

    /// Stop background tasks
    pub fn shutdown(&self) {
        let handle = self
            .flush_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.stop();
            info!("Avatar engine background tasks stopped");
        }
    }

    /// Generate the avatar for `request` and write it to `sink`.
    ///
    /// On a miss the freshly rendered image is cached before it is written.
    /// A render failure writes nothing and caches nothing.
    pub async fn generate<W>(&self, request: RenderRequest, sink: &mut W) -> AppResult<CacheStatus>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        if let Some(cached) = self.cache.get(&request.text).await {
            debug!("Avatar cache hit for '{}'", request.text);
            write_once(sink, &cached).await?;
            return Ok(CacheStatus::Hit);
        }

        debug!("Avatar cache miss for '{}', rendering", request.text);
        let key = request.text.clone();
        let image = self.render(request).await?;

        self.cache.put(key, image.clone()).await;
        write_once(sink, &image).await?;
        Ok(CacheStatus::Miss)
    }

    /// Render on the blocking pool, bypassing the cache
    async fn render(&self, request: RenderRequest) -> AppResult<Bytes> {
        let font = Arc::clone(&self.font);
        let rendered = tokio::task::spawn_blocking(move || render::render(&font, &request))
            .await
            .map_err(|e| AppError::internal(format!("Render task failed: {e}")))??;
        Ok(Bytes::from(rendered))
    }

    pub fn cache(&self) -> &Arc<BoundedCache> {
        &self.cache
    }

    pub fn font(&self) -> &AvatarFont {
        &self.font
    }

    /// Query parameter name for the HTTP boundary; unused by the engine itself
    pub fn query_param_name(&self) -> &str {
        &self.query_param_name
    }
}

async fn write_once<W>(sink: &mut W, bytes: &[u8]) -> AppResult<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    sink.write_all(bytes).await?;
    sink.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::render::Color;
    use crate::errors::RenderError;

    fn engine() -> AvatarEngine {
        AvatarEngine::with_font(AvatarFont::embedded().unwrap(), EngineOptions::default())
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let engine = engine();
        let request = RenderRequest::new("AS");

        let mut first = Vec::new();
        assert_eq!(engine.generate(request.clone(), &mut first).await.unwrap(), CacheStatus::Miss);

        let mut second = Vec::new();
        assert_eq!(engine.generate(request, &mut second).await.unwrap(), CacheStatus::Hit);

        // Random colors would differ on a re-render; identical bytes prove the hit
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_hit_never_renders() {
        let engine = engine();
        engine.cache().put("AS", Bytes::from_static(b"not-a-png")).await;

        let mut sink = Vec::new();
        let status = engine.generate(RenderRequest::new("AS"), &mut sink).await.unwrap();

        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(sink, b"not-a-png");
    }

    #[tokio::test]
    async fn test_render_failure_leaves_cache_and_sink_untouched() {
        let engine = engine();
        let request = RenderRequest::new("AS").with_size(10_000, 10);

        let mut sink = Vec::new();
        let err = engine.generate(request, &mut sink).await.unwrap_err();

        assert!(matches!(err, AppError::Render(RenderError::InvalidCanvas { .. })));
        assert!(sink.is_empty());
        assert!(engine.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_cache_key_ignores_render_options() {
        let engine = engine();
        let white = Color::rgb(255, 255, 255);
        let black = Color::rgb(0, 0, 0);

        let mut first = Vec::new();
        engine
            .generate(RenderRequest::new("AS").with_colors(white, black), &mut first)
            .await
            .unwrap();

        let mut second = Vec::new();
        let status = engine
            .generate(RenderRequest::new("AS").with_colors(black, white), &mut second)
            .await
            .unwrap();

        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_font_file_fails_construction() {
        let options = EngineOptions {
            font_path: Some(PathBuf::from("/nonexistent/font.ttf")),
            ..EngineOptions::default()
        };
        assert!(matches!(AvatarEngine::new(options), Err(AppError::Font(_))));
    }

    #[test]
    fn test_zero_cache_size_uses_default_budget() {
        let options = EngineOptions {
            cache_size_mb: 0,
            ..EngineOptions::default()
        };
        assert_eq!(options.cache_budget_bytes(), DEFAULT_CACHE_SIZE_MB * 1024 * 1024);
        let engine = AvatarEngine::with_font(AvatarFont::embedded().unwrap(), options);
        assert_eq!(engine.cache().budget(), DEFAULT_CACHE_SIZE_MB * 1024 * 1024);

        let options = EngineOptions {
            cache_size_mb: 3,
            ..EngineOptions::default()
        };
        let engine = AvatarEngine::with_font(AvatarFont::embedded().unwrap(), options);
        assert_eq!(engine.cache().budget(), 3 * 1024 * 1024);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_flush_and_shutdown() {
        let options = EngineOptions {
            flush_interval: Duration::from_secs(30),
            ..EngineOptions::default()
        };
        let engine = AvatarEngine::with_font(AvatarFont::embedded().unwrap(), options);
        engine.start_background_tasks();

        engine.cache().put("AS", Bytes::from_static(b"png")).await;
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(engine.cache().is_empty().await);

        engine.shutdown();
        engine.cache().put("AS", Bytes::from_static(b"png")).await;
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(!engine.cache().is_empty().await);
    }
}
