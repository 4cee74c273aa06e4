//! Initials avatar generation
//!
//! - [`initials`]: canonical label derivation (the cache key)
//! - [`cache`]: memory-bounded image cache with periodic flushing
//! - [`font`]: embedded or file-based font loading
//! - [`render`]: canvas composition and PNG encoding
//! - [`engine`]: cache lookup, render on miss, write to the output sink

pub mod cache;
pub mod engine;
pub mod font;
pub mod initials;
pub mod render;

pub use cache::{BoundedCache, CacheStats, FlushHandle};
pub use engine::{AvatarEngine, CacheStatus, EngineOptions};
pub use font::{AvatarFont, FontSource};
pub use initials::derive_label;
pub use render::{Color, RenderRequest};
