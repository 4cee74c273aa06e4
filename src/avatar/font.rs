//! Font loading for avatar rendering
//!
//! The font is parsed once at startup and shared read-only between every
//! render. The default face is compiled into the binary so the service has no
//! runtime font dependency.

use bytes::Bytes;
use std::path::Path;
use swash::{CacheKey, FontRef};
use tracing::{debug, info};

use crate::errors::FontError;

/// Embedded default font (DejaVu Sans Mono Bold, see `assets/fonts/LICENSE-DejaVu.txt`)
static DEFAULT_FONT_TTF: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono-Bold.ttf");

/// Family name of the embedded font
pub const DEFAULT_FONT_FAMILY: &str = "DejaVu Sans Mono Bold";

/// Where a font is loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource<'a> {
    Embedded,
    File(&'a Path),
}

/// A parsed font that owns its data
#[derive(Clone)]
pub struct AvatarFont {
    data: Bytes,
    offset: u32,
    key: CacheKey,
    name: String,
}

impl std::fmt::Debug for AvatarFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarFont")
            .field("name", &self.name)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl AvatarFont {
    /// Load from the given source
    pub fn load(source: FontSource<'_>) -> Result<Self, FontError> {
        match source {
            FontSource::Embedded => Self::embedded(),
            FontSource::File(path) => Self::from_path(path),
        }
    }

    /// Load the font from an optional path, falling back to the embedded font
    pub fn from_optional_path(path: Option<&Path>) -> Result<Self, FontError> {
        match path {
            Some(path) => Self::load(FontSource::File(path)),
            None => Self::load(FontSource::Embedded),
        }
    }

    /// The font compiled into the binary
    pub fn embedded() -> Result<Self, FontError> {
        let font = Self::from_bytes(Bytes::from_static(DEFAULT_FONT_TTF), DEFAULT_FONT_FAMILY)?;
        debug!("Loaded embedded font: {}", DEFAULT_FONT_FAMILY);
        Ok(font)
    }

    /// Read and parse a TrueType/OpenType file
    pub fn from_path(path: &Path) -> Result<Self, FontError> {
        let data = std::fs::read(path).map_err(|source| FontError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let font = Self::from_bytes(data, &path.display().to_string())?;
        info!("Loaded font from {}", path.display());
        Ok(font)
    }

    /// Parse font data already in memory; `name` is used in errors and logs
    pub fn from_bytes(data: impl Into<Bytes>, name: &str) -> Result<Self, FontError> {
        let data = data.into();
        let parse_error = || FontError::Parse {
            source_name: name.to_string(),
        };

        let font = FontRef::from_index(&data, 0).ok_or_else(parse_error)?;
        let (offset, key) = (font.offset, font.key);

        // A face without a character map cannot draw any label
        if font.charmap().map('A') == 0 && font.charmap().map('0') == 0 {
            return Err(parse_error());
        }

        Ok(Self {
            data,
            offset,
            key,
            name: name.to_string(),
        })
    }

    /// Borrow as a swash font reference
    pub fn font_ref(&self) -> FontRef<'_> {
        FontRef {
            data: &self.data,
            offset: self.offset,
            key: self.key,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
