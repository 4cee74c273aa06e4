//! Standalone image resize utility
//!
//! Decodes an encoded image, scales it to a target width while preserving the
//! aspect ratio and re-encodes it. The output format follows the input unless
//! overridden. This is independent from the avatar engine and its cache.

use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use tracing::debug;

use crate::avatar::render::MAX_CANVAS_DIMENSION;
use crate::config::defaults::DEFAULT_RESIZE_WIDTH;
use crate::errors::{AppError, ResizeError, ResizeResult};

/// Resampling quality, from fastest to smoothest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeQuality {
    /// Nearest neighbor
    Low,
    /// Fast approximate bilinear
    #[default]
    Medium,
    /// Bilinear
    High,
    /// Catmull-Rom
    VeryHigh,
}

impl FromStr for ResizeQuality {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" | "fast" | "1" => Ok(Self::Low),
            "medium" | "2" => Ok(Self::Medium),
            "high" | "3" => Ok(Self::High),
            "very-high" | "very_high" | "veryhigh" | "4" => Ok(Self::VeryHigh),
            other => Err(AppError::validation(format!(
                "Unknown resize quality '{}' (expected low, medium, high or very-high)",
                other
            ))),
        }
    }
}

/// Formats the resize utility can encode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
}

impl OutputFormat {
    /// Parse a file extension such as `png`, `.JPG` or `tif`
    pub fn from_extension(extension: &str) -> ResizeResult<Self> {
        let normalized = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "gif" => Ok(Self::Gif),
            "bmp" => Ok(Self::Bmp),
            "tif" | "tiff" => Ok(Self::Tiff),
            _ => Err(ResizeError::unsupported(extension)),
        }
    }

    /// Map a decoded image format to the matching output format
    pub fn from_image_format(format: ImageFormat) -> ResizeResult<Self> {
        match format {
            ImageFormat::Png => Ok(Self::Png),
            ImageFormat::Jpeg => Ok(Self::Jpeg),
            ImageFormat::Gif => Ok(Self::Gif),
            ImageFormat::Bmp => Ok(Self::Bmp),
            ImageFormat::Tiff => Ok(Self::Tiff),
            other => Err(ResizeError::unsupported(format!("{:?}", other))),
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Gif => ImageFormat::Gif,
            Self::Bmp => ImageFormat::Bmp,
            Self::Tiff => ImageFormat::Tiff,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Resize parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeOptions {
    /// Target width in pixels, 0 selects the default
    pub width: u32,
    pub quality: ResizeQuality,
    /// Output format override; the decoded format is kept when `None`
    pub format: Option<OutputFormat>,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_RESIZE_WIDTH,
            quality: ResizeQuality::default(),
            format: None,
        }
    }
}

/// Encoded result of [`resize_image`]
#[derive(Debug, Clone)]
pub struct ResizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

/// Height that keeps the `width`:`height` ratio at `target_width`
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let scaled = (target_width as f64 * height as f64 / width.max(1) as f64).round();
    (scaled as u32).max(1)
}

/// Decode `input`, scale it to `options.width` and re-encode it
pub fn resize_image(input: &[u8], options: &ResizeOptions) -> ResizeResult<ResizedImage> {
    if input.is_empty() {
        return Err(ResizeError::EmptyInput);
    }

    let reader = ImageReader::new(Cursor::new(input))
        .with_guessed_format()
        .map_err(|e| ResizeError::Decode(ImageError::IoError(e)))?;
    let detected = reader.format();
    let image = reader.decode().map_err(ResizeError::Decode)?;

    let format = match (options.format, detected) {
        (Some(format), _) => format,
        (None, Some(detected)) => OutputFormat::from_image_format(detected)?,
        (None, None) => return Err(ResizeError::unsupported("unknown")),
    };

    let width = if options.width == 0 {
        DEFAULT_RESIZE_WIDTH
    } else {
        options.width
    };
    let height = scaled_height(image.width(), image.height(), width);
    if width > MAX_CANVAS_DIMENSION || height > MAX_CANVAS_DIMENSION {
        return Err(ResizeError::TooLarge {
            width,
            height,
            max: MAX_CANVAS_DIMENSION,
        });
    }

    debug!(
        "Resizing {}x{} image to {}x{} ({:?}, {})",
        image.width(),
        image.height(),
        width,
        height,
        options.quality,
        format
    );

    let resized = match options.quality {
        ResizeQuality::Low => image.resize_exact(width, height, FilterType::Nearest),
        ResizeQuality::Medium => image.thumbnail_exact(width, height),
        ResizeQuality::High => image.resize_exact(width, height, FilterType::Triangle),
        ResizeQuality::VeryHigh => image.resize_exact(width, height, FilterType::CatmullRom),
    };

    let bytes = encode(resized, format)?;

    Ok(ResizedImage {
        bytes,
        width,
        height,
        format,
    })
}

fn encode(image: DynamicImage, format: OutputFormat) -> ResizeResult<Vec<u8>> {
    // JPEG has no alpha channel
    let image = match format {
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => DynamicImage::ImageRgba8(image.to_rgba8()),
    };

    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format.image_format())
        .map_err(ResizeError::Encode)?;
    Ok(bytes)
}
