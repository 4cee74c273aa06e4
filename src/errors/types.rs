//! Error type definitions for the kava avatar service

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error type
///
/// Every fallible operation that crosses a module boundary returns this type.
/// Layer specific errors convert into it through `#[from]`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Font could not be loaded (fatal at construction)
    #[error("Font error: {0}")]
    Font(#[from] FontError),

    /// Avatar rendering or encoding failed
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Standalone resize utility failed
    #[error("Resize error: {0}")]
    Resize(#[from] ResizeError),

    /// Writing to the output sink failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid caller input
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Font loading errors
#[derive(Error, Debug)]
pub enum FontError {
    /// The font file could not be read from disk
    #[error("Failed to read font file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The font data is not a usable TrueType/OpenType font
    #[error("Failed to parse font data from {source_name}")]
    Parse { source_name: String },
}

/// Avatar render pipeline errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// Canvas dimensions outside the supported range
    #[error("Invalid canvas size: {width}x{height} (max {max} per side)")]
    InvalidCanvas { width: u32, height: u32, max: u32 },

    /// Vertical offset outside the supported range
    #[error("Invalid vertical offset: {offset_y} (max {max} in either direction)")]
    InvalidOffset { offset_y: i32, max: u32 },

    /// PNG encoding failed
    #[error("Failed to encode avatar: {0}")]
    Encode(#[from] image::ImageError),
}

/// Resize utility errors
#[derive(Error, Debug)]
pub enum ResizeError {
    /// No image bytes were supplied
    #[error("No image data to resize")]
    EmptyInput,

    /// The input could not be decoded as an image
    #[error("Decode error: {0}")]
    Decode(#[source] image::ImageError),

    /// The requested or inferred output format cannot be encoded
    #[error("Unsupported image type: {format}")]
    UnsupportedFormat { format: String },

    /// The scaled image would exceed the dimension limit
    #[error("Resized image would be {width}x{height} (max {max} per side)")]
    TooLarge { width: u32, height: u32, max: u32 },

    /// Re-encoding the scaled image failed
    #[error("Encode error: {0}")]
    Encode(#[source] image::ImageError),
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl ResizeError {
    /// Create an unsupported format error
    pub fn unsupported<S: Into<String>>(format: S) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }
}
