//! Centralized error handling for the kava avatar service
//!
//! Errors are grouped by the layer that produces them:
//!
//! - **Font Errors**: reading or parsing the font at construction time
//! - **Render Errors**: canvas validation and PNG encoding during generation
//! - **Resize Errors**: decoding, unsupported formats and re-encoding
//! - **Application Errors**: the umbrella type returned across module boundaries
//!
//! Label derivation never fails and therefore has no error type.
//!
//! # Usage
//!
//! ```rust
//! use kava::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Err(AppError::validation("text must not be empty"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for render Results
pub type RenderResult<T> = Result<T, RenderError>;

/// Convenience type alias for resize Results
pub type ResizeResult<T> = Result<T, ResizeError>;
