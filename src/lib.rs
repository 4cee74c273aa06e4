//! kava: an initials avatar service
//!
//! Derives a short label from free-form text, renders it centered on a solid
//! canvas and serves the PNG from a memory-bounded cache. A standalone resize
//! utility is exposed next to it.

pub mod avatar;
pub mod config;
pub mod errors;
pub mod resize;
pub mod web;
