//! HTTP request handlers

pub mod avatar;
pub mod health;
pub mod resize;
