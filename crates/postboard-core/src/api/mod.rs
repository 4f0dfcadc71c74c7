//! REST API client for the postboard backend.
//!
//! This module provides the `ApiClient`, the single path for outbound
//! requests. It attaches the session's bearer credential and treats a 401
//! from any endpoint as credential rejection, clearing the session.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
