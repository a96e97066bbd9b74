//! # API Shared
//!
//! Shared utilities and definitions for the vitals relay APIs.
//!
//! Contains:
//! - Response bodies shared by every endpoint (`types` module)
//! - Shared services like `HealthService`
//! - Bearer token extraction
//!
//! Used by `api-rest` for common functionality.

pub mod auth;
pub mod health;
pub mod types;

pub use auth::bearer_token;
pub use health::HealthService;
pub use types::{ErrorRes, HealthRes};
