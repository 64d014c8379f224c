//! Command-line client for Bunny.net storage zones and pull zones
//!
//! Uploads a local folder to a storage zone through a bounded pool of
//! workers with per-attempt timeouts, retries and optional fail-fast
//! cancellation, and purges pull zone caches through the account API.

pub mod app;
pub mod cdn;
pub mod docs;
pub mod error;
pub mod models;
pub mod storage;
pub mod upload;

pub use error::{Error, Result};
