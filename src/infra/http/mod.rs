//! Network adapter for the users REST service.

mod client;
mod error;

pub use client::ApiClient;
pub use error::ApiError;
