//! HTTP boundary helpers.
//!
//! Routing and dispatch belong to the embedding server. This module gives it
//! what every game endpoint needs: status mapping for domain errors, the
//! request-time and gate headers, and validated request bodies.

pub mod dto;
pub mod error;
pub mod headers;
pub mod request_time;

pub use error::ApiResult;
