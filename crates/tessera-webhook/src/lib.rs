//! Admission webhook serving TesseraDB defaulting and validation
//!
//! Thin HTTP transport around `tessera-admission`: every decision is made by
//! the engine, this crate only converts between `AdmissionReview` bodies and
//! engine calls.

#![deny(missing_docs)]

/// Process configuration (flags, environment, key material)
pub mod config;
/// Error type rendered as a Kubernetes `Status`
pub mod error;
/// Mutating and validating review handlers
pub mod handlers;
/// HTTPS listener and routes
pub mod server;

pub use error::WebhookError;
