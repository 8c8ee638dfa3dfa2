//! Common types for Tessera: the TesseraDB CRD, errors, annotations and telemetry

#![deny(missing_docs)]

pub mod annotations;
pub mod crd;
pub mod error;
pub mod telemetry;

pub use annotations::DbAnnotations;
pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// API group of every Tessera custom resource
pub const API_GROUP: &str = "tessera.dev";

/// Prefix shared by every Tessera annotation and protected label key
pub const ANNOTATION_PREFIX: &str = "tessera.dev/";
