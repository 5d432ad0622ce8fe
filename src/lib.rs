// src/lib.rs

//! Bearer-token verification against a JWKS issuer, plus retrieval of the
//! authenticated subject's gzip-compressed profile document from object
//! storage.
//!
//! The entry point is [`pipeline::Pipeline::verify_and_fetch`]; everything
//! around it (request parsing, response serialization) is glue the caller
//! owns. See [`model::ProfileRequest`] and [`model::ProfileResponse`] for
//! the envelope shapes.

pub mod claims;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod profile;

mod token;

/// The public prelude for the `profile-gate` crate.
///
/// This module re-exports the most commonly used types for convenience.
pub mod prelude {
    pub use crate::client::JwksCache;
    pub use crate::config::{Config, ConfigBuilder};
    pub use crate::error::ProfileGateError;
    pub use crate::model::{ErrorResponse, ProfileDocument, ProfileRequest, ProfileResponse};
    pub use crate::pipeline::Pipeline;
    pub use crate::profile::{HttpObjectStore, ObjectStore, ObjectStoreError};
    pub use jsonwebtoken::Algorithm;
}
