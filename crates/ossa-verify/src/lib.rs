//! # ossa-verify
//!
//! Structural validation of OSSA manifests.
//!
//! [`engine::SchemaValidator`] implements the
//! [`ossa_core::traits::ManifestValidator`] trait. Each schema version owns a
//! bundle of JSON Schemas, one per manifest kind, embedded at build time from
//! `schemas/<version>.json`. Checks run in a fixed order:
//!
//! 1. **Envelope**: `apiVersion`, `kind`, `metadata`, and `spec` are present
//!    with the right types, and `apiVersion` matches the requested version.
//! 2. **Metadata**: `metadata.name` is a machine identifier.
//! 3. **Kind schema**: `spec` is validated with the `jsonschema` crate
//!    against the bundle entry for the declared kind.
//!
//! Warnings (advisory findings) never affect `valid`.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use ossa_contracts::version::VersionId;
//! use ossa_core::traits::ManifestValidator;
//! use ossa_verify::engine::SchemaValidator;
//!
//! let validator = SchemaValidator::new()?;
//! let result = validator.validate(&document, &VersionId::current())?;
//! for issue in &result.errors {
//!     eprintln!("{issue}");
//! }
//! ```

pub mod engine;
pub mod schemas;

pub use engine::SchemaValidator;
