//! # ossa-core
//!
//! The manifest migration engine for OSSA agent manifests.
//!
//! This crate provides:
//! - The collaborator traits (`MigrationStep`, `RuleChain`,
//!   `ManifestValidator`, `ManifestRepository`)
//! - The version detector and the `Migrator` that applies rule chains
//! - The reporter that turns applied steps into a `MigrationSummary`
//! - `MigrationPipeline`, which wires detection, migration, validation, and
//!   reporting together, plus concurrent batch execution
//!
//! The engine performs no I/O and prints nothing. Diagnostics go through
//! `tracing` and are only visible when the host installs a subscriber.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ossa_core::{MigrationPipeline, traits::{RuleChain, ManifestValidator}};
//!
//! let pipeline = MigrationPipeline::new(&rules, &validator);
//! let report = pipeline.run(&document, &VersionId::current())?;
//! ```

pub mod batch;
pub mod detect;
pub mod digest;
pub mod migrator;
pub mod pipeline;
pub mod report;
pub mod traits;

pub use batch::run_batch;
pub use detect::detect_version;
pub use digest::document_digest;
pub use migrator::Migrator;
pub use pipeline::{MigrationPipeline, PipelineReport};
pub use report::summarize;
