//! # ossa-store
//!
//! Filesystem storage for OSSA manifests.
//!
//! This crate provides [`fs::FsManifestRepository`], which implements the
//! [`ossa_core::traits::ManifestRepository`] trait. The on-disk format is
//! chosen by file extension:
//!
//! | extension       | format |
//! |-----------------|--------|
//! | `.yaml`, `.yml` | YAML   |
//! | `.json`         | JSON   |
//!
//! The engine never sees the format; it only handles the deserialized tree.
//! [`discover::discover`] finds manifests under a directory for batch runs.

pub mod discover;
pub mod format;
pub mod fs;

pub use discover::{default_output_path, discover};
pub use format::{FormatError, ManifestFormat};
pub use fs::FsManifestRepository;
