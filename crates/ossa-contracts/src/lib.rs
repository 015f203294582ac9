//! # ossa-contracts
//!
//! Shared types and contracts for the OSSA manifest migration engine.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only the version table, document shapes, result types, and
//! the error enum.

pub mod document;
pub mod error;
pub mod migration;
pub mod validation;
pub mod version;
