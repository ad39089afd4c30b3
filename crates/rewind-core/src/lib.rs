//! # rewind-core
//!
//! Core types shared by all Rewind crates.
//!
//! This crate provides the vocabulary the revision engine works in:
//! - Typed scalar values and the raw storage scalars they are converted from
//! - Storage types with their conversion rules
//! - Entity metadata (fields, associations, discriminator maps)
//! - Hydrated entity graphs with lazy references and lazy collections
//! - Identifiers, revision kinds, and revision collections
//! - Field-level changesets produced by restores and diffs
//! - Cross-cutting error types

pub mod changeset;
pub mod entity;
pub mod errors;
pub mod identifier;
pub mod metadata;
pub mod revision;
pub mod storage;
pub mod value;
