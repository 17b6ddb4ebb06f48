#![warn(
    clippy::pedantic,
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    rust_2021_compatibility
)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

//! `jnullness` reads the generic signatures of JVM members and resolves the nullness declared
//! for them with JSpecify-style annotations.
//! ## Features
#![doc = document_features::document_features!()]

pub mod analysis;
pub mod jvm;
pub(crate) mod macros;
pub mod nullness;
pub mod types;

/// Test utilities
#[cfg(test)]
pub mod tests;
