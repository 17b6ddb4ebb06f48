//! APIs for analyzing declarations.

pub mod cache;
pub mod parameter_types;
