//! Module containing the APIs for the JVM elements.

pub mod declaration;
pub mod references;
