//! Sampling, discovery and publishing.

pub mod assembler;
pub mod collectors;
pub mod discovery;
pub mod executor;
pub mod host;
pub mod metric;
pub mod publisher;
pub mod topics;
