//! Shared plumbing for the façade crates: logging bootstrap and wire types.

pub mod types;
pub mod utils;
