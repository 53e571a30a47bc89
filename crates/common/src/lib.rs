//! Shared plumbing for the user database binaries: logging setup and
//! filesystem sanity checks.

pub mod env;
pub mod utils;
