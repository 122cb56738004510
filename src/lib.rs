//! Wad - dependency artifact cache for CI
//!
//! Keys installed dependencies on the lockfile, platform and selected
//! environment variables, and keeps them as tarballs in S3 so the next
//! build can restore instead of reinstalling.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod store;
pub mod tools;

pub use error::{WadError, WadResult};
