//! Common utilities and types shared across xcflat crates.

pub mod error;
pub mod hash;

pub use error::{Error, Result};
