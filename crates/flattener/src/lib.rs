//! xcflat core - flatten xcframework bundles into standalone dylibs.
//!
//! The pipeline for one bundle is: locate the binary inside the framework,
//! copy it out as `lib<name>.dylib`, set its install name, then point its
//! framework-style dependencies at the flattened names.

pub mod batch;
pub mod executor;
pub mod flatten;
pub mod locator;
pub mod parsers;
pub mod rewrite;
pub mod tools;

#[cfg(test)]
mod testing;

pub use batch::{discover_bundles, process_directory, BatchMode};
pub use executor::{missing_tools, LocalRunner, ToolOutput, ToolRunner};
pub use flatten::Flattener;
