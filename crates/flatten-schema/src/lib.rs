//! Shared data types for xcflat.
//!
//! This crate defines the layout configuration that drives bundle probing,
//! the reports produced by a flattening run, and the tool audit log.

pub mod audit;
pub mod layout;
pub mod report;

pub use audit::{AuditEntry, AuditLog, ToolCategory};
pub use layout::{LayoutConfig, ToolNames};
pub use report::{
    BatchReport, BundleOutcome, BundleStatus, FlattenReport, RewriteKind, RewriteOutcome,
};
