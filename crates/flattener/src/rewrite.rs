//! Install-name rewriting for flattened dylibs.
//!
//! Rewrites are best-effort: a failure is recorded in the returned
//! [`RewriteOutcome`] and logged, and never stops the remaining rewrites.

use std::path::Path;
use tracing::{debug, info, warn};
use xcflat_common::Result;
use xcflat_schema::{AuditLog, LayoutConfig, RewriteKind, RewriteOutcome};

use crate::executor::{execute, ToolOutput, ToolRunner};
use crate::parsers::{framework_references, parse_otool_dependencies};
use crate::tools::{MacTools, ToolCommand};

/// Result of rewriting the dependency list of one dylib.
#[derive(Debug, Clone, Default)]
pub struct DependencyRewrite {
    /// Set when `otool -L` could not be run or parsed.
    pub inspect_error: Option<String>,
    pub outcomes: Vec<RewriteOutcome>,
}

fn to_outcome(
    kind: RewriteKind,
    from: Option<String>,
    to: String,
    command: &ToolCommand,
    result: &Result<ToolOutput>,
) -> RewriteOutcome {
    let (exit_code, success, error) = match result {
        Ok(output) if output.success() => (output.exit_code, true, None),
        Ok(output) => (output.exit_code, false, Some(output.failure_reason())),
        Err(e) => (None, false, Some(e.to_string())),
    };

    RewriteOutcome {
        kind,
        from,
        to,
        command: command.to_string(),
        exit_code,
        success,
        error,
    }
}

/// Set the dylib's own install name to `@rpath/lib<name>.dylib`.
pub async fn rewrite_identity(
    runner: &dyn ToolRunner,
    audit: &mut AuditLog,
    layout: &LayoutConfig,
    name: &str,
    dylib: &Path,
) -> RewriteOutcome {
    let install_name = layout.install_name(name);
    let command = MacTools::new(&layout.tools).set_id(&install_name, dylib);
    info!("{}", command);

    let result = execute(runner, audit, &command).await;
    let outcome = to_outcome(RewriteKind::Identity, None, install_name, &command, &result);
    if let Some(ref error) = outcome.error {
        warn!("Failed to set install name of {:?}: {}", dylib, error);
    }
    outcome
}

/// Point framework-style dependency references at flattened dylib names.
pub async fn rewrite_dependencies(
    runner: &dyn ToolRunner,
    audit: &mut AuditLog,
    layout: &LayoutConfig,
    dylib: &Path,
) -> DependencyRewrite {
    let tools = MacTools::new(&layout.tools);
    let mut rewrite = DependencyRewrite::default();

    let command = tools.list_dependencies(dylib);
    let listing = match execute(runner, audit, &command).await {
        Ok(output) if output.success() => output.stdout,
        Ok(output) => {
            let reason = format!("{}: {}", command, output.failure_reason());
            warn!("Cannot read dependencies of {:?}: {}", dylib, reason);
            rewrite.inspect_error = Some(reason);
            return rewrite;
        }
        Err(e) => {
            warn!("Cannot read dependencies of {:?}: {}", dylib, e);
            rewrite.inspect_error = Some(e.to_string());
            return rewrite;
        }
    };

    let install_names = match parse_otool_dependencies(&listing) {
        Ok(names) => names,
        Err(e) => {
            rewrite.inspect_error = Some(e.to_string());
            return rewrite;
        }
    };
    debug!("{:?} links {} libraries", dylib, install_names.len());

    for reference in framework_references(
        &install_names,
        &layout.install_name_prefix,
        &layout.dylib_extension,
    ) {
        let target = layout.install_name(&reference.library);
        let command = tools.change_dependency(&reference.install_name, &target, dylib);
        info!("{}", command);

        let result = execute(runner, audit, &command).await;
        let outcome = to_outcome(
            RewriteKind::Dependency,
            Some(reference.install_name),
            target,
            &command,
            &result,
        );
        if let Some(ref error) = outcome.error {
            warn!("Failed to rewrite dependency in {:?}: {}", dylib, error);
        }
        rewrite.outcomes.push(outcome);
    }

    rewrite
}
