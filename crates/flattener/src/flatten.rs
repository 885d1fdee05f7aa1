//! Flattening a single xcframework into `lib<name>.dylib`.

use std::path::{Path, PathBuf};
use tracing::{info, warn};
use xcflat_common::{hash, Error, Result};
use xcflat_schema::{AuditLog, FlattenReport, LayoutConfig};

use crate::executor::{execute, LocalRunner, ToolRunner};
use crate::locator::locate_binary;
use crate::rewrite::{rewrite_dependencies, rewrite_identity};
use crate::tools::MacTools;

/// Remove whatever is at `path` without following symlinks.
fn remove_existing(path: &Path) -> Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => {
            info!("Replacing existing {:?}", path);
            std::fs::remove_dir_all(path)?;
        }
        Ok(_) => {
            info!("Replacing existing {:?}", path);
            std::fs::remove_file(path)?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Create the output directory (mode 0755) if it does not exist yet.
pub fn ensure_output_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }

    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(path)?;

    info!("Created output directory {:?}", path);
    Ok(())
}

/// Drives the locate, copy and rewrite pipeline.
pub struct Flattener {
    layout: LayoutConfig,
    runner: Box<dyn ToolRunner>,
    audit: AuditLog,
}

impl Flattener {
    pub fn new(layout: LayoutConfig, runner: Box<dyn ToolRunner>) -> Self {
        Self {
            layout,
            runner,
            audit: AuditLog::new(),
        }
    }

    /// Flattener that runs the real tools as child processes.
    pub fn local(layout: LayoutConfig) -> Self {
        Self::new(layout, Box::new(LocalRunner::new()))
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Every tool invocation made so far.
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Locate the binary of `name` inside `bundle`.
    pub fn locate(&self, bundle: &Path, name: &str) -> Option<PathBuf> {
        let framework_dir = self.layout.framework_dir(bundle, name);
        locate_binary(&self.layout, &framework_dir, name)
    }

    /// Copy the binary of `name` out of `bundle` as `lib<name>.dylib` and
    /// rewrite its install names.
    ///
    /// Fails if no binary is found or the copy fails; rewrite failures are
    /// recorded in the report instead.
    pub async fn flatten_bundle(
        &mut self,
        bundle: &Path,
        name: &str,
        output_dir: &Path,
    ) -> Result<FlattenReport> {
        info!("Flattening {} from {:?}", name, bundle);

        let binary = match self.locate(bundle, name) {
            Some(path) => path,
            None => {
                let framework_dir = self.layout.framework_dir(bundle, name);
                return Err(Error::BinaryNotFound {
                    library: name.to_string(),
                    searched: self.layout.candidate_paths(&framework_dir, name),
                });
            }
        };
        info!("Found binary: {:?}", binary);

        ensure_output_dir(output_dir)?;
        let output = output_dir.join(self.layout.dylib_file_name(name));

        let command = MacTools::new(&self.layout.tools).copy_file(&binary, &output);
        info!("{}", command);
        let copied = execute(&*self.runner, &mut self.audit, &command)
            .await
            .map_err(|e| Error::CopyFailed {
                source_path: binary.clone(),
                destination: output.clone(),
                reason: e.to_string(),
            })?;
        if !copied.success() {
            return Err(Error::CopyFailed {
                source_path: binary,
                destination: output,
                reason: copied.failure_reason(),
            });
        }

        let identity =
            rewrite_identity(&*self.runner, &mut self.audit, &self.layout, name, &output).await;
        let dependencies =
            rewrite_dependencies(&*self.runner, &mut self.audit, &self.layout, &output).await;

        let output_sha256 = match hash::sha256_file(&output) {
            Ok(digest) => Some(digest),
            Err(e) => {
                warn!("Could not hash {:?}: {}", output, e);
                None
            }
        };

        let report = FlattenReport {
            library: name.to_string(),
            bundle_path: bundle.to_path_buf(),
            binary_path: binary,
            output_path: output,
            output_sha256,
            identity,
            inspect_error: dependencies.inspect_error,
            dependencies: dependencies.outcomes,
        };

        if report.all_rewrites_succeeded() {
            info!(
                "Wrote {:?} ({} dependencies rewritten)",
                report.output_path,
                report.dependencies.len()
            );
        } else {
            warn!(
                "Wrote {:?} with {} failed rewrites",
                report.output_path,
                report.failed_rewrites().count()
            );
        }

        Ok(report)
    }

    /// Copy `<bundle>/<slice>/<name>.framework` verbatim into `output_dir`.
    pub async fn copy_framework(
        &mut self,
        bundle: &Path,
        name: &str,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        let framework_dir = self.layout.framework_dir(bundle, name);
        if !framework_dir.is_dir() {
            return Err(Error::FrameworkNotFound(framework_dir));
        }

        ensure_output_dir(output_dir)?;
        let destination = output_dir.join(format!("{}.framework", name));
        // cp -R into an existing directory would nest the copy inside it.
        remove_existing(&destination)?;

        let command = MacTools::new(&self.layout.tools).copy_tree(&framework_dir, &destination);
        info!("{}", command);
        let copied = execute(&*self.runner, &mut self.audit, &command)
            .await
            .map_err(|e| Error::CopyFailed {
                source_path: framework_dir.clone(),
                destination: destination.clone(),
                reason: e.to_string(),
            })?;
        if !copied.success() {
            return Err(Error::CopyFailed {
                source_path: framework_dir,
                destination,
                reason: copied.failure_reason(),
            });
        }

        info!("Copied framework to {:?}", destination);
        Ok(destination)
    }
}
