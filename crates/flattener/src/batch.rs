//! Processing every xcframework in a directory.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, error, info};
use xcflat_common::{Error, Result};
use xcflat_schema::{BatchReport, BundleOutcome, BundleStatus, LayoutConfig};

use crate::flatten::Flattener;

/// What to produce for each bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// Flatten into `lib<name>.dylib` and rewrite install names.
    #[default]
    Dylib,
    /// Copy the `.framework` directory unchanged.
    Framework,
}

impl FromStr for BatchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "dylib" => Ok(BatchMode::Dylib),
            "framework" => Ok(BatchMode::Framework),
            _ => Err(Error::Config(format!("Invalid batch mode: {}", s))),
        }
    }
}

/// Bundles found in a source directory.
#[derive(Debug, Default)]
pub struct Discovery {
    /// `(bundle path, library name)`, sorted by file name.
    pub bundles: Vec<(PathBuf, String)>,
    /// Entries that are not xcframework directories.
    pub skipped: Vec<String>,
}

/// List the xcframework directories directly inside `source`.
pub fn discover_bundles(layout: &LayoutConfig, source: &Path) -> Result<Discovery> {
    let mut discovery = Discovery::default();

    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().to_string();

        if !layout.is_bundle_name(&file_name) || !path.is_dir() {
            debug!("Skipping {:?}", path);
            discovery.skipped.push(file_name);
            continue;
        }

        let library = LayoutConfig::library_name(&file_name).to_string();
        discovery.bundles.push((path, library));
    }

    discovery.bundles.sort();
    discovery.skipped.sort();
    Ok(discovery)
}

/// Run `mode` for every bundle in `source`, writing into `output`.
///
/// A failing bundle is logged and recorded; the rest are still processed.
pub async fn process_directory(
    flattener: &mut Flattener,
    source: &Path,
    output: &Path,
    mode: BatchMode,
) -> Result<BatchReport> {
    let mut report = BatchReport::new(source.to_path_buf(), output.to_path_buf());

    let discovery = discover_bundles(flattener.layout(), source)?;
    info!(
        "Found {} bundles in {:?} ({} other entries skipped)",
        discovery.bundles.len(),
        source,
        discovery.skipped.len()
    );
    report.skipped_entries = discovery.skipped;

    for (bundle_path, library) in discovery.bundles {
        let result = match mode {
            BatchMode::Dylib => flattener
                .flatten_bundle(&bundle_path, &library, output)
                .await
                .map(BundleStatus::Flattened),
            BatchMode::Framework => flattener
                .copy_framework(&bundle_path, &library, output)
                .await
                .map(|output_path| BundleStatus::Copied { output_path }),
        };
        let status = result.unwrap_or_else(|e| BundleStatus::Failed {
            reason: e.to_string(),
        });

        if let BundleStatus::Failed { ref reason } = status {
            error!("Skipping {}: {}", library, reason);
        }

        report.bundles.push(BundleOutcome {
            bundle_path,
            library,
            status,
        });
    }

    report.completed_at = Utc::now();
    info!(
        "Processed {} bundles: {} succeeded, {} failed",
        report.bundles.len(),
        report.succeeded(),
        report.failed()
    );

    Ok(report)
}
