//! Report types - the result of flattening one bundle or a whole directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which load command a rewrite touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteKind {
    /// `LC_ID_DYLIB`, set with `install_name_tool -id`.
    Identity,
    /// `LC_LOAD_DYLIB`, changed with `install_name_tool -change`.
    Dependency,
}

/// Result of a single install-name rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteOutcome {
    pub kind: RewriteKind,
    /// Previous install name (dependency rewrites only).
    pub from: Option<String>,
    pub to: String,
    pub command: String,
    pub exit_code: Option<i32>,
    pub success: bool,
    pub error: Option<String>,
}

/// Result of flattening one xcframework into a dylib.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlattenReport {
    pub library: String,
    pub bundle_path: PathBuf,
    /// Binary the locator selected inside the framework.
    pub binary_path: PathBuf,
    pub output_path: PathBuf,
    /// SHA256 of the output after all rewrites.
    pub output_sha256: Option<String>,
    pub identity: RewriteOutcome,
    /// Set when the dependency list could not be read.
    pub inspect_error: Option<String>,
    pub dependencies: Vec<RewriteOutcome>,
}

impl FlattenReport {
    /// Whether the identity, inspection and every dependency rewrite succeeded.
    pub fn all_rewrites_succeeded(&self) -> bool {
        self.identity.success
            && self.inspect_error.is_none()
            && self.dependencies.iter().all(|d| d.success)
    }

    pub fn failed_rewrites(&self) -> impl Iterator<Item = &RewriteOutcome> {
        std::iter::once(&self.identity)
            .chain(self.dependencies.iter())
            .filter(|r| !r.success)
    }
}

/// What happened to one bundle in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BundleStatus {
    Flattened(FlattenReport),
    Copied { output_path: PathBuf },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleOutcome {
    pub bundle_path: PathBuf,
    pub library: String,
    pub status: BundleStatus,
}

impl BundleOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self.status, BundleStatus::Failed { .. })
    }
}

/// Result of processing every bundle in a source directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub bundles: Vec<BundleOutcome>,
    /// Directory entries that were not xcframework directories.
    pub skipped_entries: Vec<String>,
}

impl BatchReport {
    pub fn new(source_dir: PathBuf, output_dir: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            source_dir,
            output_dir,
            started_at: now,
            completed_at: now,
            bundles: Vec::new(),
            skipped_entries: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.bundles.iter().filter(|b| b.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.bundles.len() - self.succeeded()
    }

    /// Number of individual rewrites that failed across all flattened bundles.
    pub fn failed_rewrites(&self) -> usize {
        self.bundles
            .iter()
            .map(|b| match &b.status {
                BundleStatus::Flattened(report) => report.failed_rewrites().count(),
                _ => 0,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(kind: RewriteKind, success: bool) -> RewriteOutcome {
        RewriteOutcome {
            kind,
            from: None,
            to: "@rpath/libFoo.dylib".to_string(),
            command: "install_name_tool".to_string(),
            exit_code: Some(if success { 0 } else { 1 }),
            success,
            error: None,
        }
    }

    fn flatten_report(identity_ok: bool, deps: Vec<bool>) -> FlattenReport {
        FlattenReport {
            library: "Foo".to_string(),
            bundle_path: PathBuf::from("libs/Foo.xcframework"),
            binary_path: PathBuf::from("libs/Foo.xcframework/x/Foo"),
            output_path: PathBuf::from("out/libFoo.dylib"),
            output_sha256: None,
            identity: rewrite(RewriteKind::Identity, identity_ok),
            inspect_error: None,
            dependencies: deps
                .into_iter()
                .map(|ok| rewrite(RewriteKind::Dependency, ok))
                .collect(),
        }
    }

    #[test]
    fn test_rewrite_accounting() {
        assert!(flatten_report(true, vec![true, true]).all_rewrites_succeeded());

        let report = flatten_report(false, vec![true, false]);
        assert!(!report.all_rewrites_succeeded());
        assert_eq!(report.failed_rewrites().count(), 2);

        let mut report = flatten_report(true, vec![]);
        report.inspect_error = Some("otool not found".to_string());
        assert!(!report.all_rewrites_succeeded());
    }

    #[test]
    fn test_batch_counts_and_serialization() {
        let mut batch = BatchReport::new(PathBuf::from("libs"), PathBuf::from("out"));
        batch.bundles.push(BundleOutcome {
            bundle_path: PathBuf::from("libs/Foo.xcframework"),
            library: "Foo".to_string(),
            status: BundleStatus::Flattened(flatten_report(true, vec![false])),
        });
        batch.bundles.push(BundleOutcome {
            bundle_path: PathBuf::from("libs/Bar.xcframework"),
            library: "Bar".to_string(),
            status: BundleStatus::Failed {
                reason: "no binary".to_string(),
            },
        });

        assert_eq!(batch.succeeded(), 1);
        assert_eq!(batch.failed(), 1);
        assert_eq!(batch.failed_rewrites(), 1);

        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["bundles"][0]["status"]["kind"], "flattened");
        assert_eq!(json["bundles"][0]["status"]["identity"]["kind"], "identity");
        assert_eq!(json["bundles"][1]["status"]["kind"], "failed");
        assert_eq!(json["bundles"][1]["status"]["reason"], "no binary");
    }
}
