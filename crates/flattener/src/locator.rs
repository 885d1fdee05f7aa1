//! Locating the binary payload inside a framework bundle.

use std::path::{Path, PathBuf};
use tracing::debug;
use xcflat_schema::LayoutConfig;

/// Return the first candidate that exists and is a regular file.
pub fn locate_binary(layout: &LayoutConfig, framework_dir: &Path, name: &str) -> Option<PathBuf> {
    debug!("Looking for {} binary in {:?}", name, framework_dir);

    for path in layout.candidate_paths(framework_dir, name) {
        // is_file follows symlinks, so Versions/Current/<name> resolves.
        if path.is_file() {
            debug!("Found binary: {:?}", path);
            return Some(path);
        }
        debug!("Not present: {:?}", path);
    }

    None
}
