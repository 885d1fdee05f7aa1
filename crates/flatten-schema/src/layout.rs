//! Bundle layout conventions.
//!
//! Everything the flattener knows about how xcframeworks are laid out on disk
//! lives here, so new internal versioning schemes can be supported through a
//! config file instead of a code change.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use xcflat_common::{Error, Result};

/// Placeholder substituted with the library name in candidate templates.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Names of the external tools the flattener shells out to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolNames {
    pub copy: String,
    pub install_name_tool: String,
    pub otool: String,
}

impl Default for ToolNames {
    fn default() -> Self {
        Self {
            copy: "cp".to_string(),
            install_name_tool: "install_name_tool".to_string(),
            otool: "otool".to_string(),
        }
    }
}

impl ToolNames {
    /// All configured programs, in invocation order.
    pub fn all(&self) -> [&str; 3] {
        [
            self.copy.as_str(),
            self.install_name_tool.as_str(),
            self.otool.as_str(),
        ]
    }
}

/// Layout and naming conventions for xcframework flattening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Architecture slice directory inside the xcframework.
    pub slice: String,
    /// Extension (without dot) identifying xcframework directories.
    pub bundle_extension: String,
    /// Binary locations relative to the `.framework` directory, tried in order.
    pub candidates: Vec<String>,
    /// Token prefixed to rewritten install names.
    pub install_name_prefix: String,
    pub dylib_prefix: String,
    pub dylib_extension: String,
    pub tools: ToolNames,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            slice: "macos-arm64_x86_64".to_string(),
            bundle_extension: "xcframework".to_string(),
            candidates: vec![
                "Versions/A/{name}".to_string(),
                "Versions/Current/{name}".to_string(),
                "Versions/B/{name}".to_string(),
                "{name}".to_string(),
            ],
            install_name_prefix: "@rpath".to_string(),
            dylib_prefix: "lib".to_string(),
            dylib_extension: "dylib".to_string(),
            tools: ToolNames::default(),
        }
    }
}

impl LayoutConfig {
    /// Load a layout from a YAML or JSON file, chosen by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LayoutConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the layout is usable.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("slice", &self.slice),
            ("bundle_extension", &self.bundle_extension),
            ("install_name_prefix", &self.install_name_prefix),
            ("dylib_extension", &self.dylib_extension),
            ("tools.copy", &self.tools.copy),
            ("tools.install_name_tool", &self.tools.install_name_tool),
            ("tools.otool", &self.tools.otool),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} must not be empty", field)));
            }
        }

        if self.candidates.is_empty() {
            return Err(Error::Config(
                "at least one binary candidate is required".to_string(),
            ));
        }
        if let Some(bad) = self
            .candidates
            .iter()
            .find(|c| !c.contains(NAME_PLACEHOLDER))
        {
            return Err(Error::Config(format!(
                "candidate {:?} does not contain {}",
                bad, NAME_PLACEHOLDER
            )));
        }

        Ok(())
    }

    /// `<bundle>/<slice>/<name>.framework`
    pub fn framework_dir(&self, bundle: &Path, name: &str) -> PathBuf {
        bundle.join(&self.slice).join(format!("{}.framework", name))
    }

    /// Candidate binary paths for `name`, in search order.
    pub fn candidate_paths(&self, framework_dir: &Path, name: &str) -> Vec<PathBuf> {
        self.candidates
            .iter()
            .map(|template| framework_dir.join(template.replace(NAME_PLACEHOLDER, name)))
            .collect()
    }

    /// `lib<name>.dylib`
    pub fn dylib_file_name(&self, name: &str) -> String {
        format!("{}{}.{}", self.dylib_prefix, name, self.dylib_extension)
    }

    /// `@rpath/lib<name>.dylib`
    pub fn install_name(&self, name: &str) -> String {
        format!("{}/{}", self.install_name_prefix, self.dylib_file_name(name))
    }

    /// Whether a directory entry name carries the bundle extension.
    pub fn is_bundle_name(&self, file_name: &str) -> bool {
        file_name.ends_with(&format!(".{}", self.bundle_extension))
    }

    /// Library name of a bundle: the directory name up to the first dot.
    pub fn library_name(bundle_dir_name: &str) -> &str {
        bundle_dir_name.split('.').next().unwrap_or(bundle_dir_name)
    }
}
