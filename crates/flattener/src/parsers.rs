//! Parsers for tool outputs.

use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;

/// A dependency reference that should point at a flattened dylib.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkReference {
    /// Install name as currently recorded in the binary.
    pub install_name: String,
    /// Bare library name (last path component).
    pub library: String,
}

/// Parse `otool -L` output into the list of install names.
pub fn parse_otool_dependencies(output: &str) -> Result<Vec<String>> {
    // otool -L output:
    //   out/libFoo.dylib:
    //   	@rpath/libFoo.dylib (compatibility version 0.0.0, current version 0.0.0)
    //   	@rpath/Bar.framework/Versions/A/Bar (compatibility version 1.0.0, current version 1.0.0)
    let re = Regex::new(r"^\s*(?P<name>.+?)\s+\(compatibility version [^)]*\)\s*$")?;

    let mut names = Vec::new();
    for line in output.lines() {
        // The header line names the file itself and is not indented.
        if !line.starts_with(char::is_whitespace) {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let name = match re.captures(line) {
            Some(caps) => caps["name"].to_string(),
            None => line.trim().to_string(),
        };
        names.push(name);
    }

    Ok(names)
}

/// Select references that use `prefix` and are not already flattened.
///
/// Universal binaries list their dependencies once per architecture; each
/// install name is returned once, in first-seen order.
pub fn framework_references(
    install_names: &[String],
    prefix: &str,
    flattened_extension: &str,
) -> Vec<FrameworkReference> {
    let suffix = format!(".{}", flattened_extension);
    let mut seen = HashSet::new();

    install_names
        .iter()
        .filter(|name| name.starts_with(prefix) && !name.ends_with(&suffix))
        .filter(|name| seen.insert(name.as_str()))
        .filter_map(|name| {
            let library = name.rsplit('/').next().filter(|s| !s.is_empty())?;
            Some(FrameworkReference {
                install_name: name.clone(),
                library: library.to_string(),
            })
        })
        .collect()
}
