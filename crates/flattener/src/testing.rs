//! Scripted tool runner used by unit tests.
//!
//! `cp` is performed for real on the filesystem so output files appear;
//! `install_name_tool` and `otool` are simulated.

use async_trait::async_trait;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::Path;
use xcflat_common::Result;

use crate::executor::{ToolOutput, ToolRunner};

#[derive(Default)]
pub struct ScriptedRunner {
    otool_output: String,
    fail_copy: bool,
    fail_identity: bool,
    fail_inspect: bool,
    failing_changes: HashSet<String>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_otool_output(mut self, output: &str) -> Self {
        self.otool_output = output.to_string();
        self
    }

    pub fn fail_copy(mut self) -> Self {
        self.fail_copy = true;
        self
    }

    pub fn fail_identity(mut self) -> Self {
        self.fail_identity = true;
        self
    }

    pub fn fail_inspect(mut self) -> Self {
        self.fail_inspect = true;
        self
    }

    pub fn fail_change(mut self, install_name: &str) -> Self {
        self.failing_changes.insert(install_name.to_string());
        self
    }
}

fn exit(code: i32, stderr: &str) -> ToolOutput {
    ToolOutput {
        exit_code: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

fn copy_tree(source: &Path, destination: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(destination)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let target = destination.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[OsString]) -> Result<ToolOutput> {
        let output = match (program, args.first().and_then(|a| a.to_str())) {
            ("cp", _) if self.fail_copy => exit(1, "cp: permission denied"),
            ("cp", Some("-R")) => match copy_tree(Path::new(&args[1]), Path::new(&args[2])) {
                Ok(()) => exit(0, ""),
                Err(e) => exit(1, &e.to_string()),
            },
            ("cp", _) => match std::fs::copy(&args[0], &args[1]) {
                Ok(_) => exit(0, ""),
                Err(e) => exit(1, &e.to_string()),
            },
            ("install_name_tool", Some("-id")) if self.fail_identity => {
                exit(1, "install_name_tool: malformed object")
            }
            ("install_name_tool", Some("-change")) if args[1]
                .to_str()
                .is_some_and(|old| self.failing_changes.contains(old)) =>
            {
                exit(1, "install_name_tool: changing install names failed")
            }
            ("install_name_tool", _) => exit(0, ""),
            ("otool", _) if self.fail_inspect => exit(1, "otool: is not an object file"),
            ("otool", _) => ToolOutput {
                exit_code: Some(0),
                stdout: self.otool_output.clone(),
                stderr: String::new(),
            },
            _ => exit(127, "unknown tool"),
        };
        Ok(output)
    }
}
