//! Command lines for the external tools.
//!
//! Every invocation the flattener can make is built here.

use std::ffi::OsString;
use std::path::Path;
use xcflat_schema::{ToolCategory, ToolNames};

/// A fully built tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    /// Passed to the process unchanged, so non-UTF-8 paths survive.
    pub args: Vec<OsString>,
    pub category: ToolCategory,
}

impl ToolCommand {
    fn new(program: &str, args: Vec<OsString>, category: ToolCategory) -> Self {
        Self {
            program: program.to_string(),
            args,
            category,
        }
    }
}

impl std::fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

fn path_arg(path: &Path) -> OsString {
    path.as_os_str().to_os_string()
}

/// Builder for `cp`, `install_name_tool` and `otool` invocations.
pub struct MacTools<'a> {
    names: &'a ToolNames,
}

impl<'a> MacTools<'a> {
    pub fn new(names: &'a ToolNames) -> Self {
        Self { names }
    }

    /// `cp <source> <destination>`
    pub fn copy_file(&self, source: &Path, destination: &Path) -> ToolCommand {
        ToolCommand::new(
            &self.names.copy,
            vec![path_arg(source), path_arg(destination)],
            ToolCategory::Copy,
        )
    }

    /// `cp -R <source> <destination>`; symlinks inside the tree are kept as links.
    pub fn copy_tree(&self, source: &Path, destination: &Path) -> ToolCommand {
        ToolCommand::new(
            &self.names.copy,
            vec!["-R".into(), path_arg(source), path_arg(destination)],
            ToolCategory::Copy,
        )
    }

    /// `install_name_tool -id <install_name> <file>`
    pub fn set_id(&self, install_name: &str, file: &Path) -> ToolCommand {
        ToolCommand::new(
            &self.names.install_name_tool,
            vec!["-id".into(), install_name.into(), path_arg(file)],
            ToolCategory::Identity,
        )
    }

    /// `install_name_tool -change <old> <new> <file>`
    pub fn change_dependency(&self, old: &str, new: &str, file: &Path) -> ToolCommand {
        ToolCommand::new(
            &self.names.install_name_tool,
            vec![
                "-change".into(),
                old.into(),
                new.into(),
                path_arg(file),
            ],
            ToolCategory::Dependency,
        )
    }

    /// `otool -L <file>`
    pub fn list_dependencies(&self, file: &Path) -> ToolCommand {
        ToolCommand::new(
            &self.names.otool,
            vec!["-L".into(), path_arg(file)],
            ToolCategory::Inspect,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_are_not_shell_quoted() {
        let names = ToolNames::default();
        let tools = MacTools::new(&names);

        let cmd = tools.copy_file(
            Path::new("/sdk/My Libs/Foo.framework/Foo"),
            Path::new("out/libFoo.dylib"),
        );
        assert_eq!(cmd.program, "cp");
        assert_eq!(
            cmd.args,
            vec!["/sdk/My Libs/Foo.framework/Foo", "out/libFoo.dylib"]
        );
        assert_eq!(cmd.category, ToolCategory::Copy);
    }

    #[test]
    fn test_install_name_tool_commands() {
        let names = ToolNames::default();
        let tools = MacTools::new(&names);
        let file = Path::new("out/libFoo.dylib");

        let id = tools.set_id("@rpath/libFoo.dylib", file);
        assert_eq!(
            id.to_string(),
            "install_name_tool -id @rpath/libFoo.dylib out/libFoo.dylib"
        );

        let change = tools.change_dependency(
            "@rpath/Bar.framework/Versions/A/Bar",
            "@rpath/libBar.dylib",
            file,
        );
        assert_eq!(change.category, ToolCategory::Dependency);
        assert_eq!(change.args[0], "-change");
        assert_eq!(change.args.len(), 4);
    }

    #[test]
    fn test_configured_tool_names() {
        let names = ToolNames {
            otool: "llvm-otool".to_string(),
            ..Default::default()
        };
        let tools = MacTools::new(&names);

        let cmd = tools.list_dependencies(Path::new("libFoo.dylib"));
        assert_eq!(cmd.to_string(), "llvm-otool -L libFoo.dylib");

        let cmd = tools.copy_tree(Path::new("Foo.framework"), Path::new("out/Foo.framework"));
        assert_eq!(cmd.args[0], "-R");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_paths_pass_through() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let names = ToolNames::default();
        let tools = MacTools::new(&names);
        let source = Path::new(OsStr::from_bytes(b"/sdk/Fo\xffo.framework/Foo"));

        let cmd = tools.copy_file(source, Path::new("out/libFoo.dylib"));
        assert_eq!(cmd.args[0].as_os_str(), source.as_os_str());
        assert_eq!(cmd.args[0].as_bytes(), b"/sdk/Fo\xffo.framework/Foo");
    }
}
