//! xcflat - Flatten xcframework bundles into standalone dylibs.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use xcflat_core::{missing_tools, process_directory, BatchMode, Flattener};
use xcflat_schema::{AuditLog, BatchReport, BundleStatus, FlattenReport, LayoutConfig};

const DEFAULT_OUTPUT: &str = "./agora_sdk";

#[derive(Parser)]
#[command(name = "xcflat")]
#[command(
    author,
    version,
    about = "Convert xcframework bundles into flat dylibs with rewritten install names"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Layout configuration file (YAML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every xcframework in a directory
    Convert {
        /// Directory containing <name>.xcframework bundles
        #[arg(long, short)]
        source: PathBuf,

        /// Output directory
        #[arg(long, short, default_value = DEFAULT_OUTPUT)]
        out: PathBuf,

        /// What to produce per bundle (dylib, framework)
        #[arg(long, default_value = "dylib")]
        mode: String,

        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Write the tool audit log as JSONL
        #[arg(long)]
        audit: Option<PathBuf>,
    },

    /// Flatten a single xcframework into lib<name>.dylib
    Flatten {
        /// Path to the .xcframework directory
        #[arg(long)]
        bundle: PathBuf,

        /// Library name (defaults to the bundle name up to the first dot)
        #[arg(long)]
        name: Option<String>,

        /// Output directory
        #[arg(long, short, default_value = DEFAULT_OUTPUT)]
        out: PathBuf,
    },

    /// Copy the .framework out of an xcframework without flattening
    CopyFramework {
        /// Path to the .xcframework directory
        #[arg(long)]
        bundle: PathBuf,

        /// Library name (defaults to the bundle name up to the first dot)
        #[arg(long)]
        name: Option<String>,

        /// Output directory
        #[arg(long, short, default_value = DEFAULT_OUTPUT)]
        out: PathBuf,
    },

    /// Print the binary that would be flattened for a bundle
    Locate {
        /// Path to the .xcframework directory
        #[arg(long)]
        bundle: PathBuf,

        /// Library name (defaults to the bundle name up to the first dot)
        #[arg(long)]
        name: Option<String>,
    },

    /// Print the effective layout configuration
    ShowConfig,
}

fn load_layout(config: Option<&Path>) -> Result<LayoutConfig> {
    match config {
        Some(path) => {
            info!("Loading layout from {:?}", path);
            LayoutConfig::load(path).with_context(|| format!("Failed to load {:?}", path))
        }
        None => Ok(LayoutConfig::default()),
    }
}

/// Library name from `--name`, or from the bundle directory name.
fn library_name(bundle: &Path, name: Option<String>) -> Result<String> {
    if let Some(name) = name {
        return Ok(name);
    }
    let file_name = bundle
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Cannot derive a library name from {:?}", bundle))?;
    Ok(LayoutConfig::library_name(file_name).to_string())
}

fn warn_missing_tools(layout: &LayoutConfig) {
    let missing = missing_tools(&layout.tools);
    if !missing.is_empty() {
        warn!(
            "Missing tools: {} (rewrites will fail on this host)",
            missing.join(", ")
        );
    }
}

fn write_report(path: &Path, report: &BatchReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    info!("Report written to {:?}", path);
    Ok(())
}

fn write_audit(path: &Path, audit: &AuditLog) -> Result<()> {
    std::fs::write(path, audit.to_jsonl())
        .with_context(|| format!("Failed to write {:?}", path))?;
    info!("Audit log written to {:?}", path);
    Ok(())
}

fn locate_or_fail(flattener: &Flattener, bundle: &Path, name: &str) -> Result<PathBuf> {
    flattener
        .locate(bundle, name)
        .with_context(|| format!("No binary found for {} in {:?}", name, bundle))
}

fn print_flatten_report(report: &FlattenReport) {
    println!("{} -> {}", report.library, report.output_path.display());
    println!("  binary:   {}", report.binary_path.display());
    println!(
        "  id:       {} [{}]",
        report.identity.to,
        if report.identity.success { "ok" } else { "failed" }
    );
    if let Some(ref error) = report.inspect_error {
        println!("  deps:     not inspected ({})", error);
    }
    for dep in &report.dependencies {
        println!(
            "  dep:      {} -> {} [{}]",
            dep.from.as_deref().unwrap_or("?"),
            dep.to,
            if dep.success { "ok" } else { "failed" }
        );
    }
}

fn print_batch_summary(report: &BatchReport) {
    println!("\n=== Conversion Summary ===");
    println!("Source: {}", report.source_dir.display());
    println!("Output: {}", report.output_dir.display());
    println!(
        "Bundles: {} ({} succeeded, {} failed)",
        report.bundles.len(),
        report.succeeded(),
        report.failed()
    );
    if report.failed_rewrites() > 0 {
        println!("Failed rewrites: {}", report.failed_rewrites());
    }

    for bundle in &report.bundles {
        match &bundle.status {
            BundleStatus::Flattened(flattened) => {
                println!("  [ok]     {}", flattened.output_path.display())
            }
            BundleStatus::Copied { output_path } => {
                println!("  [ok]     {}", output_path.display())
            }
            BundleStatus::Failed { reason } => {
                println!("  [failed] {}: {}", bundle.library, reason)
            }
        }
    }
}

fn print_tool_failures(audit: &AuditLog) {
    let failures: Vec<_> = audit.failures().collect();
    if failures.is_empty() {
        return;
    }

    println!("\nFailed tool calls: {}", failures.len());
    for entry in failures {
        println!(
            "  {}: {}",
            entry.command_line(),
            entry.error.as_deref().unwrap_or("unknown error")
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let layout = load_layout(cli.config.as_deref())?;

    match cli.command {
        Commands::Convert {
            source,
            out,
            mode,
            report,
            audit,
        } => {
            let mode: BatchMode = mode.parse()?;
            info!("Converting bundles in {:?} ({:?})", source, mode);
            if mode == BatchMode::Dylib {
                warn_missing_tools(&layout);
            }

            let mut flattener = Flattener::local(layout);
            let batch = process_directory(&mut flattener, &source, &out, mode)
                .await
                .with_context(|| format!("Failed to process {:?}", source))?;

            if let Some(path) = report {
                write_report(&path, &batch)?;
            }
            if let Some(path) = audit {
                write_audit(&path, flattener.audit())?;
            }

            print_batch_summary(&batch);
            print_tool_failures(flattener.audit());
        }

        Commands::Flatten { bundle, name, out } => {
            let name = library_name(&bundle, name)?;
            warn_missing_tools(&layout);

            let mut flattener = Flattener::local(layout);
            let report = flattener
                .flatten_bundle(&bundle, &name, &out)
                .await
                .with_context(|| format!("Failed to flatten {}", name))?;

            print_flatten_report(&report);
        }

        Commands::CopyFramework { bundle, name, out } => {
            let name = library_name(&bundle, name)?;

            let mut flattener = Flattener::local(layout);
            let destination = flattener
                .copy_framework(&bundle, &name, &out)
                .await
                .with_context(|| format!("Failed to copy {}.framework", name))?;

            println!("{}", destination.display());
        }

        Commands::Locate { bundle, name } => {
            let name = library_name(&bundle, name)?;

            let flattener = Flattener::local(layout);
            let path = locate_or_fail(&flattener, &bundle, &name)?;
            println!("{}", path.display());
        }

        Commands::ShowConfig => {
            print!("{}", serde_yaml::to_string(&layout)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use xcflat_schema::{AuditEntry, ToolCategory};

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_convert_defaults() {
        let cli = Cli::try_parse_from(["xcflat", "convert", "--source", "libs"]).unwrap();
        match cli.command {
            Commands::Convert {
                source, out, mode, ..
            } => {
                assert_eq!(source, PathBuf::from("libs"));
                assert_eq!(out, PathBuf::from(DEFAULT_OUTPUT));
                assert_eq!(mode, "dylib");
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_library_name() {
        let bundle = Path::new("/sdk/libs/AgoraRtcKit.xcframework");
        assert_eq!(library_name(bundle, None).unwrap(), "AgoraRtcKit");
        assert_eq!(
            library_name(bundle, Some("Custom".to_string())).unwrap(),
            "Custom"
        );
        assert!(library_name(Path::new("/"), None).is_err());
    }

    #[test]
    fn test_default_layout_without_config() {
        assert_eq!(load_layout(None).unwrap(), LayoutConfig::default());
    }

    #[test]
    fn test_write_report() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("report.json");
        let report = BatchReport::new(PathBuf::from("libs"), PathBuf::from("out"));

        write_report(&path, &report).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["source_dir"], "libs");
        assert!(json["bundles"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_write_audit() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("audit.jsonl");
        let now = chrono::Utc::now();
        let mut audit = AuditLog::new();
        for (program, code) in [("cp", 0), ("otool", 1)] {
            audit.add(AuditEntry::new(
                program.to_string(),
                vec!["out/libFoo.dylib".to_string()],
                ToolCategory::Copy,
                now,
                now,
                Some(code),
                0,
                0,
                None,
            ));
        }

        write_audit(&path, &audit).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<AuditEntry> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].program, "otool");
        assert!(!entries[1].success);
        assert_eq!(audit.failures().count(), 1);
    }

    #[test]
    fn test_write_report_to_missing_directory_fails() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("missing/report.json");
        let report = BatchReport::new(PathBuf::from("libs"), PathBuf::from("out"));
        assert!(write_report(&path, &report).is_err());
    }

    #[test]
    fn test_locate() {
        let temp = tempfile::tempdir().unwrap();
        let bundle = temp.path().join("Foo.xcframework");
        let flattener = Flattener::local(LayoutConfig::default());

        let err = locate_or_fail(&flattener, &bundle, "Foo").unwrap_err();
        assert!(err.to_string().contains("No binary found for Foo"));

        let binary = bundle.join("macos-arm64_x86_64/Foo.framework/Versions/A/Foo");
        std::fs::create_dir_all(binary.parent().unwrap()).unwrap();
        std::fs::write(&binary, "binary").unwrap();
        assert_eq!(locate_or_fail(&flattener, &bundle, "Foo").unwrap(), binary);
    }
}
