//! ftbscan — audio plugin scanner.
//!
//! Thin binary entry point. All logic lives in the `ftbscan-core` crate.

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use ftbscan_core::analysis::{export_csv, CatalogSummary};
use ftbscan_core::platform::detect_architecture;
use ftbscan_core::preset::{read_preset, PRESET_EXTENSION};
use ftbscan_core::scanner::progress::format_progress;
use ftbscan_core::{FormatMask, PluginRecord, PluginScanner, ScanConfig, ScanProgress};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ftbscan",
    version,
    about = "Scan, validate and catalog VST2, VST3 and CLAP plugins"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan plugin directories and save the catalog as a preset
    Scan(ScanArgs),
    /// Print the records stored in a preset
    Show {
        preset: PathBuf,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the detected processor architecture
    Arch,
}

#[derive(Args)]
struct ScanArgs {
    /// Directory the timestamped preset is written to
    #[arg(short, long = "output", default_value = ".")]
    output: PathBuf,
    /// Extra search root (repeatable), scanned after the defaults
    #[arg(short, long = "path")]
    paths: Vec<PathBuf>,
    /// Do not scan the platform default roots
    #[arg(long)]
    no_default_paths: bool,
    #[arg(long)]
    no_vst2: bool,
    #[arg(long)]
    no_vst3: bool,
    #[arg(long)]
    no_clap: bool,
    /// JSON scan configuration to start from
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Also export the catalog as CSV
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Print records as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Scan(args) => run_scan(args),
        Command::Show { preset, json } => run_show(&preset, json),
        Command::Arch => {
            println!("{}", detect_architecture());
            Ok(())
        }
    }
}

fn build_config(args: &ScanArgs) -> Result<ScanConfig> {
    let mut config = match &args.config {
        Some(path) => ScanConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ScanConfig::default(),
    };

    if args.no_default_paths {
        config.search_paths.clear();
    }
    for path in &args.paths {
        if !config.add_search_path(path) {
            warn!("Ignoring missing search path {}", path.display());
        }
    }

    let formats = config.formats;
    config.formats = FormatMask::new(
        formats.vst2 && !args.no_vst2,
        formats.vst3 && !args.no_vst3,
        formats.clap && !args.no_clap,
    );
    Ok(config)
}

fn run_scan(args: ScanArgs) -> Result<()> {
    let config = build_config(&args)?;
    let scanner = Arc::new(PluginScanner::with_config(config));

    println!("\nFutureboard Plugin Scanner");
    println!("==========================\n");

    let handle = scanner.spawn_scan().context("Failed to start scan")?;
    let mut stdout = std::io::stdout();
    let mut last_width = 0usize;
    for message in handle.progress_rx.iter() {
        match message {
            ScanProgress::Update { message, progress } => {
                print!("\r{}", overwrite_line(&message, progress, &mut last_width));
                let _ = stdout.flush();
            }
            ScanProgress::Finished(_) => break,
        }
    }
    let report = handle.join().context("Scanner thread panicked")?;
    println!();

    let plugins = scanner.plugins();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&plugins)?);
    } else {
        println!("\nFound {} plugins:\n", plugins.len());
        for plugin in &plugins {
            print_plugin(plugin);
        }
    }

    let file_name = format!(
        "scan_result_{}.{PRESET_EXTENSION}",
        Local::now().format("%Y%m%d_%H%M%S")
    );
    let preset_path = args.output.join(file_name);
    println!("\nSaving results to: {}", preset_path.display());
    scanner
        .save_preset(&preset_path)
        .with_context(|| format!("Failed to save scan results to {}", preset_path.display()))?;
    if report.cancelled {
        println!("Scan was cancelled; partial results saved.");
    } else {
        println!("Scan completed successfully!");
    }

    if let Some(csv_path) = &args.csv {
        export_csv(csv_path, &plugins)
            .with_context(|| format!("Failed to export CSV to {}", csv_path.display()))?;
        println!("CSV written to: {}", csv_path.display());
    }

    print_summary(&plugins);
    Ok(())
}

/// Progress line padded with spaces so it fully covers the previous one.
fn overwrite_line(message: &str, progress: f32, last_width: &mut usize) -> String {
    let line = format_progress(message, progress);
    let width = line.chars().count();
    let pad = last_width.saturating_sub(width);
    *last_width = width;
    format!("{line}{}", " ".repeat(pad))
}

fn run_show(path: &Path, json: bool) -> Result<()> {
    let plugins =
        read_preset(path).with_context(|| format!("Failed to read preset {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plugins)?);
        return Ok(());
    }

    println!("{} plugins in {}:\n", plugins.len(), path.display());
    for plugin in &plugins {
        print_plugin(plugin);
    }
    print_summary(&plugins);
    Ok(())
}

fn print_plugin(plugin: &PluginRecord) {
    println!("Name: {}", plugin.name);
    println!("Format: {}", plugin.format);
    println!("Version: {}", plugin.version);
    println!("Vendor: {}", plugin.vendor);
    println!("Architecture: {}", plugin.architecture);
    println!("Path: {}", plugin.path.display());
    println!("Valid: {}", if plugin.is_valid { "Yes" } else { "No" });
    if let Some(error) = &plugin.error {
        println!("Error: {error}");
    }

    if plugin.is_valid {
        println!("Type: {}", plugin.kind_label());
        println!(
            "Audio: {} in, {} out",
            plugin.num_inputs, plugin.num_outputs
        );
        println!(
            "MIDI: {}, {}",
            if plugin.accepts_midi { "Accepts" } else { "No input" },
            if plugin.produces_midi { "Produces" } else { "No output" }
        );
        if !plugin.categories.is_empty() {
            println!("Categories: {}", plugin.categories.join(" "));
        }
        if !plugin.features.is_empty() {
            println!("Features: {}", plugin.features.join(" "));
        }
    }
    println!("-------------------");
}

fn print_summary(plugins: &[PluginRecord]) {
    println!("\nScan Summary:");
    println!("-------------");
    println!("{}", CatalogSummary::from_records(plugins));
}
