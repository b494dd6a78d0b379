use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dialoguer::Confirm;
use docprune::config::{FileConfig, PageRange};
use docprune::convert::{CommandConverter, Converter};
use docprune::core::{Cluster, FingerprintAlgorithm};
use docprune::{CleanupConfig, CleanupSummary, DocumentPaths, Orchestrator, Reporter};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Parser, Debug)]
#[command(
    name = "docprune",
    version,
    about = "Remove repeated images from converted documents"
)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a document, then remove repeated images
    Convert {
        /// Input document
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
        /// Output directory (default: current directory)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Starting page number
        #[arg(long, default_value_t = 1)]
        start_page: u32,
        /// Ending page number
        #[arg(long)]
        end_page: Option<u32>,
        /// Leave repeated images and their links in place
        #[arg(long)]
        keep_repeated: bool,
        /// Only show what would be removed
        #[arg(long)]
        dry_run: bool,
        #[command(flatten)]
        cleanup: CleanupArgs,
    },

    /// Remove repeated images from an already converted document
    Clean {
        /// Original input document, or just its stem when the document
        /// is no longer on disk
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
        /// Directory holding `<stem>.md` and `<stem>_artifacts/`
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Only show what would be removed
        #[arg(long)]
        dry_run: bool,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        cleanup: CleanupArgs,
    },

    /// List repeated image groups without changing anything
    Scan {
        /// Original input document, or just its stem when the document
        /// is no longer on disk
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
        /// Directory holding `<stem>_artifacts/`
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Print the groups as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        cleanup: CleanupArgs,
    },
}

#[derive(Args, Debug)]
struct CleanupArgs {
    /// Hamming distance below which two images count as the same
    #[arg(long, value_name = "BITS")]
    threshold: Option<u32>,
    /// Perceptual hash algorithm
    #[arg(long, value_enum)]
    algorithm: Option<AlgorithmArg>,
    /// Keep deleting when a single file cannot be removed
    #[arg(long)]
    isolate_failures: bool,
    /// Fingerprint images on a single thread
    #[arg(long)]
    sequential: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AlgorithmArg {
    Phash,
    Mean,
    Gradient,
    VertGradient,
    DoubleGradient,
    Blockhash,
}

impl From<AlgorithmArg> for FingerprintAlgorithm {
    fn from(v: AlgorithmArg) -> Self {
        match v {
            AlgorithmArg::Phash => FingerprintAlgorithm::PHash,
            AlgorithmArg::Mean => FingerprintAlgorithm::Mean,
            AlgorithmArg::Gradient => FingerprintAlgorithm::Gradient,
            AlgorithmArg::VertGradient => FingerprintAlgorithm::VertGradient,
            AlgorithmArg::DoubleGradient => FingerprintAlgorithm::DoubleGradient,
            AlgorithmArg::Blockhash => FingerprintAlgorithm::Blockhash,
        }
    }
}

impl CleanupArgs {
    fn apply(&self, mut config: CleanupConfig, dry_run: bool) -> CleanupConfig {
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(algorithm) = self.algorithm {
            config.algorithm = algorithm.into();
        }
        if self.isolate_failures {
            config.isolate_delete_failures = true;
        }
        if self.sequential {
            config.parallel = false;
        }
        config.dry_run = dry_run;
        config
    }
}

/// Routes pipeline events to `log` and draws fingerprinting progress.
struct ConsoleReporter {
    bar: Mutex<Option<ProgressBar>>,
    show_progress: bool,
}

impl ConsoleReporter {
    fn new(show_progress: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            show_progress,
        }
    }

    fn emit(&self, f: impl FnOnce()) {
        match self.bar.lock().ok().as_deref().and_then(Option::as_ref) {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }
}

impl Reporter for ConsoleReporter {
    fn debug(&self, message: &str) {
        self.emit(|| log::debug!("{message}"));
    }

    fn info(&self, message: &str) {
        self.emit(|| log::info!("{message}"));
    }

    fn warn(&self, message: &str) {
        self.emit(|| log::warn!("⚠️  {message}"));
    }

    fn error(&self, message: &str) {
        self.emit(|| log::error!("{message}"));
    }

    fn progress_start(&self, label: &str, total: usize) {
        if !self.show_progress {
            return;
        }
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template("{spinner:.green} {msg} [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_message(label.to_string());
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn progress_advance(&self) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.inc(1);
            }
        }
    }

    fn progress_finish(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
    log::debug!("Parsed arguments: {:?}", cli);

    let file_config = FileConfig::load_default().context("Failed to load config")?;
    let show_progress = std::io::stderr().is_terminal();

    match cli.command {
        Commands::Convert {
            input,
            output,
            start_page,
            end_page,
            keep_repeated,
            dry_run,
            cleanup,
        } => {
            let output = resolve_output(output)?;
            let reporter: Arc<dyn Reporter> = Arc::new(ConsoleReporter::new(show_progress));
            let converter = CommandConverter::new(file_config.converter.clone(), reporter.as_ref());
            let pages = PageRange {
                start: start_page,
                end: end_page,
            };

            println!("▶ Converting {}", input.display());
            let paths = converter
                .convert(&input, &output, pages, &file_config.conversion)
                .with_context(|| format!("Failed to convert {}", input.display()))?;
            println!("✅ Wrote {}", paths.document.display());

            if keep_repeated {
                return Ok(());
            }

            let config = cleanup.apply(file_config.cleanup.clone(), dry_run);
            let mut orchestrator = Orchestrator::new(config, reporter);
            let summary = orchestrator
                .run(&paths)
                .with_context(|| format!("Failed to clean {}", paths.document.display()))?;
            print_summary(&summary);
        }

        Commands::Clean {
            input,
            output,
            dry_run,
            yes,
            json,
            cleanup,
        } => {
            let paths = document_paths(output, &input)?;
            let config = cleanup.apply(file_config.cleanup.clone(), dry_run);
            let reporter: Arc<dyn Reporter> =
                Arc::new(ConsoleReporter::new(show_progress && !json));
            let mut orchestrator = Orchestrator::new(config, reporter);

            let summary = if dry_run {
                orchestrator
                    .run(&paths)
                    .with_context(|| format!("Failed to clean {}", paths.document.display()))?
            } else {
                let plan = orchestrator
                    .plan(&paths)
                    .with_context(|| format!("Failed to clean {}", paths.document.display()))?;

                if plan.has_changes() && !yes && std::io::stdin().is_terminal() {
                    let groups: Vec<Cluster> = plan.repeated().cloned().collect();
                    if json {
                        write_groups(&mut std::io::stderr().lock(), &groups)?;
                    } else {
                        write_groups(&mut std::io::stdout().lock(), &groups)?;
                    }
                    let proceed = Confirm::new()
                        .with_prompt(format!(
                            "Delete {} file(s) and update {}?",
                            plan.removal.paths.len(),
                            paths.document.display()
                        ))
                        .default(false)
                        .interact()?;
                    if !proceed {
                        eprintln!("Aborted; nothing was changed.");
                        return Ok(());
                    }
                }

                orchestrator
                    .apply(plan)
                    .with_context(|| format!("Failed to clean {}", paths.document.display()))?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }

        Commands::Scan {
            input,
            output,
            json,
            cleanup,
        } => {
            let paths = document_paths(output, &input)?;
            let config = cleanup.apply(file_config.cleanup.clone(), true);
            let reporter: Arc<dyn Reporter> =
                Arc::new(ConsoleReporter::new(show_progress && !json));
            let mut orchestrator = Orchestrator::new(config, reporter);

            let clusters = orchestrator
                .scan(&paths.artifacts)
                .with_context(|| format!("Failed to scan {}", paths.artifacts.display()))?;
            let repeated: Vec<Cluster> = clusters.into_iter().filter(Cluster::is_repeated).collect();
            write_scan(&mut std::io::stdout().lock(), &paths.artifacts, &repeated, json)?;
        }
    }

    Ok(())
}

fn resolve_output(output: Option<PathBuf>) -> Result<PathBuf> {
    match output {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("Failed to read current directory"),
    }
}

fn document_paths(output: Option<PathBuf>, input: &Path) -> Result<DocumentPaths> {
    let output = resolve_output(output)?;
    DocumentPaths::for_input(&output, input)
        .with_context(|| format!("Cannot derive a document name from {}", input.display()))
}

/// Scan results on `out`. With `json` nothing but the JSON array is written.
fn write_scan(
    out: &mut impl Write,
    artifacts: &Path,
    repeated: &[Cluster],
    json: bool,
) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, repeated)?;
        writeln!(out)?;
    } else {
        writeln!(out, "▶ Scanned for repeated images in: {}", artifacts.display())?;
        write_groups(out, repeated)?;
    }
    Ok(())
}

fn write_groups(out: &mut impl Write, groups: &[Cluster]) -> std::io::Result<()> {
    if groups.is_empty() {
        return writeln!(out, "No repeated images found.");
    }
    writeln!(out, "Found {} repeated group(s):", groups.len())?;
    for (i, group) in groups.iter().enumerate() {
        writeln!(out, " Group {}:", i + 1)?;
        for member in group.members() {
            writeln!(out, "   ▶ {} [{}]", member.path().display(), member.fingerprint())?;
        }
    }
    Ok(())
}

fn print_summary(summary: &CleanupSummary) {
    println!(
        "\n✨ {} image(s), {} group(s), {} repeated",
        summary.artifact_count,
        summary.cluster_count,
        summary.repeated_groups.len()
    );
    if summary.dry_run {
        for path in summary.repeated_groups.iter().flatten() {
            println!("   🗑️  [dry-run] DELETE {}", path.display());
        }
        println!(
            "   ✂️  [dry-run] {} link(s) would be removed from {}",
            summary.links_removed,
            summary.document.display()
        );
        println!("\n⚠️  Dry-run only; no files were changed.");
        return;
    }

    for path in &summary.deleted {
        println!("   🗑️  Deleted {}", path.display());
    }
    for failure in &summary.failures {
        eprintln!("   ⚠️  Could not delete {}: {}", failure.path.display(), failure.error);
    }
    println!(
        "\n✅ Removed {} link(s) from {}",
        summary.links_removed,
        summary.document.display()
    );
}
