//! CLI binary for documinter.
//!
//! A thin shim over the library crate: one session, driven from upload
//! through processing to export, with CLI flags mapped onto `EngineConfig`
//! and an options patch.

use anyhow::{Context, Result};
use clap::Parser;
use documinter::config::DEFAULT_ENGINE_URL;
use documinter::{
    ArtifactEditor, CandidateFile, Completion, EngineConfig, ExtractionEngine, ExtractionMode,
    HttpEngine, IngestionController, Lifecycle, Operation, Osc52Clipboard, OptionsPatch, PageBound,
    ProcessingController, SessionHandle, SessionObserver, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: one spinner whose message follows the session lifecycle.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Session");
        bar.set_message("starting…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl SessionObserver for CliObserver {
    fn on_transition(&self, _from: Lifecycle, to: Lifecycle, operation: Operation) {
        match (operation, to) {
            (Operation::BeginUpload, _) => {
                self.bar.set_prefix("Uploading");
                self.bar.set_message("sending document to the engine…");
            }
            (Operation::CompleteUpload, _) => {
                self.bar.println(format!("  {} document ready", green("✓")));
                self.bar.set_prefix("Ready");
                self.bar.set_message("");
            }
            (Operation::BeginProcess, _) => {
                self.bar.set_prefix("Extracting");
                self.bar.set_message("waiting for the engine…");
            }
            (Operation::CompleteProcess, _) => {
                self.bar.println(format!("  {} extraction complete", green("✓")));
                self.bar.set_prefix("Completed");
                self.bar.set_message("");
            }
            (Operation::Reset, _) => {
                self.bar.set_prefix("Reset");
                self.bar.set_message("");
            }
            (_, to) => self.bar.set_message(to.to_string()),
        }
    }

    fn on_error(&self, stage: Stage, message: &str) {
        let msg = if message.chars().count() > 80 {
            let cut: String = message.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            message.to_string()
        };
        self.bar
            .println(format!("  {} {} failed: {}", red("✗"), stage, red(&msg)));
    }

    fn on_stale_completion(&self, stage: Stage) {
        self.bar
            .println(dim(&format!("  {stage} result arrived after reset; ignored")));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every page (Markdown to stdout)
  documinter report.pdf

  # Pages 3-10, verbatim text, written to a file
  documinter report.pdf --start-page 3 --end-page 10 --mode raw -o report.md

  # Save next to the current directory as <name>.md and copy to clipboard
  documinter report.pdf --download-dir . --copy

  # Session snapshot as JSON
  documinter --json report.pdf > session.json

  # Is the engine up?
  documinter --check-engine

ENVIRONMENT VARIABLES:
  DOCUMINTER_ENGINE_URL   Extraction engine root (default http://localhost:8002)
  RUST_LOG                Override log filter (e.g. documinter=debug)

The extraction engine must be running locally; documinter only drives it.
"#;

/// Convert a PDF to Markdown through the local extraction engine.
#[derive(Parser, Debug)]
#[command(
    name = "documinter",
    version,
    about = "Convert a PDF to Markdown through the local extraction engine",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file.
    #[arg(required_unless_present = "check_engine")]
    input: Option<PathBuf>,

    /// Write Markdown to this file instead of stdout.
    #[arg(short, long, env = "DOCUMINTER_OUTPUT")]
    output: Option<PathBuf>,

    /// Save Markdown into this directory as <document name>.md.
    #[arg(long, env = "DOCUMINTER_DOWNLOAD_DIR", conflicts_with = "output")]
    download_dir: Option<PathBuf>,

    /// Also copy the Markdown to the clipboard (OSC 52).
    #[arg(long)]
    copy: bool,

    /// Extraction engine root URL.
    #[arg(long, env = "DOCUMINTER_ENGINE_URL", default_value = DEFAULT_ENGINE_URL)]
    engine_url: String,

    /// First page to extract (1-indexed).
    #[arg(long, env = "DOCUMINTER_START_PAGE")]
    start_page: Option<u32>,

    /// Last page to extract; omit for "through the last page".
    #[arg(long, env = "DOCUMINTER_END_PAGE")]
    end_page: Option<u32>,

    /// Extraction mode.
    #[arg(long, env = "DOCUMINTER_MODE", value_enum, default_value = "clean")]
    mode: ModeArg,

    /// Largest file accepted for upload, in MiB.
    #[arg(long, env = "DOCUMINTER_MAX_UPLOAD_MB", default_value_t = 50)]
    max_upload_mb: u64,

    /// Upload timeout in seconds.
    #[arg(long, env = "DOCUMINTER_UPLOAD_TIMEOUT", default_value_t = 120)]
    upload_timeout: u64,

    /// Processing timeout in seconds.
    #[arg(long, env = "DOCUMINTER_PROCESS_TIMEOUT", default_value_t = 300)]
    process_timeout: u64,

    /// Output the final session snapshot as JSON instead of Markdown.
    #[arg(long)]
    json: bool,

    /// Only check that the engine answers, then exit.
    #[arg(long)]
    check_engine: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "DOCUMINTER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCUMINTER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCUMINTER_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ModeArg {
    Clean,
    Raw,
}

impl From<ModeArg> for ExtractionMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Clean => ExtractionMode::Clean,
            ModeArg::Raw => ExtractionMode::Raw,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already reports every transition; keep library INFO logs
    // out of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let engine = Arc::new(HttpEngine::new(config.clone()).context("Failed to create engine client")?);

    // ── Engine check mode ────────────────────────────────────────────────
    if cli.check_engine {
        let message = engine
            .health()
            .await
            .with_context(|| format!("Extraction engine at {} is not answering", config.base_url))?;
        println!("{} {}  {}", green("✔"), bold(&config.base_url), dim(&message));
        return Ok(());
    }

    let input = cli.input.clone().context("No input file given")?;

    // ── Session wiring ───────────────────────────────────────────────────
    let session = SessionHandle::default();
    let observer = if show_progress {
        let o = CliObserver::new();
        session.add_observer(o.clone());
        Some(o)
    } else {
        None
    };

    let ingest = IngestionController::new(session.clone(), engine.clone(), &config);
    let process = ProcessingController::new(session.clone(), engine.clone());
    let editor = ArtifactEditor::new(session.clone());

    let outcome = tokio::select! {
        r = drive(&cli, &input, &ingest, &process) => r,
        _ = tokio::signal::ctrl_c() => {
            session.reset();
            Err(anyhow::anyhow!("Interrupted; session discarded"))
        }
    };
    if let Some(ref o) = observer {
        o.finish();
    }
    outcome?;

    // ── Export ───────────────────────────────────────────────────────────
    if cli.json {
        let snapshot = session.snapshot();
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot).context("Failed to serialise session")?
        );
    } else if let Some(ref path) = cli.output {
        let path = editor.save_as(path).await.context("Failed to save Markdown")?;
        if !cli.quiet {
            eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    } else if let Some(ref dir) = cli.download_dir {
        let path = editor
            .download_as_file(dir)
            .await
            .context("Failed to save Markdown")?;
        if !cli.quiet {
            eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    } else {
        let text = editor.raw_text().context("No extracted text")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        if !text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if cli.copy {
        // stdout may be carrying the Markdown itself; send the escape to stderr.
        let mut clipboard = Osc52Clipboard::new(io::stderr());
        let copied = editor
            .copy_to_clipboard(&mut clipboard)
            .context("Failed to copy to clipboard")?;
        if !cli.quiet {
            eprintln!("{} copied {} bytes to clipboard", green("✔"), copied);
        }
    }

    if !cli.quiet && !cli.json {
        if let Some(view) = editor.rendered() {
            eprintln!(
                "   {} lines  /  {} words  /  {} chars",
                dim(&view.line_count().to_string()),
                dim(&view.word_count().to_string()),
                dim(&view.char_count().to_string()),
            );
        }
    }

    Ok(())
}

/// Upload, apply the requested options, run once.
async fn drive(
    cli: &Cli,
    input: &Path,
    ingest: &IngestionController,
    process: &ProcessingController,
) -> Result<()> {
    let file = CandidateFile::open(input)
        .await
        .with_context(|| format!("Failed to open {}", input.display()))?;

    if let Completion::Applied(receipt) = ingest.submit(&file).await.context("Upload failed")? {
        if !cli.quiet {
            eprintln!(
                "{} {}  {} pages",
                dim("◆"),
                bold(&receipt.filename),
                receipt.page_count
            );
        }
    }

    let patch = build_patch(cli);
    if !patch.is_empty() {
        process.configure(patch).context("Invalid page selection")?;
    }

    process.run().await.context("Extraction failed")?;
    Ok(())
}

/// Map CLI args to `EngineConfig`.
fn build_config(cli: &Cli) -> Result<EngineConfig> {
    EngineConfig::builder()
        .base_url(cli.engine_url.clone())
        .max_upload_bytes(cli.max_upload_mb.saturating_mul(1024 * 1024))
        .upload_timeout_secs(cli.upload_timeout)
        .process_timeout_secs(cli.process_timeout)
        .build()
        .context("Invalid configuration")
}

/// Map page/mode flags to an options patch; unset flags keep the upload defaults.
fn build_patch(cli: &Cli) -> OptionsPatch {
    let mut patch = OptionsPatch::new().mode(cli.mode.clone().into());
    if let Some(start) = cli.start_page {
        patch = patch.start_page(start);
    }
    if let Some(end) = cli.end_page {
        patch = patch.end_page(PageBound::Bounded(end));
    }
    patch
}
