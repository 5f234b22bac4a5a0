//! CLI binary for edgequake-pdf2kb.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ProcessingOptions` / `ClientConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2kb::config::{
    DEFAULT_API_TIMEOUT_SECS, DEFAULT_BASE_URL, DEFAULT_MAX_INPUT_TOKENS, DEFAULT_MODEL,
    DEFAULT_TAG,
};
use edgequake_pdf2kb::{
    inspect, BatchOutcome, BatchProgressCallback, BatchRunner, ClientConfig, Credential,
    DocumentProcessor, FileFailure, FormatMode, ProcessingOptions, ProgressCallback,
    SummarizationClient, TemplateVariant,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar over the files of a folder plus
/// one ✓/✗ line per file.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the file currently being processed.
    file_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_batch_start` reports the file count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning folder…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            file_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Summarising");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self) -> f64 {
        self.file_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.activate_bar(total);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Summarising {total} PDF file(s)…"))
        ));
    }

    fn on_file_start(&self, _index: usize, _total: usize, file_name: &str) {
        if let Ok(mut t) = self.file_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(file_name.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, output: &Path) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            index,
            total,
            output.display(),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
    }

    fn on_file_error(&self, index: usize, total: usize, failure: &FileFailure) {
        // Keep each line readable; the full message is in the summary.
        let first_line = failure.message.lines().next().unwrap_or_default();
        let msg: String = if first_line.chars().count() > 80 {
            format!("{}\u{2026}", first_line.chars().take(79).collect::<String>())
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            index,
            total,
            failure.file_name,
            red(&msg),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
    }

    fn on_progress(&self, completed: usize, _total: usize) {
        self.bar.set_position(completed as u64);
    }

    fn on_batch_complete(&self, _total: usize, _success_count: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise one PDF (writes report.md beside it)
  pdf2kb report.pdf

  # Summarise to a chosen file, or print to stdout
  pdf2kb report.pdf -o notes/report.md
  pdf2kb report.pdf --stdout

  # Summarise every PDF in a folder
  pdf2kb papers/

  # Descriptive phrasing with an extra instruction
  pdf2kb --mode descriptive --instruction "Focus on the methodology" paper.pdf

  # Knowledge-base notes (front matter, file info, citation)
  pdf2kb --template knowledge-base --tags ml,papers papers/

  # Use another provider through edgequake-llm
  pdf2kb --provider openai --model gpt-4.1-mini report.pdf

  # Page count and text size only (no API key needed)
  pdf2kb --inspect-only report.pdf

ENVIRONMENT VARIABLES:
  ZHIPU_API_KEY           API key for the default endpoint (also read from .env)
  PDF2KB_MODEL            Model ID (default: glm-4.6)
  PDF2KB_BASE_URL         OpenAI-compatible base URL
  PDF2KB_PROVIDER         edgequake-llm provider (openai, anthropic, gemini, ollama, …)
  PDFIUM_LIB_PATH         Path to an existing libpdfium; lopdf is used when none is found
  RUST_LOG                Override the log filter
"#;

/// Summarise PDF documents into Markdown knowledge-base notes using LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2kb",
    version,
    about = "Summarise PDF documents into Markdown knowledge-base notes using LLMs",
    long_about = "Extract the text of PDF documents, ask an LLM for a structured summary and \
10-15 key concepts, and write the result as Markdown. Works on a single file or on every PDF \
in a folder. Defaults to the Zhipu glm-4.6 model over its OpenAI-compatible API; any provider \
supported by edgequake-llm can be selected with --provider.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file or folder of PDF files.
    input: PathBuf,

    /// Write Markdown to this file (single-file input only).
    #[arg(short, long, env = "PDF2KB_OUTPUT", conflicts_with = "stdout")]
    output: Option<PathBuf>,

    /// Print Markdown to stdout instead of writing a file (single-file input only).
    #[arg(long)]
    stdout: bool,

    /// API key for the OpenAI-compatible endpoint.
    #[arg(short = 'k', long, env = "ZHIPU_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// LLM model ID.
    #[arg(long, env = "PDF2KB_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of an OpenAI-compatible API (`/chat/completions` is appended).
    #[arg(long, env = "PDF2KB_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Use a named edgequake-llm provider instead of --base-url.
    #[arg(
        long,
        env = "PDF2KB_PROVIDER",
        long_help = "Named LLM provider (openai, anthropic, gemini, ollama, …).\n\
          The provider reads its own API key from the environment; --api-key and \
          --base-url are ignored."
    )]
    provider: Option<String>,

    /// Phrasing of the summary and key concepts.
    #[arg(long, env = "PDF2KB_MODE", value_enum, default_value = "questions")]
    mode: ModeArg,

    /// Extra instruction appended to every prompt.
    #[arg(long, env = "PDF2KB_INSTRUCTION")]
    instruction: Option<String>,

    /// Markdown layout of the output.
    #[arg(long, env = "PDF2KB_TEMPLATE", value_enum, default_value = "plain")]
    template: TemplateArg,

    /// Front-matter tags for the knowledge-base template (comma-separated).
    #[arg(long, env = "PDF2KB_TAGS", value_delimiter = ',', default_value = DEFAULT_TAG)]
    tags: Vec<String>,

    /// Input budget in tokens; longer text is truncated at 4 characters per token.
    #[arg(long, env = "PDF2KB_MAX_INPUT_TOKENS", default_value_t = DEFAULT_MAX_INPUT_TOKENS)]
    max_input_tokens: usize,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "PDF2KB_API_TIMEOUT", default_value_t = DEFAULT_API_TIMEOUT_SECS)]
    api_timeout: u64,

    /// Print JSON (artifact or batch outcome) instead of human-readable output.
    #[arg(long, env = "PDF2KB_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2KB_NO_PROGRESS")]
    no_progress: bool,

    /// Print page count and text size only, no summarisation.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2KB_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2KB_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ModeArg {
    Questions,
    Descriptive,
}

impl From<ModeArg> for FormatMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Questions => FormatMode::Questions,
            ModeArg::Descriptive => FormatMode::Descriptive,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum TemplateArg {
    Plain,
    KnowledgeBase,
}

impl From<TemplateArg> for TemplateVariant {
    fn from(v: TemplateArg) -> Self {
        match v {
            TemplateArg::Plain => TemplateVariant::Plain,
            TemplateArg::KnowledgeBase => TemplateVariant::KnowledgeBase,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // A missing .env is fine; real environment variables still apply.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
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

    check_input_mode(&cli)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input, cli.max_input_tokens)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize document info")?
            );
        } else {
            println!("File:         {}", info.path.display());
            println!("Pages:        {}", info.page_count);
            println!("Characters:   {}", info.text_chars);
            println!(
                "Truncated:    {}",
                if info.would_truncate { "yes" } else { "no" }
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    // ── Build processor ──────────────────────────────────────────────────
    let processor = build_processor(&cli)?;

    if cli.input.is_dir() {
        run_folder(&cli, processor, show_progress).await
    } else {
        run_file(&cli, processor, show_progress).await?;
        Ok(ExitCode::SUCCESS)
    }
}

/// Reject flags that only make sense for a single PDF when given a folder.
fn check_input_mode(cli: &Cli) -> Result<()> {
    if !cli.input.is_dir() {
        return Ok(());
    }
    if cli.inspect_only {
        anyhow::bail!(
            "--inspect-only takes a single PDF, not a folder: {}",
            cli.input.display()
        );
    }
    if cli.output.is_some() || cli.stdout {
        anyhow::bail!("--output and --stdout only apply to a single PDF, not a folder");
    }
    Ok(())
}

/// Map CLI args to a `DocumentProcessor`.
fn build_processor(cli: &Cli) -> Result<DocumentProcessor> {
    let mut builder = ProcessingOptions::builder()
        .format_mode(cli.mode.clone().into())
        .template(cli.template.clone().into())
        .tags(cli.tags.iter().cloned());
    if let Some(ref instruction) = cli.instruction {
        builder = builder.custom_instruction(instruction.clone());
    }
    let options = builder.build().context("Invalid configuration")?;

    let client_config = ClientConfig {
        model: cli.model.clone(),
        base_url: cli.base_url.clone(),
        provider_name: cli.provider.clone(),
        api_timeout_secs: cli.api_timeout,
        max_input_tokens: cli.max_input_tokens,
    };
    let credential = Credential::new(cli.api_key.clone().unwrap_or_default());

    let client = SummarizationClient::from_config(&credential, &client_config)
        .context("Failed to configure the LLM client")?;

    Ok(DocumentProcessor::new(client, options))
}

async fn run_file(cli: &Cli, processor: DocumentProcessor, show_progress: bool) -> Result<()> {
    let start = Instant::now();
    let file_name = cli
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.input.display().to_string());

    let spinner = show_progress.then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Summarising");
        bar.set_message(file_name.clone());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    if cli.stdout {
        let artifact = processor.process(&cli.input).await;
        if let Some(ref bar) = spinner {
            bar.finish_and_clear();
        }
        let artifact = artifact.with_context(|| format!("Failed to summarise {file_name}"))?;

        if cli.json {
            let json =
                serde_json::to_string_pretty(&artifact).context("Failed to serialise output")?;
            println!("{json}");
        } else {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(artifact.markdown.as_bytes())
                .context("Failed to write to stdout")?;
        }
        return Ok(());
    }

    let result = match cli.output {
        Some(ref out) => processor.process_to_file(&cli.input, out).await,
        None => processor.process_beside(&cli.input).await,
    };
    if let Some(ref bar) = spinner {
        bar.finish_and_clear();
    }
    let written = result.with_context(|| format!("Failed to summarise {file_name}"))?;

    if cli.json {
        let json = serde_json::json!({
            "source": cli.input,
            "output": written,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {}  {}  →  {}",
            green("✔"),
            file_name,
            dim(&format!("{:.1}s", start.elapsed().as_secs_f64())),
            bold(&written.display().to_string()),
        );
    }
    Ok(())
}

async fn run_folder(cli: &Cli, processor: DocumentProcessor, show_progress: bool) -> Result<ExitCode> {
    let mut runner = BatchRunner::new(processor);
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new_dynamic();
        runner = runner.with_progress(cb);
    }

    let outcome = runner
        .run(&cli.input)
        .await
        .with_context(|| format!("Failed to process folder {}", cli.input.display()))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?
        );
    } else if !cli.quiet {
        print_summary(&outcome);
    }

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_summary(outcome: &BatchOutcome) {
    if outcome.total == 0 {
        eprintln!("{} No PDF files found", cyan("⚠"));
        return;
    }

    if outcome.is_success() {
        eprintln!(
            "{} {} file(s) summarised successfully",
            green("✔"),
            bold(&outcome.total_processed().to_string())
        );
        return;
    }

    eprintln!(
        "{} {}/{} file(s) summarised  ({} failed)",
        if outcome.total_processed() == 0 {
            red("✘")
        } else {
            cyan("⚠")
        },
        bold(&outcome.total_processed().to_string()),
        outcome.total,
        red(&outcome.total_errors().to_string()),
    );
    for failure in &outcome.failures {
        eprintln!("   {} {}", red("✗"), failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pdf2kb").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn inspect_only_on_folder_is_rejected() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().to_str().unwrap();

        let err = check_input_mode(&parse(&[folder, "--inspect-only"])).unwrap_err();
        assert!(err.to_string().contains("--inspect-only takes a single PDF"));
    }

    #[test]
    fn stdout_on_folder_is_rejected() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().to_str().unwrap();

        let err = check_input_mode(&parse(&[folder, "--stdout"])).unwrap_err();
        assert!(err.to_string().contains("only apply to a single PDF"));
    }

    #[test]
    fn single_file_flags_pass_for_a_file() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("paper.pdf");
        std::fs::write(&pdf, b"%PDF-1.7\n").unwrap();

        check_input_mode(&parse(&[pdf.to_str().unwrap(), "--inspect-only"])).unwrap();
        check_input_mode(&parse(&[pdf.to_str().unwrap(), "--stdout"])).unwrap();
    }

    #[test]
    fn folder_without_single_file_flags_passes() {
        let dir = TempDir::new().unwrap();
        check_input_mode(&parse(&[dir.path().to_str().unwrap()])).unwrap();
    }
}
