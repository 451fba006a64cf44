//! CLI binary for msgtrigger.
//!
//! A thin shim over the library crate: reads send-message job payloads,
//! maps CLI flags to `PipelineConfig` and prints one summary per job.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use msgtrigger::{
    DispatchProgressCallback, DispatchResult, DryRunDelivery, MessageTrigger, PipelineConfig,
    ProgressCallback,
};
use serde_json::{json, Value};
use std::io::{self, Read};
use std::path::PathBuf;
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner plus one log line per URL.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Job");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl DispatchProgressCallback for CliProgressCallback {
    fn on_job_start(&self, url_count: usize) {
        self.bar.set_message(format!("{url_count} URL(s) found"));
    }

    fn on_url_start(&self, index: usize, total: usize, url: &str) {
        self.bar.set_message(format!("{index}/{total} {url}"));
    }

    fn on_url_complete(&self, index: usize, total: usize, url: &str, payload_len: usize) {
        self.bar.println(format!(
            "  {} URL {:>2}/{:<2}  {}  {}",
            green("✓"),
            index,
            total,
            url,
            dim(&format!("{payload_len} bytes base64")),
        ));
    }

    fn on_url_error(&self, index: usize, total: usize, url: &str, error: &str) {
        // Keep error lines to one terminal row.
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} URL {:>2}/{:<2}  {}  {}",
            red("✗"),
            index,
            total,
            url,
            red(&msg),
        ));
    }

    fn on_dispatch(&self, mode: &str, media_count: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} dispatching {} ({} attachment(s))",
            cyan("◆"),
            bold(mode),
            media_count
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run one job from a file
  msgtrigger --job job.json

  # Job from stdin, JSON summary on stdout
  echo '{"gerar_pdf":"sim","mensagem":"confira www.site.com","numero":"5511999999999","token":"t","key":"inst"}' \
    | msgtrigger --job - --json

  # Many jobs, one JSON object per line
  msgtrigger --job jobs.jsonl --jsonl

  # Inline job, nothing actually sent
  msgtrigger --mensagem "veja https://example.com" --numero 5511999999999 \
    --token t --key inst --pdf --dry-run

JOB PAYLOAD:
  {
    "gerar_pdf": "sim" | "nao",   render URLs to PDF and attach them
    "mensagem":  "...",           message text (URLs are detected here)
    "numero":    "...",           recipient
    "token":     "...",           delivery API token
    "key":       "..."            chat instance
  }

ENVIRONMENT VARIABLES:
  MSGTRIGGER_API_URL        Chat-delivery API base URL
  MSGTRIGGER_CHROME_PATH    Chrome/Chromium executable
  RUST_LOG                  Overrides the log filter
"#;

/// Run send-message jobs: detect URLs, fetch or render them, deliver the message.
#[derive(Parser, Debug)]
#[command(
    name = "msgtrigger",
    version,
    about = "Run send-message jobs: detect URLs, fetch or render them to PDF, deliver the message",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Job payload file (JSON), or `-` for stdin.
    #[arg(long, conflicts_with = "numero")]
    job: Option<PathBuf>,

    /// Treat the job input as JSON Lines: one independent job per line.
    #[arg(long, requires = "job")]
    jsonl: bool,

    /// Inline job: message text.
    #[arg(long, default_value = "")]
    mensagem: String,

    /// Inline job: recipient.
    #[arg(long, requires_all = ["token", "key"])]
    numero: Option<String>,

    /// Inline job: delivery token.
    #[arg(long, env = "MSGTRIGGER_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Inline job: chat instance key.
    #[arg(long, env = "MSGTRIGGER_KEY")]
    key: Option<String>,

    /// Inline job: render URLs to PDF and attach them (gerar_pdf = "sim").
    #[arg(long)]
    pdf: bool,

    /// Chat-delivery API base URL.
    #[arg(long, env = "MSGTRIGGER_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Path of the text-only send endpoint.
    #[arg(long, env = "MSGTRIGGER_TEXT_PATH", default_value = "send-message")]
    text_path: String,

    /// Path of the text+media send endpoint.
    #[arg(long, env = "MSGTRIGGER_MEDIA_PATH", default_value = "send-message-media")]
    media_path: String,

    /// Timeout for the delivery call, in seconds.
    #[arg(long, env = "MSGTRIGGER_DELIVERY_TIMEOUT", default_value_t = 60)]
    delivery_timeout: u64,

    /// Timeout for raw URL fetches, in seconds (unbounded if unset).
    #[arg(long, env = "MSGTRIGGER_FETCH_TIMEOUT")]
    fetch_timeout: Option<u64>,

    /// Page navigation timeout when rendering to PDF, in seconds.
    #[arg(long, env = "MSGTRIGGER_NAVIGATION_TIMEOUT", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..))]
    navigation_timeout: u64,

    /// Network-idle settle window, in milliseconds.
    #[arg(long, env = "MSGTRIGGER_IDLE_SETTLE_MS", default_value_t = 500)]
    idle_settle_ms: u64,

    /// Network counts as idle with at most this many requests in flight.
    #[arg(long, env = "MSGTRIGGER_IDLE_MAX_INFLIGHT", default_value_t = 2)]
    idle_max_inflight: usize,

    /// PDF margin on every side, in CSS pixels.
    #[arg(long, env = "MSGTRIGGER_PDF_MARGIN_PX", default_value_t = 20)]
    pdf_margin_px: u32,

    /// Do not print background colours and images.
    #[arg(long)]
    no_background: bool,

    /// Chrome/Chromium executable.
    #[arg(long, env = "MSGTRIGGER_CHROME_PATH")]
    chrome_path: Option<String>,

    /// Show the browser window while rendering.
    #[arg(long)]
    headed: bool,

    /// User agent for fetches and the browser.
    #[arg(long, env = "MSGTRIGGER_USER_AGENT")]
    user_agent: Option<String>,

    /// URLs materialized at once within a job.
    #[arg(short, long, env = "MSGTRIGGER_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Log what would be sent instead of calling the delivery API.
    #[arg(long)]
    dry_run: bool,

    /// Print each DispatchResult as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MSGTRIGGER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already reports per-URL progress; keep library logs at
    // error level while it is on.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.jsonl;
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

    // ── Build config and trigger ─────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn DispatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    let mut trigger = MessageTrigger::new(config).context("Failed to initialise pipeline")?;
    if cli.dry_run {
        trigger = trigger.with_delivery(Arc::new(DryRunDelivery));
    }

    // ── Run jobs ─────────────────────────────────────────────────────────
    let jobs = load_jobs(&cli)?;
    let total = jobs.len();
    let mut failed = 0usize;

    for (line, job) in jobs.into_iter().enumerate() {
        let outcome = match job {
            Ok(payload) => trigger.run_payload(&payload).await.map_err(anyhow::Error::from),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(result) => report_success(&cli, &result)?,
            Err(e) => {
                failed += 1;
                if cli.jsonl {
                    eprintln!("{} job {}: {:#}", red("✘"), line + 1, e);
                } else {
                    return Err(e.context("Job failed"));
                }
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed}/{total} jobs failed");
    }
    Ok(())
}

fn report_success(cli: &Cli, result: &DispatchResult) -> Result<()> {
    if cli.json || cli.jsonl {
        let json = if cli.jsonl {
            serde_json::to_string(result)
        } else {
            serde_json::to_string_pretty(result)
        }
        .context("Failed to serialise result")?;
        println!("{json}");
        return Ok(());
    }

    if cli.quiet {
        return Ok(());
    }

    let s = &result.stats;
    eprintln!(
        "{}  {} → {}  {}/{} URL(s)  {}ms",
        if s.urls_failed == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        bold(result.mode.label()),
        result.recipient,
        s.urls_materialized,
        s.urls_found,
        s.total_duration_ms,
    );
    for failure in &result.failures {
        if let Some(e) = failure.error() {
            eprintln!("   {} {}", dim(&failure.original_url), red(&e.to_string()));
        }
    }
    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .concurrency(cli.concurrency)
        .fetch_timeout_secs(cli.fetch_timeout)
        .navigation_timeout_secs(cli.navigation_timeout)
        .idle_settle_ms(cli.idle_settle_ms)
        .idle_max_inflight(cli.idle_max_inflight)
        .pdf_margin_px(cli.pdf_margin_px)
        .print_background(!cli.no_background)
        .headless(!cli.headed)
        .api_base_url(&cli.api_url)
        .text_path(&cli.text_path)
        .media_path(&cli.media_path)
        .delivery_timeout_secs(cli.delivery_timeout);

    if let Some(ref path) = cli.chrome_path {
        builder = builder.chrome_path(path);
    }
    if let Some(ref ua) = cli.user_agent {
        builder = builder.user_agent(ua);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Collect job payloads from `--job` or the inline flags.
///
/// In JSON Lines mode a malformed line becomes an `Err` entry so the other
/// lines still run.
fn load_jobs(cli: &Cli) -> Result<Vec<Result<Value>>> {
    let Some(ref path) = cli.job else {
        return Ok(vec![Ok(inline_job(cli))]);
    };

    let input = read_input(path)?;

    if cli.jsonl {
        return Ok(input
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).context("Malformed JSON line"))
            .collect());
    }

    let payload = serde_json::from_str(&input)
        .with_context(|| format!("Failed to parse job payload from {}", path.display()))?;
    Ok(vec![Ok(payload)])
}

fn inline_job(cli: &Cli) -> Value {
    json!({
        "gerar_pdf": if cli.pdf { "sim" } else { "nao" },
        "mensagem": cli.mensagem,
        "numero": cli.numero,
        "token": cli.token,
        "key": cli.key,
    })
}

fn read_input(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read job from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["msgtrigger"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn inline_job_maps_pdf_flag() {
        let cli = parse(&[
            "--mensagem", "veja www.a.com", "--numero", "55", "--token", "t", "--key", "k", "--pdf",
        ]);
        let job = inline_job(&cli);
        assert_eq!(job["gerar_pdf"], "sim");
        assert_eq!(job["numero"], "55");
        assert_eq!(job["mensagem"], "veja www.a.com");
    }

    #[test]
    fn config_from_flags() {
        let cli = parse(&[
            "--job", "-", "--navigation-timeout", "10", "--concurrency", "3", "--fetch-timeout", "5",
        ]);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.navigation_timeout_secs, 10);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.fetch_timeout_secs, Some(5));
    }

    #[test]
    fn jsonl_requires_job() {
        assert!(Cli::try_parse_from(["msgtrigger", "--jsonl"]).is_err());
    }

    #[test]
    fn zero_navigation_timeout_rejected() {
        assert!(Cli::try_parse_from(["msgtrigger", "--job", "-", "--navigation-timeout", "0"]).is_err());
    }
}
