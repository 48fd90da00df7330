//! CLI binary for spool-flatten.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `FlattenConfig`, reports progress and turns the failure class into the
//! process exit status.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use spool_flatten::{
    flatten_to_file, FlattenConfig, FlattenError, FlattenProgressCallback, FlattenStats,
    GrayscaleWeights, ProgressCallback, RasterCodec, DEFAULT_DPI, DEFAULT_JPEG_QUALITY,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
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

/// Terminal progress: a spinner while the document opens, then a page bar.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the page currently being flattened.
    page_started: Mutex<Option<Instant>>,
    verbose: bool,
}

impl CliProgressCallback {
    fn new(verbose: bool) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
            verbose,
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Flattening");
        self.bar.reset_eta();
    }
}

impl FlattenProgressCallback for CliProgressCallback {
    fn on_flatten_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_flattened(&self, page_num: usize, total: usize, encoded_bytes: usize) {
        if self.verbose {
            let elapsed_ms = self
                .page_started
                .lock()
                .ok()
                .and_then(|mut s| s.take())
                .map(|t| t.elapsed().as_millis())
                .unwrap_or(0);
            self.bar.println(format!(
                "  {} Page {:>3}/{:<3}  {:<12}  {}",
                green("✓"),
                page_num,
                total,
                dim(&format_bytes(encoded_bytes as u64)),
                dim(&format!("{:.2}s", elapsed_ms as f64 / 1000.0)),
            ));
        }
        self.bar.inc(1);
    }

    fn on_flatten_complete(&self, _total_pages: usize, _output_bytes: u64) {
        self.bar.finish_and_clear();
    }
}

impl CliProgressCallback {
    /// Remove the bar after a failed run so the error line stands alone.
    fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Flatten with the defaults (100 DPI, lossless)
  spoolflat -i invoice.pdf -o invoice-print.pdf

  # Sharper text for small fonts
  spoolflat -i datasheet.pdf -o datasheet-print.pdf --dpi 200

  # Smaller files for photo-heavy documents
  spoolflat -i brochure.pdf -o brochure-print.pdf --codec jpeg --jpeg-quality 70

  # Machine-readable report on stdout
  spoolflat -i report.pdf -o report-print.pdf --json --no-progress

EXIT STATUS:
  0  success
  1  setup error (invalid option value, pdfium library not found)
  2  usage error
  3  LoadError    input missing, unreadable, not a PDF, encrypted or empty
  4  RenderError  a page could not be rasterised
  5  WriteError   output could not be encoded or written

  On any non-zero status the output path is left exactly as it was.

PDFIUM:
  The pdfium shared library is searched next to the executable (and in its
  libs/ subdirectory), then in the working directory, then system-wide.
  Override with --pdfium-lib. Pre-built binaries:
  https://github.com/bblanchon/pdfium-binaries/releases

LOGGING:
  RUST_LOG overrides the log filter, e.g. RUST_LOG=spool_flatten=debug
"#;

/// Flatten a PDF into an image-only grayscale PDF.
#[derive(Parser, Debug)]
#[command(
    name = "spoolflat",
    version,
    about = "Flatten a PDF into an image-only grayscale PDF for printer spoolers",
    long_about = "Rasterise every page of a PDF at a fixed resolution, convert it to \
luminance-weighted grayscale and write a new PDF with one full-page image per page. \
Page count, order and aspect ratio are preserved.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source PDF.
    #[arg(short, long, value_name = "PATH")]
    input: PathBuf,

    /// Destination PDF. Replaced atomically on success, untouched on failure.
    #[arg(short, long, value_name = "PATH")]
    output: PathBuf,

    /// Rasterisation DPI (36–600).
    #[arg(long, default_value_t = DEFAULT_DPI,
          value_parser = clap::value_parser!(u32).range(36..=600))]
    dpi: u32,

    /// Page image codec.
    #[arg(long, value_enum, default_value = "flate")]
    codec: CodecArg,

    /// JPEG quality (1–100); only used with --codec jpeg.
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Luminance weights for the gray conversion.
    #[arg(long, value_enum, default_value = "rec601")]
    grayscale: GrayscaleArg,

    /// PDF user password for encrypted documents.
    #[arg(long)]
    password: Option<String>,

    /// Explicit path to the pdfium shared library.
    #[arg(long, value_name = "PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs and per-page lines.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CodecArg {
    /// Lossless deflate (FlateDecode).
    Flate,
    /// Lossy baseline JPEG (DCTDecode).
    Jpeg,
}

impl From<CodecArg> for RasterCodec {
    fn from(v: CodecArg) -> Self {
        match v {
            CodecArg::Flate => RasterCodec::Flate,
            CodecArg::Jpeg => RasterCodec::Jpeg,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum GrayscaleArg {
    /// ITU-R BT.601 weights.
    Rec601,
    /// ITU-R BT.709 weights.
    Rec709,
}

impl From<GrayscaleArg> for GrayscaleWeights {
    fn from(v: GrayscaleArg) -> Self {
        match v {
            GrayscaleArg::Rec601 => GrayscaleWeights::Rec601,
            GrayscaleArg::Rec709 => GrayscaleWeights::Rec709,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level logs unless verbose is set.
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

    match run(&cli, show_progress) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let (code, label) = match err.downcast_ref::<FlattenError>() {
                Some(fe) => {
                    let label = match fe.page() {
                        Some(page) => format!("{} (page {page})", fe.kind()),
                        None => fe.kind().to_string(),
                    };
                    (fe.kind().exit_code(), label)
                }
                None => (1, "error".to_string()),
            };
            eprintln!("{} {}: {}", red("✘"), bold(&label), err);
            ExitCode::from(code)
        }
    }
}

fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    let progress = show_progress.then(|| CliProgressCallback::new(cli.verbose));
    let progress_cb: Option<ProgressCallback> = progress
        .clone()
        .map(|cb| cb as Arc<dyn FlattenProgressCallback>);

    let config = build_config(cli, progress_cb)?;
    let stats = match flatten_to_file(&cli.input, &cli.output, &config) {
        Ok(stats) => stats,
        Err(e) => {
            if let Some(ref cb) = progress {
                cb.abandon();
            }
            return Err(e.into());
        }
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&stats).context("Failed to serialise report")?;
        println!("{json}");
    }
    if !cli.quiet {
        print_summary(cli, &stats);
    }
    Ok(())
}

/// Map CLI args to `FlattenConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<FlattenConfig> {
    let mut builder = FlattenConfig::builder()
        .dpi(cli.dpi)
        .codec(cli.codec.into())
        .jpeg_quality(cli.jpeg_quality)
        .grayscale(cli.grayscale.into());

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    // Keep the FlattenError so main can pick the exit status.
    Ok(builder.build()?)
}

fn print_summary(cli: &Cli, stats: &FlattenStats) {
    eprintln!(
        "{}  {} pages  {} DPI {}  {}ms  →  {}",
        green("✔"),
        stats.page_count,
        stats.dpi,
        stats.codec,
        stats.total_duration_ms,
        bold(&cli.output.display().to_string()),
    );
    let ratio = stats
        .size_ratio_percent()
        .map(|r| format!("{r:.1}% of original"))
        .unwrap_or_else(|| "n/a".to_string());
    eprintln!(
        "   {} → {}  {}",
        dim(&format_bytes(stats.input_bytes)),
        dim(&format_bytes(stats.output_bytes)),
        cyan(&ratio),
    );
}

fn format_bytes(n: u64) -> String {
    const KIB: f64 = 1024.0;
    let f = n as f64;
    if f >= KIB * KIB {
        format!("{:.1} MiB", f / (KIB * KIB))
    } else if f >= KIB {
        format!("{:.1} KiB", f / KIB)
    } else {
        format!("{n} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_library() {
        let cli = Cli::try_parse_from(["spoolflat", "-i", "in.pdf", "-o", "out.pdf"]).unwrap();
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.dpi, DEFAULT_DPI);
        assert_eq!(config.codec, RasterCodec::Flate);
        assert_eq!(config.grayscale, GrayscaleWeights::Rec601);
    }

    #[test]
    fn out_of_range_dpi_is_usage_error() {
        let err = Cli::try_parse_from(["spoolflat", "-i", "a.pdf", "-o", "b.pdf", "--dpi", "20"])
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn missing_output_flag_is_usage_error() {
        assert!(Cli::try_parse_from(["spoolflat", "-i", "a.pdf"]).is_err());
    }

    #[test]
    fn failed_run_clears_half_drawn_bar() {
        let cb = CliProgressCallback::new(false);
        cb.on_flatten_start(3);
        cb.on_page_start(1, 3);
        cb.on_page_flattened(1, 3, 1024);
        cb.on_page_start(2, 3);
        assert!(!cb.bar.is_finished());

        cb.abandon();
        assert!(cb.bar.is_finished());
        assert_eq!(cb.bar.position(), 1);
    }

    #[test]
    fn bytes_are_human_readable() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }
}
