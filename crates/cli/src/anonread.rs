//! anonread - Recover anonymized spans and page text from scanned pages
//!
//! Reads rasterized page images in reading order, finds the spans hidden by
//! underlines or solid boxes, and writes the reconstructed document as plain
//! text or JSON.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use anonread_core::{
    AnonymizationMethod, DocumentResult, OcrEngine, Page, Reader, ReaderError, ReaderParams,
    TimeoutOcr,
};
use anyhow::{Context, bail};
use clap::{ArgAction, Parser, ValueEnum};
use image::GrayImage;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Output type for the reconstructed document.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
enum OutputType {
    /// Document text only (default)
    #[default]
    Text,
    /// Full processing record
    Json,
}

/// How the document was anonymized.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum MethodArg {
    /// No redactions; text is passed through from --text
    None,
    /// Lines drawn beneath the hidden spans
    Underline,
    /// Solid boxes drawn over the hidden spans
    Box,
    /// Guess from the pages
    Auto,
}

impl MethodArg {
    fn fixed(self) -> Option<AnonymizationMethod> {
        match self {
            MethodArg::None => Some(AnonymizationMethod::None),
            MethodArg::Underline => Some(AnonymizationMethod::Underline),
            MethodArg::Box => Some(AnonymizationMethod::Box),
            MethodArg::Auto => None,
        }
    }
}

/// Recover anonymized spans and page text from scanned legal documents.
#[derive(Parser, Debug)]
#[command(name = "anonread")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Page images in reading order
    #[arg(required = true)]
    pages: Vec<PathBuf>,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Anonymization method of the document
    #[arg(short = 'm', long, value_enum, default_value = "auto")]
    method: MethodArg,

    /// TOML file overriding the default parameters
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    // === OCR options ===
    /// External OCR program, invoked as `<program> <image> stdout [ARGS]`
    #[arg(long = "ocr-cmd", default_value = "tesseract")]
    ocr_cmd: String,

    /// Extra argument passed to the OCR program (repeatable)
    #[arg(long = "ocr-arg", allow_hyphen_values = true)]
    ocr_args: Vec<String>,

    /// Abandon an OCR call after this many milliseconds
    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// Number of pages read in parallel (defaults to the CPU count)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Extracted text used as is when the document has no redactions
    #[arg(long)]
    text: Option<PathBuf>,

    // === Output options ===
    /// Path to file where output is written, or "-" for stdout
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,

    /// Type of output to generate
    #[arg(short = 't', long = "output-type", value_enum, default_value = "text")]
    output_type: OutputType,
}

/// Runs an external OCR program on a temporary PNG of each crop.
#[derive(Debug, Clone)]
struct CommandOcr {
    program: String,
    args: Vec<String>,
}

impl CommandOcr {
    fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn command(&self, image: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.arg(image).arg("stdout").args(&self.args);
        command
    }
}

impl OcrEngine for CommandOcr {
    fn recognize(&self, crop: &GrayImage) -> anonread_core::Result<String> {
        let file = tempfile::Builder::new()
            .prefix("anonread-")
            .suffix(".png")
            .tempfile()?;
        crop.save(file.path())?;

        let output = self
            .command(file.path())
            .output()
            .map_err(|e| ReaderError::Ocr(format!("cannot run {}: {e}", self.program)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReaderError::Ocr(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_engine(args: &Args) -> Box<dyn OcrEngine> {
    let engine = CommandOcr::new(&args.ocr_cmd, args.ocr_args.clone());
    match args.timeout_ms {
        Some(ms) => Box::new(TimeoutOcr::new(engine, Duration::from_millis(ms))),
        None => Box::new(engine),
    }
}

fn load_params(config: Option<&Path>) -> anyhow::Result<ReaderParams> {
    match config {
        Some(path) => ReaderParams::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(ReaderParams::default()),
    }
}

fn load_pages(paths: &[PathBuf]) -> anyhow::Result<Vec<Page>> {
    paths
        .iter()
        .enumerate()
        .map(|(index, path)| {
            Page::open(index, path)
                .with_context(|| format!("failed to open page image {}", path.display()))
        })
        .collect()
}

fn passthrough(text: Option<&Path>, page_count: usize) -> anyhow::Result<DocumentResult> {
    let Some(path) = text else {
        bail!("document has no redactions; pass its extracted text with --text");
    };
    let start = Instant::now();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read text {}", path.display()))?;
    Ok(DocumentResult::passthrough(
        text,
        page_count,
        start.elapsed().as_millis() as u64,
    ))
}

fn process(args: &Args) -> anyhow::Result<DocumentResult> {
    let params = load_params(args.config.as_deref())?;
    let pages = load_pages(&args.pages)?;

    let mut reader = Reader::new(build_engine(args), params).context("invalid parameters")?;
    if let Some(threads) = args.threads {
        reader = reader.with_threads(threads);
    }

    let method = match args.method.fixed() {
        Some(method) => method,
        None => reader.detect_method(&pages),
    };
    info!(%method, pages = pages.len(), "reading document");

    if method == AnonymizationMethod::None {
        return passthrough(args.text.as_deref(), pages.len());
    }
    reader
        .read_document(&pages, method)
        .context("failed to read document")
}

fn write_output<W: Write>(
    writer: &mut W,
    result: &DocumentResult,
    output_type: OutputType,
) -> anyhow::Result<()> {
    match output_type {
        OutputType::Text => writeln!(writer, "{}", result.text)?,
        OutputType::Json => {
            serde_json::to_writer_pretty(&mut *writer, result)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let result = process(&args)?;
    debug!(
        spans = result.info.anonymized_spans,
        tables = result.info.tables,
        elapsed_ms = result.info.elapsed_ms,
        "document read"
    );

    if args.outfile == "-" {
        let stdout = io::stdout();
        let mut writer = BufWriter::new(stdout.lock());
        write_output(&mut writer, &result, args.output_type)
    } else {
        let file = File::create(&args.outfile)
            .with_context(|| format!("failed to create {}", args.outfile))?;
        let mut writer = BufWriter::new(file);
        write_output(&mut writer, &result, args.output_type)
    }
}
