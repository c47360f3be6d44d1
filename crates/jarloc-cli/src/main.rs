//! jarloc - Edit and relocalize strings baked into compiled jars
//!
//! `scan` lists every string constant the classes of a jar load, or writes
//! them to a JSON edit sheet. `apply` writes the changed values of a sheet
//! back into the jar.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use jarloc_core::{
    filter_strings, pretty_method, rewrite, Edit, FilterConfig, FoundString, JarArchive,
    PipelineConfig, ScanEvent, ScanPipeline, ScanReport, ScannerConfig,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Edit and relocalize strings baked into compiled jars
#[derive(Parser, Debug)]
#[command(name = "jarloc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the strings of a jar, or of every jar under a directory
    Scan(ScanArgs),
    /// Write the edited values of a sheet into a jar
    Apply(ApplyArgs),
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// A .jar file or a directory to search for them
    path: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Only keep strings containing every word of this query
    #[arg(long)]
    filter: Option<String>,

    /// Keep empty and whitespace-only strings
    #[arg(long)]
    show_empty: bool,

    /// Also scan the static initializer of enum classes
    #[arg(long)]
    include_enum_initializers: bool,

    /// Classes between progress log lines
    #[arg(long, default_value = "100")]
    progress_interval: usize,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// The jar the sheet was made from
    jar: PathBuf,

    /// Edit sheet produced by `scan --format json`
    sheet: PathBuf,

    /// Output jar
    #[arg(short, long, default_value = "Translated.jar")]
    output: PathBuf,

    /// Apply even if the jar changed since the sheet was made, and
    /// overwrite an existing output file
    #[arg(long)]
    force: bool,
}

/// Output format for scan results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One line per string
    Text,
    /// Editable JSON sheet
    Json,
}

/// One jar's strings, as written by `scan` and read back by `apply`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct EditSheet {
    /// File name of the jar
    jar: String,
    /// blake3 hash of the jar's bytes
    fingerprint: String,
    strings: Vec<SheetRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SheetRecord {
    id: usize,
    entry: String,
    utf8_index: u16,
    class: String,
    method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<String>,
    original: String,
    /// Edit this field; records left equal to `original` are not applied
    value: String,
}

impl SheetRecord {
    fn from_found(found: &FoundString) -> Self {
        Self {
            id: found.id,
            entry: found.owner_entry.clone(),
            utf8_index: found.utf8_index,
            class: found.class_name.clone(),
            method: found.method_signature.clone(),
            line: found.line_number,
            context: found.context.map(|c| c.to_string()),
            original: found.value.clone(),
            value: found.value.clone(),
        }
    }
}

/// A sheet file holds one sheet, or a list of them when a directory was scanned
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SheetFile {
    One(EditSheet),
    Many(Vec<EditSheet>),
}

impl EditSheet {
    fn new(jar: &Path, fingerprint: String, strings: &[&FoundString]) -> Self {
        Self {
            jar: jar
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            fingerprint,
            strings: strings.iter().map(|s| SheetRecord::from_found(s)).collect(),
        }
    }

    /// Records whose value was changed
    fn edits(&self) -> Vec<Edit> {
        self.strings
            .iter()
            .filter(|record| record.value != record.original)
            .map(|record| Edit::new(record.entry.as_str(), record.utf8_index, record.value.as_str()))
            .collect()
    }
}

fn fingerprint(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Command::Scan(args) => run_scan(args),
        Command::Apply(args) => run_apply(args),
    }
}

/// Scan a jar or every jar under a directory
fn run_scan(args: &ScanArgs) -> Result<()> {
    if !args.path.exists() {
        bail!("Input path does not exist: {}", args.path.display());
    }

    let jars = if args.path.is_dir() {
        find_jars(&args.path)
    } else {
        vec![args.path.clone()]
    };
    if jars.is_empty() {
        warn!("No jars found under {}", args.path.display());
    }

    let mut sheets = Vec::new();
    let mut text = String::new();
    for jar in &jars {
        match scan_jar(args, jar) {
            Ok((sheet, rendered)) => {
                sheets.push(sheet);
                text.push_str(&rendered);
            }
            // A single jar failing is fatal; in a directory, log and move on
            Err(e) if args.path.is_dir() => warn!("Error processing {}: {:#}", jar.display(), e),
            Err(e) => return Err(e),
        }
    }

    let output = match args.format {
        OutputFormat::Text => text,
        OutputFormat::Json if args.path.is_dir() => serde_json::to_string_pretty(&sheets)?,
        OutputFormat::Json => match sheets.first() {
            Some(sheet) => serde_json::to_string_pretty(sheet)?,
            None => bail!("Nothing was scanned"),
        },
    };

    match &args.output {
        Some(path) => {
            fs::write(path, output.as_bytes())
                .with_context(|| format!("Failed to write file: {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            if !output.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }

    Ok(())
}

/// Recursively collect `.jar` files, skipping hidden ones
fn find_jars(directory: &Path) -> Vec<PathBuf> {
    info!("Scanning directory: {}", directory.display());
    WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_jar(path))
        .collect()
}

fn is_jar(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false);
    let jar = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("jar"))
        .unwrap_or(false);
    jar && !hidden
}

/// Scan one jar, returning its sheet and text rendering
fn scan_jar(args: &ScanArgs, jar: &Path) -> Result<(EditSheet, String)> {
    debug!("Processing jar: {}", jar.display());
    let data = fs::read(jar).with_context(|| format!("Failed to load {}", jar.display()))?;
    let hash = fingerprint(&data);
    let archive =
        JarArchive::from_bytes(data).with_context(|| format!("Failed to load {}", jar.display()))?;

    let config = PipelineConfig::new()
        .progress_interval(args.progress_interval)
        .scanner(ScannerConfig::new().skip_enum_initializers(!args.include_enum_initializers));
    let report = scan_in_background(ScanPipeline::with_config(config), archive)?;

    for skipped in &report.skipped {
        debug!("Skipped {}: {}", skipped.entry, skipped.reason);
    }

    let filter = FilterConfig::new().hide_empty_strings(!args.show_empty);
    let strings = filter_strings(report.strings(), args.filter.as_deref().unwrap_or(""), &filter);
    info!(
        "{}: {} of {} strings shown",
        jar.display(),
        strings.len(),
        report.string_count()
    );

    let sheet = EditSheet::new(jar, hash, &strings);
    let text = render_text(jar, &report, &strings);
    Ok((sheet, text))
}

/// Runs the pipeline on a worker thread and logs its events here
fn scan_in_background(pipeline: ScanPipeline, mut archive: JarArchive) -> Result<ScanReport> {
    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || pipeline.run(&mut archive, &tx));

    for event in rx {
        match event {
            ScanEvent::Progress { processed, total } => {
                info!("Processed {}/{} classes", processed, total)
            }
            ScanEvent::Found(found) => trace!("#{} {:?}", found.id, found.value),
            ScanEvent::Finished(report) => debug!(
                "Scan finished: {}/{} classes, {} skipped",
                report.processed,
                report.total,
                report.skipped.len()
            ),
        }
    }

    worker.join().map_err(|_| anyhow!("Scan worker panicked"))
}

fn render_text(jar: &Path, report: &ScanReport, strings: &[&FoundString]) -> String {
    let mut out = format!(
        "{}: {} strings in {} classes ({} skipped)\n",
        jar.display(),
        strings.len(),
        report.classes.len(),
        report.skipped.len()
    );
    for found in strings {
        let line = found
            .line_number
            .map(|l| format!(":{}", l))
            .unwrap_or_default();
        let context = found
            .context
            .map(|c| format!(" [{}]", c))
            .unwrap_or_default();
        out.push_str(&format!(
            "  #{} {}{} {}{} {:?}\n",
            found.id,
            found.class_name,
            line,
            display_method(&found.method_signature),
            context,
            found.value
        ));
    }
    out
}

/// `name(desc)ret` as Java source, falling back to the raw signature
fn display_method(signature: &str) -> String {
    signature
        .find('(')
        .and_then(|split| pretty_method(&signature[..split], &signature[split..]).ok())
        .unwrap_or_else(|| signature.to_string())
}

/// Apply a sheet to a jar
fn run_apply(args: &ApplyArgs) -> Result<()> {
    let data = fs::read(&args.jar)
        .with_context(|| format!("Failed to load {}", args.jar.display()))?;
    let hash = fingerprint(&data);

    let sheet_text = fs::read_to_string(&args.sheet)
        .with_context(|| format!("Failed to read sheet: {}", args.sheet.display()))?;
    let sheet_file: SheetFile = serde_json::from_str(&sheet_text)
        .with_context(|| format!("Failed to parse sheet: {}", args.sheet.display()))?;
    let sheet = select_sheet(sheet_file, &hash, args.force)?;

    let edits = sheet.edits();
    if edits.is_empty() {
        warn!("Sheet has no changed values; output will match the input");
    }

    if args.output.exists() && !args.force {
        bail!(
            "File already exists: {} (use --force to overwrite)",
            args.output.display()
        );
    }

    let mut archive = JarArchive::from_bytes(data)
        .with_context(|| format!("Failed to load {}", args.jar.display()))?;
    let summary = rewrite(&mut archive, &edits)
        .with_context(|| format!("Failed to apply {}", args.sheet.display()))?;
    archive
        .save(&args.output)
        .with_context(|| format!("Failed to save {}", args.output.display()))?;

    println!(
        "Wrote {} ({} strings in {} classes changed)",
        args.output.display(),
        summary.edits,
        summary.entries
    );
    Ok(())
}

/// Picks the sheet made from the jar with `hash`
fn select_sheet(file: SheetFile, hash: &str, force: bool) -> Result<EditSheet> {
    let mut sheets = match file {
        SheetFile::One(sheet) => vec![sheet],
        SheetFile::Many(sheets) => sheets,
    };

    if let Some(index) = sheets.iter().position(|s| s.fingerprint == hash) {
        return Ok(sheets.swap_remove(index));
    }
    if !force {
        bail!("Jar has changed since the sheet was made (use --force to apply anyway)");
    }
    match (sheets.pop(), sheets.is_empty()) {
        (Some(sheet), true) => {
            warn!("Jar does not match the sheet's fingerprint; applying anyway");
            Ok(sheet)
        }
        _ => bail!("Jar matches none of the sheets and --force needs exactly one"),
    }
}
