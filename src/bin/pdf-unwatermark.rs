//! PDF Unwatermark CLI tool
//!
//! A command-line tool for stripping watermark overlays from PDF files.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use std::path::{Path, PathBuf};
use std::process;

use pdf_unwatermark::pdf::{clean_pdf, inspect_pdf, CleanOptions, PageOutcome};
use pdf_unwatermark::{Error, FilterConfig};

/// PDF Unwatermark - Remove watermark overlays from PDFs
#[derive(Parser)]
#[command(name = "pdf-unwatermark")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Clean a single file
    pdf-unwatermark clean input.pdf -o output.pdf

    # Clean every PDF in a directory into another directory
    pdf-unwatermark clean \"pdf_data/*.pdf\" --output-dir clean_pdf_data

    # Treat anything at or below 30% opacity as a watermark candidate
    pdf-unwatermark clean input.pdf -o output.pdf --alpha-threshold 0.3

    # Show what would be removed without writing anything
    pdf-unwatermark inspect input.pdf")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove watermarks from one or more PDF files
    Clean {
        /// Input PDF files. Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file path (single input only)
        #[arg(short, long, conflicts_with = "output_dir")]
        output: Option<PathBuf>,

        /// Directory for cleaned files, keeping each input's file name
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Remove optional content (layer) configuration from the catalog
        #[arg(long)]
        strip_optional_content: bool,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show what would be removed from a PDF file
    Inspect {
        /// PDF file to inspect
        input: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,
    },
}

/// Heuristic tuning shared by all commands
#[derive(Args)]
struct FilterArgs {
    /// Opacity at or below which a graphics state counts as low-alpha
    #[arg(long, default_value_t = 0.45)]
    alpha_threshold: f32,

    /// Font size or text scale at which text counts as large
    #[arg(long, default_value_t = 36.0)]
    large_text: f32,

    /// Stamp annotation keyword (repeatable; replaces the default list)
    #[arg(long = "keyword")]
    keywords: Vec<String>,
}

impl FilterArgs {
    fn to_config(&self) -> FilterConfig {
        let config = FilterConfig {
            low_alpha_threshold: self.alpha_threshold,
            large_text_threshold: self.large_text,
            ..FilterConfig::default()
        };

        if self.keywords.is_empty() {
            config
        } else {
            config.with_keywords(&self.keywords)
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Clean {
            inputs,
            output,
            output_dir,
            strip_optional_content,
            filter,
        } => cmd_clean(
            inputs,
            output,
            output_dir,
            strip_optional_content,
            filter.to_config(),
        ),
        Commands::Inspect { input, filter } => {
            cmd_inspect(&input, &filter.to_config())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let entries = glob(&pattern).map_err(|e| Error::InvalidGlob(e.to_string()))?;
            let before = paths.len();
            for entry in entries {
                match entry {
                    Ok(path) if is_pdf(&path) => paths.push(path),
                    Ok(_) => {}
                    Err(e) => eprintln!("Warning: glob error for {}: {}", pattern, e),
                }
            }
            if paths.len() == before {
                return Err(Error::NoFilesMatched(pattern).into());
            }
        } else {
            // No glob characters, treat as literal path
            paths.push(PathBuf::from(pattern));
        }
    }

    // Sort paths for consistent ordering
    paths.sort();

    Ok(paths)
}

fn is_pdf(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Work out where each input should be written
fn output_paths(
    inputs: &[PathBuf],
    output: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> Result<Vec<PathBuf>> {
    match (output, output_dir) {
        (Some(output), None) => {
            if inputs.len() != 1 {
                bail!(
                    "--output takes a single input; use --output-dir for {} files",
                    inputs.len()
                );
            }
            Ok(vec![output])
        }
        (None, Some(dir)) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Could not create {}", dir.display()))?;
            inputs
                .iter()
                .map(|input| -> Result<PathBuf> {
                    let name = input
                        .file_name()
                        .with_context(|| format!("Input has no file name: {}", input.display()))?;
                    Ok(dir.join(name))
                })
                .collect()
        }
        _ => bail!("Specify either --output or --output-dir"),
    }
}

/// Clean each input, falling back to a plain copy when cleaning fails
fn cmd_clean(
    inputs: Vec<String>,
    output: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    strip_optional_content: bool,
    config: FilterConfig,
) -> Result<()> {
    // Expand glob patterns
    let inputs = expand_globs(inputs)?;
    let outputs = output_paths(&inputs, output, output_dir)?;

    eprintln!("Cleaning {} PDF file(s)...", inputs.len());

    let failures = clean_batch(&inputs, &outputs, &config, strip_optional_content);
    if failures > 0 {
        bail!("{} file(s) could not be cleaned or copied", failures);
    }

    Ok(())
}

/// Process every input in turn, returning how many produced no output
///
/// A missing input or a failed fallback copy is reported and counted, and the
/// remaining inputs are still processed.
fn clean_batch(
    inputs: &[PathBuf],
    outputs: &[PathBuf],
    config: &FilterConfig,
    strip_optional_content: bool,
) -> usize {
    let mut failures = 0;

    for (input, output) in inputs.iter().zip(outputs) {
        if !input.exists() {
            eprintln!("Failed: input file not found: {}", input.display());
            failures += 1;
            continue;
        }

        let options = CleanOptions {
            input_path: input.clone(),
            output_path: output.clone(),
            config: config.clone(),
            strip_optional_content,
        };

        match clean_pdf(&options) {
            Ok(report) => {
                eprintln!(
                    "Cleaned: {} -> {} ({} of {} pages changed, {} skipped)",
                    input.display(),
                    output.display(),
                    report.pages_changed(),
                    report.pages.len(),
                    report.pages_skipped(),
                );
            }
            Err(e) => {
                eprintln!("Failed: {}: {}", input.display(), e);
                if input != output {
                    if let Err(copy_err) = std::fs::copy(input, output) {
                        eprintln!(
                            "Warning: could not copy original to {}: {}",
                            output.display(),
                            copy_err,
                        );
                        failures += 1;
                    }
                }
            }
        }
    }

    failures
}

/// Print per-page findings without modifying the file
fn cmd_inspect(input: &Path, config: &FilterConfig) -> Result<()> {
    let findings = inspect_pdf(input, config)
        .with_context(|| format!("Could not inspect {}", input.display()))?;

    println!("File: {}", input.display());
    println!("Pages: {}", findings.len());

    for page in findings {
        println!();
        println!("Page {}:", page.page_number);
        if !page.low_alpha_states.is_empty() {
            println!("  Low-alpha states: {}", page.low_alpha_states.join(", "));
        }
        if page.form_xobjects > 0 {
            println!("  Form XObjects: {}", page.form_xobjects);
        }
        if page.watermark_annotations > 0 {
            println!("  Watermark annotations: {}", page.watermark_annotations);
        }

        match page.content {
            PageOutcome::Cleaned {
                dropped_operations,
                dropped_scopes,
                dropped_marked_regions,
                dropped_text_objects,
            } => {
                println!(
                    "  Would drop {} operations ({} scopes, {} marked regions, {} text objects)",
                    dropped_operations,
                    dropped_scopes,
                    dropped_marked_regions,
                    dropped_text_objects,
                );
            }
            PageOutcome::Unchanged => println!("  Content: no watermark found"),
            PageOutcome::Skipped { reason } => println!("  Content: skipped ({})", reason),
        }
    }

    Ok(())
}
