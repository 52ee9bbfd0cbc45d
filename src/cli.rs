// ============================================================================
// PixelBoard CLI - batch image conversion and thumbnail rendering
// ============================================================================
//
// Usage examples:
//   pixelboard convert -i photo.png                         (writes photo.json)
//   pixelboard convert -i shots/*.jpg --output-dir grids/ --preview
//   pixelboard render -i grids/*.json --output-dir thumbs/ --scale 8
//   pixelboard render -i cat.json -o cat.png --background "#202020"
//
// Everything runs synchronously on the current thread.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};

use crate::components::colors::{Rgb, hex_to_rgb};
use crate::config::BoardSettings;
use crate::error::{BoardError, Result};
use crate::io::{read_grid_file, write_grid_file, write_png_file};
use crate::ops::convert::convert_image_bytes;
use crate::ops::render::render;
use crate::{log_err, log_info, logger};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Convert images into 64×64 pixel-board designs and render designs back
/// into thumbnails.
#[derive(Parser, Debug)]
#[command(name = "pixelboard", about = "PixelBoard pixel-art design tool")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert images (PNG, JPEG, WEBP, BMP, GIF) into grid JSON files.
    Convert(ConvertArgs),
    /// Render grid JSON files into PNG thumbnails.
    Render(RenderArgs),
}

/// Input/output flags shared by every subcommand.
#[derive(Args, Debug)]
pub struct IoArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Background color as hex (default from settings, usually #000000).
    #[arg(long, value_name = "HEX")]
    pub background: Option<String>,

    /// Print per-file timing information and echo logged problems to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub io: IoArgs,

    /// Also write a 512×512 `<stem>_preview.png` next to each grid file.
    #[arg(long)]
    pub preview: bool,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub io: IoArgs,

    /// Output pixels per cell (default from settings).
    #[arg(short, long, value_name = "N")]
    pub scale: Option<u32>,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs, settings: &BoardSettings) -> ExitCode {
    match args.command {
        Command::Convert(convert) => {
            let preview = convert.preview;
            run_batch(&convert.io, "json", settings, |input, output, bg| {
                convert_one(input, output, bg, preview, settings)
            })
        }
        Command::Render(render_args) => {
            let scale = render_args.scale.unwrap_or(settings.thumbnail_scale);
            run_batch(&render_args.io, "png", settings, |input, output, bg| {
                render_one(input, output, bg, scale, settings)
            })
        }
    }
}

fn run_batch(
    io: &IoArgs,
    ext: &str,
    settings: &BoardSettings,
    mut process: impl FnMut(&Path, &Path, Rgb) -> Result<()>,
) -> ExitCode {
    // Resolve glob patterns / literal paths -> concrete PathBufs
    let inputs = resolve_inputs(&io.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    // Multiple inputs require --output-dir, not --output
    if inputs.len() > 1 && io.output.is_some() && io.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let background = match io.background.as_deref() {
        Some(hex) => match hex_to_rgb(hex) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => settings.background,
    };

    if let Some(dir) = &io.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    logger::set_echo(io.verbose);
    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || io.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();
        logger::set_context(
            input_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
        );

        let Some(output_path) =
            build_output_path(input_path, io.output.as_deref(), io.output_dir.as_deref(), ext)
        else {
            eprintln!(
                "  error: cannot determine output path for '{}'.",
                input_path.display()
            );
            any_failure = true;
            continue;
        };

        match process(input_path, &output_path, background) {
            Ok(()) => {
                if io.verbose || multi {
                    println!(
                        "  -> {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("{}: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    logger::set_context(None);
    log_info!("CLI batch finished: {} file(s), failures: {}", total, any_failure);
    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing
// ============================================================================

fn convert_one(
    input: &Path,
    output: &Path,
    background: Rgb,
    preview: bool,
    settings: &BoardSettings,
) -> Result<()> {
    let bytes = std::fs::read(input)?;
    let mut opts = settings.convert_options();
    opts.background = background;
    let conversion = convert_image_bytes(&bytes, &opts)?;

    write_grid_file(&conversion.grid, output)?;
    if preview {
        write_png_file(&conversion.preview, &preview_path(output))?;
    }
    Ok(())
}

fn render_one(
    input: &Path,
    output: &Path,
    background: Rgb,
    scale: u32,
    settings: &BoardSettings,
) -> Result<()> {
    if input == output {
        return Err(BoardError::InvalidInput(format!(
            "refusing to overwrite input '{}'",
            input.display()
        )));
    }
    let grid = read_grid_file(input)?;
    let opts = settings
        .render_options()
        .with_scale(scale)
        .with_background(background);
    write_png_file(&render(&grid, &opts), output)
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_out` to stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    ext: &str,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}

/// `dir/cat.json` -> `dir/cat_preview.png`
fn preview_path(grid_path: &Path) -> PathBuf {
    let stem = grid_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "design".to_string());
    grid_path.with_file_name(format!("{}_preview.png", stem))
}
