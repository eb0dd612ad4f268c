//! pixmill: resize, sharpen and re-encode images.

use anyhow::Context;
use clap::{Parser, Subcommand};
use pixmill_cli::output::{format_count, format_dimensions, format_duration, format_size, Status};
use pixmill_cli::progress::{finish_error, finish_success, image_progress};
use pixmill_image::{
    detect_format, Config, ImageCodec, ImageError, ImageFormat, OutputFormat, Pipeline, Rendered,
    TransformParams,
};
use pixmill_telemetry::{metrics, Event, TelemetryConfig, Timer};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Exit code for rejected request parameters or unreadable input images.
const EXIT_INVALID_REQUEST: i32 = 2;
const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "pixmill")]
#[command(about = "Resize, sharpen and re-encode images")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to .pixmill.toml or pixmill.toml if present)
    #[arg(long, global = true, env = "PIXMILL_CONFIG")]
    config: Option<PathBuf>,

    /// Log pipeline stages
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print collected timings as JSON on exit
    #[arg(long, global = true)]
    stats: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug, Clone)]
struct TransformArgs {
    /// Output width in pixels (at least 2)
    #[arg(long)]
    width: Option<u32>,

    /// Output height in pixels (at least 2)
    #[arg(long)]
    height: Option<u32>,

    /// Sharpening opacity: 0 = none, 100 = full
    #[arg(long)]
    sharpening: Option<u32>,

    /// Output format (overrides config)
    #[arg(long, value_parser = parse_output_format)]
    format: Option<OutputFormat>,

    /// JPEG quality 1-100 (overrides config)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a single image
    Process {
        /// Source image
        input: PathBuf,
        /// Destination file
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        args: TransformArgs,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Transform every image in a directory
    Batch {
        /// Directory to scan
        input: PathBuf,
        /// Directory to write results into
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        args: TransformArgs,
    },
    /// Detect image format from file
    Detect {
        /// Path to image file
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    let stats = cli.stats;

    let code = match run(cli) {
        Ok(()) => 0,
        Err(err) => {
            Status::error(&format!("{:#}", err));
            exit_code(&err)
        }
    };

    if stats {
        match serde_json::to_string_pretty(&metrics().snapshot()) {
            Ok(json) => println!("{}", json),
            Err(e) => Status::warning(&format!("Could not export stats: {}", e)),
        }
    }

    std::process::exit(code);
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    let logging = &config.schema.logging;
    pixmill_telemetry::init(&TelemetryConfig {
        log_level: if cli.verbose { "debug".to_string() } else { logging.level.clone() },
        show_target: logging.show_target,
        ..TelemetryConfig::default()
    })?;
    if let Some(path) = &config.path {
        tracing::debug!(path = %path.display(), "Loaded configuration");
    }

    match cli.command {
        Commands::Process { input, output, args, json } => {
            let (params, codec) = resolve(&config, &args)?;
            let pipeline = Pipeline::new(codec);
            let started = Instant::now();
            let rendered = process_file(&pipeline, &input, &output, &params)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                    "input": input.to_string_lossy(),
                    "output": output.to_string_lossy(),
                    "result": rendered,
                    "size_bytes": rendered.bytes.len(),
                }))?);
            } else {
                Status::success(&format!(
                    "{} -> {} ({}, {}, {})",
                    input.display(),
                    output.display(),
                    format_dimensions(rendered.width, rendered.height),
                    format_size(rendered.bytes.len() as u64),
                    format_duration(started.elapsed()),
                ));
            }
        }

        Commands::Batch { input, output, args } => {
            let (params, codec) = resolve(&config, &args)?;
            let extension = codec.format.extension();
            let pipeline = Pipeline::new(codec);

            std::fs::create_dir_all(&output)
                .with_context(|| format!("Failed to create {}", output.display()))?;

            let entries = collect_images(&input);
            if entries.is_empty() {
                Status::warning(&format!("No images found under {}", input.display()));
                return Ok(());
            }

            let pb = image_progress(entries.len() as u64);
            let failures: Vec<(PathBuf, anyhow::Error)> = entries
                .par_iter()
                .filter_map(|path| {
                    let target = output_path(&output, path, extension);
                    let result = process_file(&pipeline, path, &target, &params);
                    pb.inc(1);
                    result.err().map(|err| (path.clone(), err))
                })
                .collect();

            let ok = entries.len() - failures.len();
            Event::new(
                "batch_completed",
                serde_json::json!({ "processed": ok, "failed": failures.len() }),
            )
            .log();

            if failures.is_empty() {
                finish_success(&pb, &format_count(ok, "image", "images"));
            } else {
                finish_error(&pb, &format!("{} failed", failures.len()));
                for (path, err) in &failures {
                    Status::error(&format!("{}: {:#}", path.display(), err));
                }
                anyhow::bail!(
                    "{} of {} could not be processed",
                    failures.len(),
                    format_count(entries.len(), "image", "images")
                );
            }
        }

        Commands::Detect { path } => {
            let data = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let format = detect_format(&data)?;
            Status::field("Format", &format!("{:?}", format));
            Status::field("MIME", format.mime_type());
            Status::field("Extensions", &format.extensions().join(", "));
        }
    }

    Ok(())
}

/// Merge command line values over config defaults and validate them.
fn resolve(config: &Config, args: &TransformArgs) -> anyhow::Result<(TransformParams, ImageCodec)> {
    let defaults = &config.schema.defaults;
    let params = TransformParams::new(
        args.width.unwrap_or(defaults.width),
        args.height.unwrap_or(defaults.height),
        args.sharpening.unwrap_or(defaults.sharpening),
    )?;

    let mut codec = config.codec();
    if let Some(format) = args.format {
        codec.format = format;
    }
    if let Some(quality) = args.quality {
        codec.quality = quality;
    }

    Ok((params, codec))
}

/// One request: read, transform, write. Timed and counted.
///
/// Every failure, whether reading, transforming or writing, counts toward
/// `images.failed`.
fn process_file(
    pipeline: &Pipeline,
    input: &Path,
    output: &Path,
    params: &TransformParams,
) -> anyhow::Result<Rendered> {
    let _timer = Timer::start("transform.ms");

    let result = (|| -> anyhow::Result<Rendered> {
        let data = std::fs::read(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;
        let rendered = pipeline.process(&data, params)?;
        std::fs::write(output, &rendered.bytes)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        Ok(rendered)
    })();

    match &result {
        Ok(rendered) => {
            metrics().increment("images.ok");
            metrics().increment_by("bytes.written", rendered.bytes.len() as u64);
        }
        Err(_) => metrics().increment("images.failed"),
    }
    result
}

/// Files under `root` whose extension names a decodable format.
fn collect_images(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(ImageFormat::from_extension)
                .is_some()
        })
        .map(|e| e.into_path())
        .collect();
    paths.sort();
    paths
}

fn output_path(dir: &Path, input: &Path, extension: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    dir.join(stem).with_extension(extension)
}

fn parse_output_format(value: &str) -> Result<OutputFormat, String> {
    match value.to_ascii_lowercase().as_str() {
        "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
        "png" => Ok(OutputFormat::Png),
        other => Err(format!("unsupported output format '{}' (expected jpeg or png)", other)),
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ImageError>() {
        Some(image_err) if image_err.is_invalid_request() => EXIT_INVALID_REQUEST,
        _ => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixmill_image::{Codec, PixelBuffer};

    fn args() -> TransformArgs {
        TransformArgs {
            width: None,
            height: None,
            sharpening: None,
            format: None,
            quality: None,
        }
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_resolve_uses_config_defaults() {
        let (params, codec) = resolve(&Config::default(), &args()).unwrap();
        assert_eq!((params.width, params.height), (640, 360));
        assert_eq!(params.opacity.get(), 0);
        assert_eq!(codec.quality, 85);
    }

    #[test]
    fn test_resolve_overrides_and_rejects() {
        let mut overrides = args();
        overrides.width = Some(32);
        overrides.format = Some(OutputFormat::Png);
        let (params, codec) = resolve(&Config::default(), &overrides).unwrap();
        assert_eq!(params.width, 32);
        assert_eq!(codec.format, OutputFormat::Png);

        overrides.sharpening = Some(101);
        let err = resolve(&Config::default(), &overrides).unwrap_err();
        assert_eq!(exit_code(&err), EXIT_INVALID_REQUEST);
    }

    #[test]
    fn test_output_path() {
        let path = output_path(Path::new("out"), Path::new("in/photos/cat.jpeg"), "png");
        assert_eq!(path, PathBuf::from("out/cat.png"));
    }

    #[test]
    fn test_parse_output_format() {
        assert_eq!(parse_output_format("JPG"), Ok(OutputFormat::Jpeg));
        assert!(parse_output_format("tiff").is_err());
    }

    #[test]
    fn test_process_file_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let source = PixelBuffer::from_raw(8, 8, 3, vec![90; 192]).unwrap();
        let input = dir.path().join("src.png");
        std::fs::write(&input, ImageCodec::png().encode(&source).unwrap()).unwrap();

        let output = dir.path().join("out.jpg");
        let params = TransformParams::new(4, 4, 50).unwrap();
        let rendered = process_file(&Pipeline::default(), &input, &output, &params).unwrap();

        assert_eq!((rendered.width, rendered.height), (4, 4));
        assert_eq!(std::fs::read(&output).unwrap(), rendered.bytes);
    }

    #[test]
    fn test_collect_images_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/c.PNG"), b"x").unwrap();

        let found = collect_images(dir.path());
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_unreadable_input_is_general_failure() {
        let err = process_file(
            &Pipeline::default(),
            Path::new("/nonexistent/in.jpg"),
            Path::new("/nonexistent/out.jpg"),
            &TransformParams::new(4, 4, 0).unwrap(),
        )
        .unwrap_err();
        assert_eq!(exit_code(&err), EXIT_FAILURE);
    }

    #[test]
    fn test_read_and_write_failures_are_counted() {
        let params = TransformParams::new(4, 4, 0).unwrap();
        let before = metrics().counter("images.failed");

        let missing = process_file(
            &Pipeline::default(),
            Path::new("/nonexistent/in.jpg"),
            Path::new("/nonexistent/out.jpg"),
            &params,
        );
        assert!(missing.is_err());
        assert!(metrics().counter("images.failed") >= before + 1);

        let dir = tempfile::tempdir().unwrap();
        let source = PixelBuffer::from_raw(8, 8, 3, vec![90; 192]).unwrap();
        let input = dir.path().join("src.png");
        std::fs::write(&input, ImageCodec::png().encode(&source).unwrap()).unwrap();

        let unwritable = dir.path().join("missing-dir").join("out.jpg");
        let err = process_file(&Pipeline::default(), &input, &unwritable, &params).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to write"));
        assert!(metrics().counter("images.failed") >= before + 2);
    }
}
