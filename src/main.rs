use clap::{Parser, Subcommand};
use image_normalizer::config::{self, NormalizerConfig};
use image_normalizer::output::{self, BatchStats};
use image_normalizer::{Normalizer, Quality, describe, envelope, sniff};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Shared flag for commands that may transcode.
#[derive(clap::Args, Clone)]
struct QualityArgs {
    /// JPEG quality for transcoded images (1-100) [default: from config, else 85]
    #[arg(long)]
    quality: Option<u32>,
}

#[derive(Parser)]
#[command(name = "image-normalizer")]
#[command(about = "Make data-URL images displayable by any client")]
#[command(long_about = "\
Make data-URL images displayable by any client

Input is a data URL of the form data:<media-type>;base64,<data>. The bytes
are sniffed to find the real format; AVIF payloads, and payloads declaring
a deny-listed media type (AVIF, HEIF, HEIC by default), are re-encoded as
JPEG with transparency flattened onto white. Everything else is returned
unchanged.

Commands that take an optional FILE read standard input when it is omitted.

Run 'image-normalizer gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize one data URL and print the result
    Normalize {
        /// File holding the data URL
        input: Option<PathBuf>,
        #[command(flatten)]
        quality: QualityArgs,
    },
    /// Report declared type, detected format, and size of a data URL
    Describe {
        /// File holding the data URL
        input: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Normalize a file with one data URL per line, in parallel
    Batch {
        /// File with one data URL per line (blank lines pass through)
        input: PathBuf,
        #[command(flatten)]
        quality: QualityArgs,
    },
    /// Wrap an image file in a data URL
    Wrap {
        /// Image file
        image: PathBuf,
        /// Media type to declare [default: sniffed from the bytes]
        #[arg(long)]
        media_type: Option<String>,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;
    init_tracing(&config);

    match cli.command {
        Command::Normalize { input, quality } => {
            let text = read_input(input.as_deref())?;
            let normalizer = build_normalizer(&config);
            let quality = effective_quality(&quality, &config);
            if let Some(out) = normalizer.normalize(non_empty(&text), quality)? {
                println!("{out}");
            }
        }
        Command::Describe { input, json } => {
            let text = read_input(input.as_deref())?;
            let info = describe(non_empty(&text));
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                output::print_info(&info);
            }
        }
        Command::Batch { input, quality } => {
            let content = std::fs::read_to_string(&input)?;
            let inputs: Vec<Option<&str>> = content.lines().map(|l| non_empty(l.trim())).collect();
            init_thread_pool(&config.processing);

            let normalizer = build_normalizer(&config);
            let results = normalizer.normalize_batch(&inputs, effective_quality(&quality, &config));

            let mut stats = BatchStats::default();
            for (idx, (input, result)) in inputs.iter().zip(&results).enumerate() {
                stats.record(output::classify(*input, result));
                match result {
                    Ok(Some(out)) => println!("{out}"),
                    Ok(None) => println!(),
                    Err(err) => {
                        println!();
                        eprintln!("{}", output::format_batch_error(idx + 1, err));
                    }
                }
            }
            eprintln!("{}", output::format_batch_summary(&stats));
            if stats.failed > 0 {
                return Err(format!("{} of {} inputs failed", stats.failed, stats.total()).into());
            }
        }
        Command::Wrap { image, media_type } => {
            let bytes = std::fs::read(&image)?;
            let media_type = match media_type {
                Some(m) => m,
                None => sniff::sniff(&bytes)
                    .media_type()
                    .ok_or_else(|| {
                        format!(
                            "cannot determine the format of {}; pass --media-type",
                            image.display()
                        )
                    })?
                    .to_string(),
            };
            println!("{}", envelope::build(&media_type, &bytes));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over the config file's filter.
fn init_tracing(config: &NormalizerConfig) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores — user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn build_normalizer(config: &NormalizerConfig) -> Normalizer {
    Normalizer::new().with_policy(config.conversion.policy())
}

fn effective_quality(args: &QualityArgs, config: &NormalizerConfig) -> Quality {
    args.quality
        .map(Quality::new)
        .unwrap_or_else(|| config.conversion.quality())
}

/// Read the whole input, from a file or stdin, without the trailing newline.
fn read_input(path: Option<&Path>) -> std::io::Result<String> {
    let mut text = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    text.truncate(text.trim_end().len());
    Ok(text)
}

fn non_empty(text: &str) -> Option<&str> {
    Some(text).filter(|t| !t.is_empty())
}
