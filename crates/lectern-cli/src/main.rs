//! Lectern command-line interface.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, Subcommand, ValueEnum};
use lectern::core::io::document_from_path;
use lectern::{
    ExtractionResult, ExtractionStatus, LecternConfig, Orchestrator, Origin, PreprocessOptions, preprocess,
    preprocess_data_url,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "lectern", version, about = "Turn documents and photographed pages into plain text")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract text from one or more files
    Extract {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Where the input came from (uploaded_file, camera_capture, clipboard_paste, typed_text)
        #[arg(long, default_value = "uploaded_file")]
        origin: Origin,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Config file (toml, yaml or json); defaults to a discovered lectern.toml
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Downscale and re-encode an image the way it is sent to OCR
    Preprocess {
        path: PathBuf,

        #[arg(long)]
        max_width: Option<u32>,

        /// JPEG quality factor in (0, 1]
        #[arg(long)]
        quality: Option<f64>,

        #[arg(long)]
        grayscale: bool,

        /// Write the JPEG here instead of printing a data URL
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run the HTTP relay
    #[cfg(feature = "api")]
    Serve {
        #[arg(short = 'H', long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lectern=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<LecternConfig> {
    LecternConfig::load(path).context("Failed to load configuration")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Extract {
            paths,
            origin,
            format,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            extract(&config, &paths, origin, format).await
        }
        Command::Preprocess {
            path,
            max_width,
            quality,
            grayscale,
            output,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let mut options = config.image.preprocess_options();
            if let Some(max_width) = max_width {
                options.max_width = max_width;
            }
            if let Some(quality) = quality {
                options.quality = quality;
            }
            options.grayscale |= grayscale;
            run_preprocess(&path, &options, output.as_deref())
        }
        #[cfg(feature = "api")]
        Command::Serve { host, port, config } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            lectern::api::serve(config).await.context("Relay server failed")
        }
        Command::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

async fn extract(config: &LecternConfig, paths: &[PathBuf], origin: Origin, format: OutputFormat) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::from_config(config);

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let document = document_from_path(path, origin)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        documents.push(document);
    }

    let results = if documents.len() == 1 {
        let mut documents = documents;
        match documents.pop() {
            Some(document) => vec![orchestrator.extract(document).await],
            None => Vec::new(),
        }
    } else {
        orchestrator.extract_batch(documents).await
    };

    print_results(paths, &results, format)?;

    let failed: Vec<String> = paths
        .iter()
        .zip(&results)
        .filter(|(_, r)| r.status == ExtractionStatus::Failed)
        .map(|(p, r)| format!("{}: {}", p.display(), r.error_detail.as_deref().unwrap_or("unknown error")))
        .collect();

    if !failed.is_empty() {
        bail!("Extraction failed for {} file(s):\n{}", failed.len(), failed.join("\n"));
    }
    Ok(())
}

fn print_results(paths: &[PathBuf], results: &[ExtractionResult], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = if results.len() == 1 {
                serde_json::to_string_pretty(&results[0])?
            } else {
                serde_json::to_string_pretty(results)?
            };
            println!("{}", json);
        }
        OutputFormat::Text => {
            let many = results.len() > 1;
            for (path, result) in paths.iter().zip(results) {
                if many {
                    println!("==> {} <==", path.display());
                }
                if result.status == ExtractionStatus::Partial
                    && let Some(detail) = &result.error_detail
                {
                    tracing::warn!(path = %path.display(), "{}", detail);
                }
                print!("{}", result.text);
                if many && !result.text.ends_with('\n') {
                    println!();
                }
            }
        }
    }
    Ok(())
}

fn run_preprocess(path: &Path, options: &PreprocessOptions, output: Option<&Path>) -> anyhow::Result<()> {
    options.validate()?;

    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let payload = if bytes.starts_with(b"data:") {
        preprocess_data_url(&String::from_utf8_lossy(&bytes), options)
    } else {
        preprocess(&bytes, None, options)
    };

    if payload.is_passthrough() {
        bail!("{} could not be decoded as an image", path.display());
    }

    tracing::info!(
        width = payload.width,
        height = payload.height,
        grayscale = payload.grayscale,
        "Preprocessed image"
    );

    match output {
        Some(output) => {
            let jpeg = STANDARD.decode(&payload.encoded_data)?;
            std::fs::write(output, jpeg).with_context(|| format!("Failed to write {}", output.display()))?;
        }
        None => println!("{}", payload.data_url()),
    }
    Ok(())
}
