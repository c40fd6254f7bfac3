//! 命令行入口

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pagelingo::env::{core::LogLevel, EnvVar};
use pagelingo::translation::config::ConfigManager;
use pagelingo::{
    build_service, extract_to_dir, print_error_message, print_info_message, run_pipeline,
    translate_summary, TranslateOptions, TranslationConfig, TranslationResult,
};

#[derive(Parser, Debug)]
#[command(name = "pagelingo")]
#[command(version, about = "Extract translatable HTML text into addressed blocks and reassemble translated pages", long_about = None)]
struct Cli {
    /// Config file (TOML or JSON); defaults to the first known config path that exists
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the addressed record, flat summaries and placeholder document
    Extract {
        #[arg(value_name = "HTML")]
        input: PathBuf,

        /// Primary language of the document
        #[arg(long)]
        lang: String,

        /// Secondary source language, checked against --lang and accepted by `translate`
        #[arg(long)]
        secondary_lang: Option<String>,

        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        /// Document charset label
        #[arg(long, value_name = "LABEL")]
        encoding: Option<String>,
    },

    /// Deduplicate, translate and remap a flat summary
    Translate {
        /// Flat summary produced by `extract`
        #[arg(long, value_name = "JSON")]
        input: PathBuf,

        #[arg(long, value_name = "JSON")]
        output: PathBuf,

        /// Target language
        #[arg(long)]
        lang: String,

        #[arg(long)]
        primary_lang: Option<String>,

        #[arg(long)]
        secondary_lang: Option<String>,

        /// Translation memory directory
        #[arg(long, value_name = "DIR")]
        memory: Option<PathBuf>,

        /// Also write segment-only translations here
        #[arg(long, value_name = "JSON")]
        segments: Option<PathBuf>,
    },

    /// Extract, translate and reassemble into translated.html
    Run {
        #[arg(value_name = "HTML")]
        input: PathBuf,

        /// Primary language of the document
        #[arg(long)]
        lang: String,

        /// Target language
        #[arg(long)]
        target: String,

        #[arg(long)]
        secondary_lang: Option<String>,

        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        #[arg(long, value_name = "LABEL")]
        encoding: Option<String>,

        #[arg(long, value_name = "DIR")]
        memory: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) -> Result<(), String> {
    let level = if verbose {
        "debug".to_string()
    } else {
        LogLevel::get().unwrap_or_else(|e| {
            print_error_message(&e.to_string());
            "info".to_string()
        })
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| format!("初始化日志失败: {}", e))
}

fn load_config(path: Option<&PathBuf>) -> TranslationResult<TranslationConfig> {
    let manager = match path {
        Some(path) => ConfigManager::from_file(&path.to_string_lossy())?,
        None => ConfigManager::new()?,
    };
    Ok(manager.into_config())
}

fn path_string(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

async fn execute(cli: Cli) -> TranslationResult<()> {
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Extract { input, lang, secondary_lang, out_dir, encoding } => {
            config.primary_lang = lang.to_lowercase();
            config.secondary_lang = secondary_lang.map(|l| l.to_lowercase()).or(config.secondary_lang);
            if let Some(encoding) = encoding {
                config.document_encoding = encoding;
            }
            let out_dir = out_dir.unwrap_or_else(|| PathBuf::from(&config.output_dir));
            config.validate()?;

            let (extraction, artifacts) = extract_to_dir(&input, &out_dir, &config)?;
            print_info_message(&format!(
                "{} blocks, {} sentences -> {}",
                extraction.stats.blocks,
                extraction.stats.sentences,
                artifacts.flat.display()
            ));
        }
        Command::Translate { input, output, lang, primary_lang, secondary_lang, memory, segments } => {
            config.target_lang = lang.to_lowercase();
            if let Some(primary) = primary_lang {
                config.primary_lang = primary.to_lowercase();
            }
            config.secondary_lang = secondary_lang.map(|l| l.to_lowercase()).or(config.secondary_lang);
            if let Some(memory) = memory {
                config.memory_enabled = true;
                config.memory_dir = path_string(memory);
            }
            config.validate()?;

            let service = build_service(&config)?;
            let report =
                translate_summary(&TranslateOptions { input, output: output.clone(), segments }, &service)
                    .await?;
            print_info_message(&format!(
                "{} segments ({} unique): {} translated, {} unchanged -> {}",
                report.total_segments,
                report.unique_segments,
                report.translated,
                report.unchanged,
                output.display()
            ));
        }
        Command::Run { input, lang, target, secondary_lang, out_dir, encoding, memory } => {
            config.primary_lang = lang.to_lowercase();
            config.target_lang = target.to_lowercase();
            config.secondary_lang = secondary_lang.map(|l| l.to_lowercase()).or(config.secondary_lang);
            if let Some(encoding) = encoding {
                config.document_encoding = encoding;
            }
            if let Some(memory) = memory {
                config.memory_enabled = true;
                config.memory_dir = path_string(memory);
            }
            let out_dir = out_dir.unwrap_or_else(|| PathBuf::from(&config.output_dir));
            config.validate()?;

            let service = build_service(&config)?;
            let report = run_pipeline(&input, &out_dir, &config, &service).await?;
            print_info_message(&format!(
                "{} translated, {} unchanged, {} placeholders replaced -> {}",
                report.translation.translated,
                report.translation.unchanged,
                report.reassembly.replaced,
                report.output.display()
            ));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    if let Err(e) = execute(cli).await {
        print_error_message(&e.to_string());
        std::process::exit(1);
    }

    Ok(())
}
