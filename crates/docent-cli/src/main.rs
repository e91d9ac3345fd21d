//! Docent CLI - Command-line interface
//!
//! Usage:
//!   docent index [--dir <path>]
//!   docent ask <question> [--top-k <n>]
//!   docent status
//!   docent documents [--dir <path>]
//!   docent reset --yes

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use docent_core::{Answer, AppConfig, IndexReport, LlmClient, SystemStatus};
use docent_parser::PdfProcessor;
use docent_rag::{create_llm_client, Assistant};
use docent_vector::{create_embedding_client, create_vector_store, EmbeddingClient};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docent")]
#[command(about = "Answer questions from a folder of PDF documents")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables still override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, chunk, embed and store every PDF in the directory
    Index {
        /// PDF directory (defaults to the configured one)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Ask a question about the indexed documents
    Ask {
        /// Question to ask
        question: String,

        /// Number of similar chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Show vector store and model status
    Status,
    /// List the PDF files in the directory
    Documents {
        /// PDF directory (defaults to the configured one)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Delete every indexed vector
    Reset {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn build_assistant(config: &AppConfig) -> anyhow::Result<Assistant> {
    let embedder: Arc<dyn EmbeddingClient> = Arc::from(create_embedding_client(&config.openai)?);
    let store = create_vector_store(config).await?;
    let llm: Arc<dyn LlmClient> = Arc::from(create_llm_client(&config.openai)?);
    Ok(Assistant::new(embedder, store, llm, config))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn render_index_report(report: &IndexReport) -> String {
    format!(
        "{}\n  documents processed:  {}\n  chunks created:       {}\n  embeddings generated: {}",
        report.message,
        report.documents_processed,
        report.chunks_created,
        report.embeddings_generated
    )
}

fn render_answer(answer: &Answer) -> String {
    if !answer.success {
        return answer.message.clone();
    }

    let mut out = answer.answer.clone();
    if !answer.sources.is_empty() {
        out.push_str("\n\nSources:");
        for (i, source) in answer.sources.iter().enumerate() {
            out.push_str(&format!(
                "\n  {}. {} (chunk {}, score {:.3})",
                i + 1,
                source.filename,
                source.chunk_index,
                source.score
            ));
        }
    }
    out
}

fn render_status(status: &SystemStatus) -> String {
    let mut out = format!(
        "connected:       {}\n\
         total vectors:   {}\n\
         dimension:       {}\n\
         index fullness:  {}\n\
         pdf directory:   {}\n\
         embedding model: {}\n\
         chat model:      {}",
        status.connected,
        status.total_vectors,
        status.dimension,
        status.index_fullness,
        status.pdf_directory,
        status.embedding_model,
        status.chat_model
    );
    if let Some(error) = &status.error {
        out.push_str(&format!("\nerror:           {error}"));
    }
    out
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref()).context("failed to load configuration")?;
    init_tracing(&config);

    if let Commands::Documents { dir } = &cli.command {
        let dir = dir.clone().unwrap_or_else(|| config.documents.pdf_directory.clone());
        let files = PdfProcessor::new(dir).list_pdfs();
        if cli.json {
            print_json(&files)?;
        } else if files.is_empty() {
            println!("No PDF files found.");
        } else {
            for file in &files {
                println!("{file}");
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    config.validate().context("invalid configuration")?;
    let assistant = build_assistant(&config).await?;

    match cli.command {
        Commands::Index { dir } => {
            assistant
                .prepare()
                .await
                .context("failed to set up the vector index")?;
            let dir = dir.unwrap_or_else(|| config.documents.pdf_directory.clone());
            let report = assistant.index_directory(&dir).await;
            if cli.json {
                print_json(&report)?;
            } else {
                println!("{}", render_index_report(&report));
            }
            Ok(exit_code(report.success))
        }
        Commands::Ask { question, top_k } => {
            let answer = assistant.ask(&question, top_k).await;
            if cli.json {
                print_json(&answer)?;
            } else {
                println!("{}", render_answer(&answer));
            }
            Ok(exit_code(answer.success))
        }
        Commands::Status => {
            let status = assistant.system_status().await;
            if cli.json {
                print_json(&status)?;
            } else {
                println!("{}", render_status(&status));
            }
            Ok(exit_code(status.connected))
        }
        Commands::Reset { yes } => {
            if !yes {
                eprintln!("Refusing to delete all vectors without --yes");
                return Ok(ExitCode::FAILURE);
            }
            assistant.reset().await.context("failed to delete vectors")?;
            println!("All vectors deleted.");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Documents { .. } => Ok(ExitCode::SUCCESS),
    }
}
