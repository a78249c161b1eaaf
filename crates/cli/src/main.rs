use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bookline_agents::BookingAgent;
use bookline_core::Denylist;
use bookline_extract::{
    Extractor, ExtractiveGenerator, Generator, LlmAnswerGenerator, LlmConfig, LlmSlotExtractor,
    ScriptedExtractor,
};
use bookline_observability::{init_tracing, AppMetrics};
use bookline_retrieval::{EmbeddingModel, HashEmbeddingModel, KnowledgeRetriever};
use bookline_storage::Store;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bookline")]
#[command(about = "Bookline booking assistant CLI")]
struct Cli {
    #[arg(long, default_value = "kb")]
    kb_root: PathBuf,

    /// Base URL used when rendering booking links.
    #[arg(long, default_value = "http://localhost:8080")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat session against the local agent.
    Chat,
    Kb {
        #[command(subcommand)]
        command: KbCommand,
    },
}

#[derive(Debug, Subcommand)]
enum KbCommand {
    Search {
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

type Agent = BookingAgent<Store, Extractor, Generator>;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("bookline_cli");
    let cli = Cli::parse();

    let agent = build_agent(&cli.kb_root).await?;

    match cli.command {
        Command::Chat => run_chat(agent, &cli.base_url).await?,
        Command::Kb { command } => match command {
            KbCommand::Search { query, limit } => {
                let hits = agent.kb_search(&query, limit);
                println!("{}", serde_json::to_string_pretty(&hits)?);
            }
        },
    }

    Ok(())
}

async fn run_chat(agent: Agent, base_url: &str) -> Result<()> {
    let session_id = uuid::Uuid::new_v4().to_string();

    println!("Bookline chat mode. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        let reply = agent.handle_message(&session_id, message, base_url).await?;
        println!("\n{reply}\n");
    }

    Ok(())
}

async fn build_agent(kb_root: &PathBuf) -> Result<Agent> {
    let metrics = AppMetrics::shared();

    let embedder: Arc<dyn EmbeddingModel> = Arc::new(HashEmbeddingModel::new(256));
    let retriever = Arc::new(
        KnowledgeRetriever::from_kb_dir(kb_root, Some(embedder))
            .with_context(|| format!("failed loading knowledge base from {}", kb_root.display()))?,
    );

    let denylist = match env::var("BOOKLINE_DENYLIST") {
        Ok(path) => Denylist::load(&path)
            .with_context(|| format!("failed to load denylist from {path}"))?,
        Err(_) => Denylist::default(),
    };

    let store = if let Ok(database_url) = env::var("BOOKLINE_DATABASE_URL") {
        Store::sqlite(&database_url).await?
    } else {
        Store::memory()
    };

    let (extractor, generator) = match env::var("BOOKLINE_EXTRACTOR")
        .unwrap_or_else(|_| "scripted".to_string())
        .trim()
        .to_ascii_lowercase()
        .as_str()
    {
        "scripted" => (
            Extractor::Scripted(ScriptedExtractor),
            Generator::Extractive(ExtractiveGenerator),
        ),
        "llm" => {
            let api_key = match env::var("BOOKLINE_LLM_API_KEY") {
                Ok(value) if !value.trim().is_empty() => value,
                _ => bail!("BOOKLINE_LLM_API_KEY is required when BOOKLINE_EXTRACTOR=llm"),
            };
            let config = LlmConfig {
                base_url: env::var("BOOKLINE_LLM_BASE_URL")
                    .unwrap_or_else(|_| LlmConfig::DEFAULT_BASE_URL.to_string()),
                api_key,
                model: env::var("BOOKLINE_LLM_MODEL")
                    .unwrap_or_else(|_| LlmConfig::DEFAULT_MODEL.to_string()),
            };
            (
                Extractor::Llm(LlmSlotExtractor::new(config.clone())?),
                Generator::Llm(LlmAnswerGenerator::new(config)?),
            )
        }
        other => bail!("invalid BOOKLINE_EXTRACTOR value: {other} (expected llm or scripted)"),
    };

    Ok(BookingAgent::new(
        retriever,
        extractor,
        generator,
        Arc::new(denylist),
        Arc::new(store),
        metrics,
    ))
}
