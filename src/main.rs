//! Docsage - Document Q&A assistant CLI
//!
//! Loads one document per invocation and runs a single action against it:
//! answer a question, summarize, extract keywords or build a concept map.

use clap::Parser;
use docsage::{
    config::AppConfig,
    embedding::EmbeddingEngine,
    keywords::YakeScorer,
    loader::FileExtractor,
    log_error, log_info, logging,
    provider::{create_provider, ensure_available},
    session::{DocumentSession, SessionComponents},
    summary::SummaryLevel,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Answer a question about a document
    Ask {
        /// Document to load (pdf, docx, pptx or txt)
        file: PathBuf,
        /// Question text
        question: String,
    },
    /// Summarize a document
    Summarize {
        file: PathBuf,
        /// short, medium or detailed
        #[arg(long, default_value = "medium")]
        level: String,
    },
    /// Extract keywords from a document
    Keywords {
        file: PathBuf,
        /// Number of keywords (overrides config)
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Group document keywords into concept clusters
    Concepts {
        file: PathBuf,
        /// Write the concept graph as JSON
        #[arg(long)]
        json: Option<PathBuf>,
        /// Write the concept graph as Graphviz DOT
        #[arg(long)]
        dot: Option<PathBuf>,
        /// Similarity threshold (overrides config)
        #[arg(long)]
        threshold: Option<f32>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "docsage")]
#[command(author = "MadKoding")]
#[command(version)]
#[command(about = "Ask questions about a document, summarize it and map its concepts", long_about = None)]
struct Args {
    /// Configuration file path (overrides defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut app_config = AppConfig::load(args.config.as_deref())?;
    init_logging(args.verbose, app_config.debug);

    // CLI overrides
    match &args.command {
        Command::Keywords { top_k: Some(k), .. } => app_config.keywords.top_k = *k,
        Command::Concepts {
            threshold: Some(t), ..
        } => app_config.concepts.threshold = *t,
        _ => {}
    }
    app_config.validate()?;

    let mut session = build_session(&app_config).await?;

    match args.command {
        Command::Ask { file, question } => {
            load(&mut session, &file).await?;
            let answer = session.ask(&question).await?;
            println!("{}", answer);
        }
        Command::Summarize { file, level } => {
            load(&mut session, &file).await?;
            let summary = session.summarize(SummaryLevel::from_label(&level)).await?;
            println!("{}", summary);
        }
        Command::Keywords { file, .. } => {
            load(&mut session, &file).await?;
            for keyword in session.extract_keywords()? {
                println!("{}", keyword);
            }
        }
        Command::Concepts { file, json, dot, .. } => {
            load(&mut session, &file).await?;
            session.extract_keywords()?;
            let map = session.concept_map().await?;
            println!("{}", map.description);

            if let Some(path) = json {
                std::fs::write(&path, map.graph.to_json()?)?;
                log_info!("Concept graph written to {:?}", path);
            }
            if let Some(path) = dot {
                std::fs::write(&path, map.graph.to_dot())?;
                log_info!("Concept graph written to {:?}", path);
            }
        }
    }

    Ok(())
}

async fn build_session(config: &AppConfig) -> anyhow::Result<DocumentSession> {
    let answer_provider = create_provider(config.answer_model.clone())?;
    let paraphrase_provider = create_provider(config.paraphrase_model.clone())?;

    // Fail on an unreachable backend before the embedding model loads
    for provider in [&answer_provider, &paraphrase_provider] {
        if let Err(e) = ensure_available(&**provider).await {
            log_error!("Model {} is not available: {}", provider.model_name(), e);
            return Err(e.into());
        }
    }

    tracing::info!("Loading embedding model {}", config.embedding.model);
    let embedder = EmbeddingEngine::from_name(&config.embedding.model, config.embedding.cache_size).await?;

    let components = SessionComponents {
        embedder: Arc::new(embedder),
        answer_provider: Arc::from(answer_provider),
        paraphrase_provider: Arc::from(paraphrase_provider),
        extractor: Arc::new(FileExtractor::new()),
        scorer: Box::new(YakeScorer::new()),
    };

    Ok(DocumentSession::new(components, config))
}

async fn load(session: &mut DocumentSession, file: &Path) -> anyhow::Result<()> {
    match session.load(file).await {
        Ok(chunks) => {
            tracing::info!("Indexed {:?} into {} chunks", file, chunks);
            Ok(())
        }
        Err(e) => {
            log_error!("Failed to load {:?}: {}", file, e);
            Err(e.into())
        }
    }
}

/// Initialize logging
fn init_logging(verbose: bool, debug_mode: bool) {
    if let Err(e) = logging::init_logger() {
        eprintln!("File logging disabled: {}", e);
    }
    logging::set_debug_mode(verbose || debug_mode);

    let filter = if verbose || debug_mode {
        "docsage=debug,info"
    } else {
        "docsage=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
