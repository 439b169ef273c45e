use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tokio::net::TcpListener;
use tracing::{info, warn};

use deep_research::agents::SourceAggregator;
use deep_research::config::Config;
use deep_research::embeddings::{ContextIndexer, InMemoryVectorStore};
use deep_research::export::{markdown, ReportContent, ReportExporter};
use deep_research::llm::{ResearchLlm, LLM};
use deep_research::models::{AppState, ExportFormat, ResearchDepth, ResearchEvent, ResearchStore};
use deep_research::routes::create_router;
use deep_research::search::build_web_searcher;
use deep_research::synthesis::{spawn_research, EngineSettings, ResearchEngine, ResearchJob};
use deep_research::utils::init_logger;

#[derive(Parser)]
#[command(name = "deep-research")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Automated research assistant producing cited reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (default)
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Research a topic and print the report
    Research {
        topic: String,

        /// quick, standard or deep (default: RESEARCH_DEPTH)
        #[arg(short, long)]
        depth: Option<String>,

        /// screen, pdf, docx or both
        #[arg(short, long, default_value = "screen")]
        format: String,
    },
}

async fn build_state(config: Config) -> anyhow::Result<AppState> {
    let llm = LLM::new(&config.llm)?;
    if !llm.check_availability().await {
        warn!(provider = llm.provider_name(), model = llm.model(), "LLM backend is not reachable");
    }

    let searcher = build_web_searcher(&config.search)?;
    let aggregator = SourceAggregator::from_config(&config.realtime);
    info!(agents = ?aggregator.agent_names(), "Real-time agents registered");

    let store = InMemoryVectorStore::open(&config.rag.persist_dir, &config.rag.collection).await?;
    let indexer = ContextIndexer::from_config(Arc::new(store), &config.rag);

    let engine = ResearchEngine::new(
        ResearchLlm::new(llm),
        Arc::from(searcher),
        aggregator,
        indexer,
        EngineSettings::from_config(&config),
    );

    Ok(AppState {
        exporter: Arc::new(ReportExporter::from_config(&config.export)),
        engine: Arc::new(engine),
        results: ResearchStore::default(),
        config,
    })
}

async fn serve(state: AppState, port: Option<u16>) -> anyhow::Result<()> {
    let host: std::net::IpAddr = state.config.server.host.parse().context("Invalid HOST")?;
    let addr = SocketAddr::new(host, port.unwrap_or(state.config.server.port));

    let app = create_router(state);
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn research(state: AppState, topic: String, depth: Option<String>, format: String) -> anyhow::Result<()> {
    let job = ResearchJob {
        topic,
        depth: depth
            .as_deref()
            .map(ResearchDepth::from_id)
            .unwrap_or(state.config.research.default_depth),
        format: ExportFormat::from_id(&format),
    };

    let mut handle = spawn_research(state.engine.clone(), state.exporter.clone(), state.results.clone(), job);
    while let Some(event) = handle.next().await {
        match event {
            ResearchEvent::Progress(progress) => {
                println!("[{:>3}%] {}", progress.percent, progress.message);
            }
            ResearchEvent::Complete(completed) => {
                println!();
                println!("{}", markdown::render(&ReportContent::from(&completed.result)));
                for path in [&completed.pdf_path, &completed.docx_path].into_iter().flatten() {
                    println!("\nSaved {}", path);
                }
                return Ok(());
            }
            ResearchEvent::Error { error } => anyhow::bail!(error),
        }
    }

    anyhow::bail!("Research ended without a result")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let _log_guard = init_logger(config.server.log_dir.as_deref());
    config.validate()?;
    info!(provider = %config.llm.provider, model = %config.llm.model, search = %config.search.provider, "Configuration loaded");

    let state = build_state(config).await?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(state, port).await,
        Commands::Research { topic, depth, format } => research(state, topic, depth, format).await,
    }
}
