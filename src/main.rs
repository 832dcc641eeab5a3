use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{info, warn};

use oxidized_research::{
    agents::{ResearchRunner, ResearchWorkflow},
    config::Config,
    create_router,
    utils::init_logger,
    AppState,
};

#[derive(Parser)]
#[command(name = "oxidized-research", version, about = "Iterative web research agent")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Research a single topic and print the final summary
    Run {
        topic: String,
        /// Override MAX_WEB_RESEARCH_LOOPS
        #[arg(long)]
        loops: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let _log_guard = init_logger(&config.logging);

    for warning in &config.warnings {
        warn!("{}", warning);
    }

    if config.llm.api_key.is_empty() {
        warn!(provider = %config.llm.provider, "No LLM API key configured");
    }
    if config.search.tavily_api_key.is_empty() {
        warn!("TAVILY_API_KEY is not set; every search will come back empty");
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Run { topic, loops } => run_once(config, &topic, loops).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!(
        provider = %config.llm.provider,
        model = %config.llm.model,
        max_loops = config.research.max_web_research_loops,
        "Configuration loaded"
    );

    let workflow = Arc::new(ResearchWorkflow::from_config(&config));
    let state = AppState::new(config.clone(), workflow);
    let _sweeper = state.jobs.spawn_sweeper(config.jobs.sweep_interval());

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn run_once(config: Config, topic: &str, loops: Option<u32>) -> anyhow::Result<()> {
    let mut workflow = ResearchWorkflow::from_config(&config);
    if let Some(loops) = loops {
        workflow = workflow.with_max_loops(loops);
    }

    let started = Instant::now();
    let summary = workflow.research(topic).await?;

    println!("{}", summary);
    println!("\nResearch completed in {:.2} seconds", started.elapsed().as_secs_f64());
    Ok(())
}
