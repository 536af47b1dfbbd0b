//! Command-line interface for the investment advisor

use advisor_invest::report::{render_agent_report, render_positions_table};
use advisor_invest::{
    AgentOrchestrator, ApprovalGate, AuditLog, Broker, DailyScreening, EodhdClient, MockBroker,
    Settings, ShortlistPipeline,
};
use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "advisor")]
#[command(about = "AI investment advisor for long-term dividend portfolios", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one agent-driven analysis session
    Agent {
        /// Override the iteration cap for this run
        #[arg(long)]
        max_iterations: Option<usize>,
    },
    /// Screen the shortlist and gate every trade through manual approval
    Screen {
        /// Approve every proposed trade without prompting
        #[arg(long)]
        yes: bool,
    },
    /// Refresh the shortlist cache and print it
    Shortlist,
    /// Print the cached shortlist without refreshing it
    Report,
    /// Print the simulated portfolio
    Positions,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::from_env();

    info!("Starting advisor CLI");

    match cli.command {
        Commands::Agent { max_iterations } => run_agent(settings, max_iterations).await,
        Commands::Screen { yes } => run_screen(settings, yes).await,
        Commands::Shortlist => run_shortlist(settings).await,
        Commands::Report => run_report(&settings),
        Commands::Positions => run_positions().await,
    }
}

async fn run_agent(mut settings: Settings, max_iterations: Option<usize>) -> anyhow::Result<()> {
    if let Some(max_iterations) = max_iterations {
        settings.agent_max_iterations = max_iterations;
    }

    let orchestrator =
        AgentOrchestrator::from_settings(&settings).context("configuring the agent run")?;
    let report = orchestrator
        .run()
        .await
        .context("running the agent session")?;

    println!("{}", render_agent_report(&report));
    Ok(())
}

async fn run_screen(settings: Settings, yes: bool) -> anyhow::Result<()> {
    let screening =
        DailyScreening::from_settings(&settings).context("configuring the screening run")?;

    let decision_log = AuditLog::new(&settings.decision_log_path);
    let mut gate = if yes {
        ApprovalGate::with_input(decision_log, Box::new(|_| "y".to_string()))
    } else {
        ApprovalGate::new(decision_log)
    };

    screening
        .run(&mut gate)
        .await
        .context("running the daily screening")?;
    Ok(())
}

async fn run_shortlist(settings: Settings) -> anyhow::Result<()> {
    settings
        .validate_for_market()
        .context("configuring market data access")?;

    let market = EodhdClient::new(&settings.market_api_key, settings.market_rate_limit)
        .with_base_url(&settings.market_base_url);
    let pipeline = shortlist_pipeline(&settings);

    let shortlist = pipeline
        .refresh(&market)
        .await
        .context("refreshing the shortlist")?;
    println!("Refreshed shortlist ({} candidates):", shortlist.tickers.len());
    println!("{}", serde_json::to_string_pretty(&shortlist)?);
    Ok(())
}

fn run_report(settings: &Settings) -> anyhow::Result<()> {
    let shortlist = shortlist_pipeline(settings).load();
    println!("Current shortlist:");
    println!("{}", serde_json::to_string_pretty(&shortlist)?);
    Ok(())
}

async fn run_positions() -> anyhow::Result<()> {
    let broker = MockBroker::new();
    broker.authenticate().await?;
    let positions = broker.list_positions().await?;

    if positions.is_empty() {
        println!("No positions found.");
        return Ok(());
    }
    println!("{}", render_positions_table(&positions));
    Ok(())
}

fn shortlist_pipeline(settings: &Settings) -> ShortlistPipeline {
    ShortlistPipeline::new(
        &settings.shortlist_cache_path,
        settings.shortlist_target_size,
        settings.shortlist_refresh_days,
        &settings.default_exchange,
    )
}
