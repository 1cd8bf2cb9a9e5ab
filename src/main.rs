use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dossier::api::create_router;
use dossier::config::Config;
use dossier::pipeline::ResearchAgent;

#[derive(Parser)]
#[command(name = "dossier", about = "Research a question on the web and write a report")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the research API and the generated reports
    Serve {
        /// Address to bind, overrides BIND_ADDR
        #[arg(long)]
        addr: Option<String>,
    },
    /// Run a single query and print the outcome as JSON
    Run {
        query: String,
        /// Let the model deduplicate and trim the structured results
        #[arg(long)]
        filter: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|l| l.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Serve { addr } => {
            let agent = Arc::new(ResearchAgent::from_config(&config, false)?);
            let app = create_router(agent, &config.reports_dir);
            let addr = addr.unwrap_or_else(|| config.bind_addr.clone());
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;
            tracing::info!("listening on {addr}");
            axum::serve(listener, app).await?;
        }
        Command::Run { query, filter } => {
            let agent = ResearchAgent::from_config(&config, filter)?;
            let outcome = agent.run(&query).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if let Some(path) = &outcome.report_path {
                tracing::info!("report saved to {}", path.display());
            }
        }
    }
    Ok(())
}
