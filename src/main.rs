//! health-advisor command line.
//!
//! Usage:
//!   health-advisor serve
//!   health-advisor chat --role resident --location "Oakland, CA" "What clinics are open near me?"
//!   health-advisor insights --role staff --location "Fresno, CA"
//!   health-advisor analyze --location "Fresno, CA" "asthma trends since 2020"
//!   health-advisor recommend --role organization --location "Sacramento, CA"
//!   health-advisor agents

use anyhow::Result;
use clap::{Parser, Subcommand};
use health_advisor::{
    AdvisorPipeline, Role, config::Config, http::start_http_server, prompts::builtin_profiles,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "health-advisor")]
#[command(about = "Community health advisor with role-aware fallbacks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct SessionArgs {
    /// Audience: staff, organization or resident
    #[arg(long, default_value = "staff", value_parser = parse_role)]
    role: Role,
    /// Free-text location, e.g. "Fresno, CA"
    #[arg(long, default_value = "San Francisco, CA")]
    location: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve,
    /// Ask the root advisor a question
    Chat {
        #[command(flatten)]
        session: SessionArgs,
        message: String,
    },
    /// Print up to four insights for a location
    Insights {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Ask the data responder for an analysis
    Analyze {
        #[command(flatten)]
        session: SessionArgs,
        query: String,
    },
    /// Resource allocation recommendations
    Recommend {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// List agent profiles and intent routes
    Agents,
}

fn parse_role(s: &str) -> std::result::Result<Role, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    let filter = EnvFilter::try_new(&config.runtime.log_level)
        .unwrap_or_else(|_| EnvFilter::new("health_advisor=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.runtime.log_ansi)
        .with_writer(std::io::stderr)
        .init();

    let pipeline = AdvisorPipeline::from_config(&config);

    match cli.command {
        Commands::Serve => {
            info!("Starting health advisor server");
            start_http_server(pipeline, &config).await?;
        }
        Commands::Chat { session, message } => {
            if message.trim().is_empty() {
                anyhow::bail!("message must not be empty");
            }
            let answer = pipeline
                .safe_chat(&message, session.role, &session.location)
                .await;
            println!("{answer}");
        }
        Commands::Insights { session } => {
            let insights = pipeline.safe_insights(&session.location, session.role).await;
            for (i, insight) in insights.iter().enumerate() {
                println!("{}. {}", i + 1, insight);
            }
        }
        Commands::Analyze { session, query } => {
            let report = pipeline
                .data_analysis(&query, &session.location, session.role)
                .await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Recommend { session } => {
            let report = pipeline
                .resource_recommendations(&session.location, session.role)
                .await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Agents => print_agents(&config),
    }

    Ok(())
}

fn print_agents(config: &Config) {
    let builtin = builtin_profiles();
    for (name, entry) in &config.responders {
        let profile = entry.profile(name);
        let endpoint = entry.endpoint.as_deref().unwrap_or("(not configured)");
        let source = if builtin.contains_key(name) { "built-in" } else { "custom" };
        println!(
            "{name:<10} {:<18} {source:<9} {} {endpoint}",
            profile.model,
            profile.checksum()
        );
        println!("           {}", profile.description);
        if !profile.sub_agents.is_empty() {
            println!("           delegates to: {}", profile.sub_agents.join(", "));
        }
    }

    println!();
    println!("default        -> {}", config.routes.default);
    for intent in health_advisor::Intent::ALL {
        println!(
            "{:<14} -> {}",
            intent.as_str(),
            config.routes.route_for(intent).unwrap_or("(unrouted)")
        );
    }
}
