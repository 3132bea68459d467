use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use tanoshi_engine::{ConnectorEngine, EngineConfig, Operation};
use tanoshi_types::{Chapter, FilterValue, Filters, Manga};

/// Run a single connector script against its live source.
#[derive(clap::Parser, Debug)]
struct Cli {
    /// Path to the connector script
    #[clap(long, short)]
    script: PathBuf,
    /// Engine config file
    #[clap(long, default_value = "./local/engine.json")]
    config: PathBuf,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Show the connector's identity and supported operations
    Info,
    /// Fetch a page of latest updates
    Latest {
        #[clap(default_value_t = 1)]
        page: i64,
    },
    /// Fetch details for a manga path
    Details { path: String },
    /// List chapters for a manga path
    Chapters { path: String },
    /// Fetch the pages of a chapter path
    Chapter { path: String },
    /// Search with `key=value` filters
    Search {
        #[clap(value_parser = parse_filter)]
        filters: Vec<(String, FilterValue)>,
    },
}

fn parse_filter(raw: &str) -> Result<(String, FilterValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    Ok((key.to_string(), FilterValue::parse_loose(value)))
}

#[derive(Serialize)]
struct Info<'a> {
    name: &'a str,
    base_url: &'a str,
    operations: Vec<String>,
}

fn print_json(value: &impl Serialize) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = EngineConfig::load(&cli.config).await?;
    let engine = ConnectorEngine::with_default_transport(config)?;
    let connector = engine.load_connector(&cli.script).await?;

    match cli.command {
        Commands::Info => {
            let mut operations = Vec::new();
            for op in Operation::ALL {
                if connector.supports(op).await {
                    operations.push(op.to_string());
                }
            }
            print_json(&Info {
                name: connector.name(),
                base_url: connector.base_url(),
                operations,
            })?;
        }
        Commands::Latest { page } => {
            print_json(&connector.get_latest_updates(page).await?)?;
        }
        Commands::Details { path } => {
            let manga = Manga {
                path,
                ..Manga::default()
            };
            print_json(&connector.get_manga_details(&manga).await?)?;
        }
        Commands::Chapters { path } => {
            let manga = Manga {
                path,
                ..Manga::default()
            };
            print_json(&connector.get_chapters(&manga).await?)?;
        }
        Commands::Chapter { path } => {
            let chapter = Chapter {
                path,
                ..Chapter::default()
            };
            print_json(&connector.get_chapter(&chapter).await?)?;
        }
        Commands::Search { filters } => {
            let filters: Filters = filters.into_iter().collect();
            print_json(&connector.fetch_manga(&filters).await?)?;
        }
    }

    connector.close();
    Ok(())
}
