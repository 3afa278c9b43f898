//! ensearch CLI
//!
//! Search names and addresses against a resolution service.
//!
//! Usage:
//!   ensearch search luc
//!   ensearch resolve luc.eth
//!   ensearch bulk luc.eth 0xb8c2C29ee19D8307cb7255e1Cd9CbDE883A267d5
//!   ensearch watch            # type queries line by line

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ensearch_client::{
    ClientBuilder, Orchestrator, OrchestratorConfig, PointLookup, SearchPhase, SearchState,
};
use ensearch_core::{classify, Profile};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ensearch")]
#[command(about = "Search and resolve names and addresses")]
struct Args {
    /// Resolution service base URL
    #[arg(long, env = "ENSEARCH_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Social graph service base URL
    #[arg(long, env = "ENSEARCH_SOCIAL_URL", default_value = "https://api.ethfollow.xyz")]
    social_url: String,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Free-text search
    Search { term: String },
    /// Point lookup of a name or address, with follower counts
    Resolve { identifier: String },
    /// Universal bulk lookup (names and addresses mixed)
    Bulk { queries: Vec<String> },
    /// Read queries from stdin as if typed into a search box
    Watch {
        /// Resume from a shared location such as `?q=luc.eth`
        #[arg(long)]
        resume: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "ensearch=info,ensearch_client=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let client = ClientBuilder::new(&args.api_url)
        .social_url(&args.social_url)
        .build()?;

    match args.command {
        Cmd::Search { term } => {
            let results = client.search(&term).await?;
            if results.is_empty() {
                println!("No results for \"{term}\"");
            }
            for profile in &results {
                print_profile(profile);
            }
        }
        Cmd::Resolve { identifier } => {
            tracing::debug!(kind = ?classify(&identifier).kind, "Resolving");
            let (profile, stats) = tokio::join!(
                client.profile(&identifier),
                client.social_stats(&identifier)
            );
            print_profile(&profile?);
            if let Some(stats) = stats {
                println!("  followers: {}  following: {}", stats.followers, stats.following);
            }
        }
        Cmd::Bulk { queries } => {
            let response = client.bulk_universal(&queries).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Cmd::Watch { resume } => watch(client, resume).await?,
    }

    Ok(())
}

async fn watch(client: ensearch_client::ResolutionClient, resume: Option<String>) -> Result<()> {
    let (handle, task) = Orchestrator::spawn(Arc::new(client), OrchestratorConfig::default());
    let mut states = handle.subscribe();

    if let Some(query) = resume.as_deref().and_then(ensearch_client::query_from_location) {
        handle.input(query);
    }

    let printer = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            print_state(&state);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        handle.input(line);
    }

    drop(handle);
    task.await?;
    printer.await?;
    Ok(())
}

fn print_state(state: &SearchState) {
    let query = state.settled.as_deref().unwrap_or_default();
    match &state.phase {
        SearchPhase::Idle => println!("Enter a search term to find profiles"),
        SearchPhase::Debouncing | SearchPhase::Searching => {}
        SearchPhase::HasResults(results) => results.iter().for_each(print_profile),
        SearchPhase::HasResultsWithSuggestedMatch { results, point } => {
            results.iter().for_each(print_profile);
            if let PointLookup::Found(profile) = point {
                println!("Direct match:");
                print_profile(profile);
            }
        }
        SearchPhase::NoResultsFallback(PointLookup::Pending) => {
            println!("Looking up profile directly...")
        }
        SearchPhase::NoResultsFallback(PointLookup::Found(profile)) => {
            println!("No search results found, but we found this profile:");
            print_profile(profile);
        }
        SearchPhase::NoResultsFallback(_) => println!("No profile found for \"{query}\""),
        SearchPhase::NoResultsTerminal => println!("No results for \"{query}\""),
        SearchPhase::Failed(error) => println!("Error: {error}"),
    }

    if let Some(suggestion) = &state.suggestion {
        println!("Did you mean {suggestion}?");
    }
}

fn print_profile(profile: &Profile) {
    println!(
        "{}  {}",
        profile.display_name(),
        profile.address.as_deref().unwrap_or("-")
    );
    if let Some(description) = &profile.records.description {
        println!("  {description}");
    }
    for (chain, address) in &profile.chains {
        println!("  {chain}: {address}  ({})", ensearch_core::chain_icon_url(chain));
    }
}
