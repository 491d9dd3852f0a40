//! # Foresight CLI
//!
//! Command-line interface for creating, predicting on and settling events in
//! a foresight prediction ledger persisted as a JSON snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use foresight_core::{
    attestation::generate_oracle_keys, utils::*, Address, Attestation, AttestationOracle,
    EventMetadata, EventView, Handles, Ledger, LedgerConfig, LedgerStore, NewEvent, OutcomeSpace,
    PredictionInput, ResolutionSpec, TxContext,
};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "foresight")]
#[command(about = "Deterministic prediction ledger with oracle-certified settlement")]
#[command(version)]
struct Cli {
    /// Ledger snapshot file
    #[arg(long, global = true, env = "FORESIGHT_STATE", default_value = "foresight-ledger.json")]
    state: PathBuf,

    /// Ledger config file (JSON), read once at genesis
    #[arg(long, global = true, env = "FORESIGHT_CONFIG", default_value = "foresight.json")]
    config: PathBuf,

    /// Caller address for mutating commands
    #[arg(long = "as", global = true, env = "FORESIGHT_CALLER")]
    caller: Option<String>,

    /// Operation timestamp (RFC 3339), defaults to now
    #[arg(long, global = true)]
    at: Option<String>,

    /// Print query results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new ledger owned by the given address
    Init {
        /// Owner address, fixed for the lifetime of the ledger
        #[arg(long)]
        owner: String,
        /// Oracle x-only public key (hex), overrides the config file
        #[arg(long)]
        oracle_pubkey: Option<String>,
    },
    /// Register a new event (owner only)
    CreateEvent {
        /// Event id, generated when omitted
        #[arg(long)]
        id: Option<String>,
        /// Resolution date (YYYY-MM-DD)
        #[arg(short, long)]
        deadline: String,
        /// Page the oracle reads to resolve the event
        #[arg(long, conflicts_with = "lookup")]
        url: Option<String>,
        /// Alternative lookup method
        #[arg(long, requires = "parameter")]
        lookup: Option<String>,
        /// Parameter for the lookup method
        #[arg(long)]
        parameter: Option<String>,
        #[arg(short, long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "General")]
        category: String,
        /// Comma-separated outcomes; omit for a yes/no event
        #[arg(short, long, value_delimiter = ',')]
        outcomes: Vec<String>,
    },
    /// Submit predictions for every tracked event, once
    Predict {
        #[arg(long)]
        discord: Option<String>,
        #[arg(long)]
        x: Option<String>,
        /// One pick per event in creation order: a label, `#N` for the Nth
        /// outcome, or `-` to leave the slot unset. Prompts interactively when omitted.
        #[arg(short, long = "pick")]
        picks: Vec<String>,
    },
    /// Generate an oracle key pair
    Keygen,
    /// Sign an outcome as the oracle
    Attest {
        /// Oracle secret key (hex)
        #[arg(long, env = "FORESIGHT_ORACLE_SECRET", hide_env_values = true)]
        secret: String,
        #[arg(long)]
        event: String,
        #[arg(long)]
        outcome: String,
        #[arg(long, default_value = "")]
        reason: String,
        /// Write the attestation here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Resolve an event from signed attestations (owner only)
    Resolve {
        event_id: String,
        /// Attestation files (JSON)
        #[arg(short, long = "attestation", required = true)]
        attestations: Vec<PathBuf>,
    },
    /// Finish settlements interrupted by a crash
    Recover,
    /// List all events
    Events,
    /// Show one event with every prediction on it
    Event { event_id: String },
    /// Show a participant's points
    Score { address: String },
    /// Show all scores
    Scores,
    /// Show scores ranked
    Leaderboard,
    /// Show one participant's predictions
    Participant { address: String },
    /// Export all participation
    Participation,
    /// Show the ledger owner
    Owner,
    /// Show the ledger state digest
    Digest,
    /// Generate a new event id
    GenerateId,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let store = LedgerStore::new(&cli.state);

    match &cli.command {
        Commands::Init {
            owner,
            oracle_pubkey,
        } => {
            if store.exists() {
                bail!("ledger already exists at {}", store.path().display());
            }
            let owner = Address::parse(owner)?;
            let mut config = LedgerConfig::load(&cli.config)
                .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
            if let Some(pubkey) = oracle_pubkey {
                foresight_core::attestation::parse_oracle_pubkey(pubkey)?;
                config.oracle_pubkey = Some(pubkey.clone());
            }

            let ledger = Ledger::genesis(owner, config);
            store.commit(&ledger, 0)?;

            println!("{}", "Ledger Created Successfully!".green().bold());
            println!("{}", "═".repeat(50).bright_black());
            println!("{}: {}", "Owner".yellow().bold(), ledger.owner());
            println!(
                "{}: {}",
                "Tracked Events".yellow().bold(),
                ledger.config().tracked_events
            );
            println!(
                "{}: {}",
                "Oracle PubKey".yellow().bold(),
                ledger.config().oracle_pubkey.as_deref().unwrap_or("(none)")
            );
            println!("{}: {}", "State File".yellow().bold(), store.path().display());
            println!("{}", "═".repeat(50).bright_black());
        }

        Commands::CreateEvent {
            id,
            deadline,
            url,
            lookup,
            parameter,
            title,
            description,
            category,
            outcomes,
        } => {
            let mut ledger = load(&store)?;
            let base = ledger.journal().len();
            let ctx = context(&cli)?;
            let resolution = match (url, lookup, parameter) {
                (Some(url), None, _) => ResolutionSpec::url(url.clone()),
                (None, Some(lookup), Some(parameter)) => {
                    ResolutionSpec::lookup(lookup.clone(), parameter.clone())
                }
                _ => bail!("either --url or --lookup with --parameter is required"),
            };
            let outcomes = if outcomes.is_empty() {
                OutcomeSpace::binary()
            } else {
                OutcomeSpace::multi(outcomes.iter().map(|o| o.trim().to_string()))
            };

            let new_event = NewEvent {
                id: id.clone().unwrap_or_else(generate_event_id),
                resolution_date: parse_date(deadline)?,
                resolution,
                metadata: EventMetadata {
                    title: title.clone(),
                    description: description.clone(),
                    category: category.clone(),
                },
                outcomes,
            };
            let view = {
                let event_id = ledger.create_event(&ctx, new_event)?.id.clone();
                ledger.event_detail(&event_id)?
            };
            store.commit(&ledger, base)?;

            println!("{}", "Event Created Successfully!".green().bold());
            print_event(&view);
        }

        Commands::Predict { discord, x, picks } => {
            let mut ledger = load(&store)?;
            let base = ledger.journal().len();
            let ctx = context(&cli)?;

            let (handles, predictions) = if picks.is_empty() {
                prompt_predictions(&ledger)?
            } else {
                (
                    Handles::new(discord.clone(), x.clone()),
                    picks
                        .iter()
                        .enumerate()
                        .map(|(slot, pick)| {
                            let event = ledger.registry().events().get(slot);
                            parse_pick(pick, event.map(|e| &e.outcomes))
                        })
                        .collect(),
                )
            };

            let slots = ledger.record_predictions(&ctx, handles, predictions)?.clone();
            store.commit(&ledger, base)?;

            println!("{}", "Predictions Recorded!".green().bold());
            for (event, slot) in ledger.registry().events().iter().zip(&slots) {
                let pick = slot
                    .and_then(|p| event.outcomes.label(p))
                    .unwrap_or("(unset)");
                println!("  {}: {}", event.id.yellow().bold(), pick.cyan());
            }
        }

        Commands::Keygen => {
            let (secret, pubkey) = generate_oracle_keys();
            println!("{}: {}", "Oracle Secret Key".red().bold(), secret);
            println!("{}: {}", "Oracle PubKey".green().bold(), pubkey.cyan());
            println!("{}", "Keep the secret key offline.".bright_black());
        }

        Commands::Attest {
            secret,
            event,
            outcome,
            reason,
            out,
        } => {
            let attestation = Attestation::sign(secret, event, outcome, reason)?;
            let json = serde_json::to_string_pretty(&attestation)?;
            match out {
                Some(path) => {
                    fs::write(path, json + "\n")
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!(
                        "{}: {}",
                        "Attestation written".green().bold(),
                        path.display()
                    );
                }
                None => println!("{json}"),
            }
        }

        Commands::Resolve {
            event_id,
            attestations,
        } => {
            let mut ledger = load(&store)?;
            let base = ledger.journal().len();
            let ctx = context(&cli)?;
            let pubkey = ledger
                .config()
                .oracle_pubkey
                .clone()
                .context("ledger has no oracle pubkey configured")?;

            let mut oracle = AttestationOracle::new(&pubkey)?;
            for path in attestations {
                oracle.add_attestation(read_attestation(path)?);
            }
            info!(event_id = %event_id, files = attestations.len(), "resolving from attestations");

            println!("{}", format!("Resolving {event_id}...").green().bold());
            let resolution = ledger.resolve(&ctx, event_id, &oracle).await?;
            store.commit(&ledger, base)?;

            println!("{}: {}", "Outcome".yellow().bold(), resolution.outcome.cyan());
            println!("{}: {}", "Reason".yellow().bold(), resolution.reason);
            println!(
                "{}: {}",
                "Points Awarded".yellow().bold(),
                resolution.credited.len()
            );
            for participant in &resolution.credited {
                println!("  {} {}", "+1".green(), participant);
            }
        }

        Commands::Recover => {
            let mut ledger: Ledger = serde_json::from_str(
                &fs::read_to_string(store.path())
                    .with_context(|| format!("Failed to read {}", store.path().display()))?,
            )?;
            let base = ledger.journal().len();
            let recovered = ledger.recover_settlements()?;
            store.commit(&ledger, base)?;

            if recovered.is_empty() {
                println!("{}", "All settlements complete.".green());
            }
            for (event_id, credited) in recovered {
                println!(
                    "{}: {} credited {}",
                    "Recovered".yellow().bold(),
                    event_id.cyan(),
                    credited.len()
                );
            }
        }

        Commands::Events => {
            let ledger = load(&store)?;
            let events = ledger.list_events();
            if cli.json {
                return print_json(&events);
            }
            if events.is_empty() {
                println!("{}", "No events yet.".bright_black());
            }
            for view in &events {
                print_event(view);
            }
        }

        Commands::Event { event_id } => {
            let ledger = load(&store)?;
            let view = ledger.event_detail(event_id)?;
            if cli.json {
                return print_json(&view);
            }
            print_event(&view);
            for (participant, prediction) in &view.users_bets {
                let label = view
                    .possible_outcomes
                    .get(*prediction)
                    .map(String::as_str)
                    .unwrap_or("?");
                let points = view.users_points.get(participant).copied().unwrap_or(0);
                println!("  {} → {} ({} pt)", participant, label.cyan(), points);
            }
        }

        Commands::Score { address } => {
            let ledger = load(&store)?;
            let address = Address::parse(address)?;
            let points = ledger.score_of(&address);
            if cli.json {
                return print_json(&points);
            }
            println!("{}: {}", address.to_string().cyan(), points.to_string().yellow());
        }

        Commands::Scores => {
            let ledger = load(&store)?;
            let scores = ledger.all_scores();
            if cli.json {
                return print_json(&scores);
            }
            for (address, points) in &scores {
                println!("{}: {}", address.to_string().cyan(), points);
            }
        }

        Commands::Leaderboard => {
            let ledger = load(&store)?;
            let board = ledger.leaderboard();
            if cli.json {
                return print_json(&board);
            }
            println!("{}", "Leaderboard".green().bold());
            println!("{}", "═".repeat(50).bright_black());
            for (rank, entry) in board.iter().enumerate() {
                println!(
                    "{:>3}. {} {}",
                    rank + 1,
                    entry.address.to_string().cyan(),
                    entry.points.to_string().yellow().bold()
                );
            }
        }

        Commands::Participant { address } => {
            let ledger = load(&store)?;
            let address = Address::parse(address)?;
            let view = ledger
                .participant(&address)
                .with_context(|| format!("{address} has not participated"))?;
            if cli.json {
                return print_json(&view);
            }
            println!("{}: {}", "Participant".yellow().bold(), view.address);
            println!(
                "{}: {} / {}",
                "Handles".yellow().bold(),
                view.handles.discord.as_deref().unwrap_or("-"),
                view.handles.x.as_deref().unwrap_or("-")
            );
            for slot in &view.slots {
                let status = match (&slot.correct_outcome, slot.points_earned) {
                    (Some(_), 1) => "won".green(),
                    (Some(_), _) => "lost".red(),
                    (None, _) => "open".bright_black(),
                };
                println!(
                    "  {}: {} [{}]",
                    slot.event_id.yellow(),
                    slot.prediction_label.as_deref().unwrap_or("(unset)"),
                    status
                );
            }
            println!("{}: {}", "Total Points".yellow().bold(), view.total_points);
        }

        Commands::Participation => {
            let ledger = load(&store)?;
            print_json(&ledger.all_participation())?;
        }

        Commands::Owner => {
            let ledger = load(&store)?;
            println!("{}", ledger.owner_address());
        }

        Commands::Digest => {
            let ledger = load(&store)?;
            println!(
                "{}: {}",
                "State Digest".green().bold(),
                ledger.state_digest()?.cyan()
            );
        }

        Commands::GenerateId => {
            let id = generate_event_id();
            println!("{}: {}", "Generated Event ID".green().bold(), id.cyan());
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load(store: &LedgerStore) -> Result<Ledger> {
    if !store.exists() {
        bail!(
            "no ledger at {}, run `foresight init` first",
            store.path().display()
        );
    }
    debug!(path = %store.path().display(), "loading ledger");
    store
        .load()
        .with_context(|| format!("Failed to load ledger {}", store.path().display()))
}

/// Transaction context for a mutating command
fn context(cli: &Cli) -> Result<TxContext> {
    let caller = cli
        .caller
        .as_deref()
        .context("--as <address> (or FORESIGHT_CALLER) is required")?;
    let now = match &cli.at {
        Some(at) => parse_timestamp(at)?,
        None => Utc::now(),
    };
    Ok(TxContext::new(Address::parse(caller)?, now))
}

/// `-` leaves a slot unset and `#N` selects outcome `N` by position. Anything
/// else is a label when the event has one by that name, otherwise a bare
/// number falls back to a position.
fn parse_pick(pick: &str, outcomes: Option<&OutcomeSpace>) -> Option<PredictionInput> {
    let pick = pick.trim();
    if pick == "-" || pick.is_empty() {
        return None;
    }
    if let Some(index) = pick.strip_prefix('#').and_then(|n| n.trim().parse().ok()) {
        return Some(PredictionInput::Index(index));
    }
    if outcomes.is_some_and(|space| space.index_of(pick).is_some()) {
        return Some(PredictionInput::Label(pick.to_string()));
    }
    Some(match pick.parse::<usize>() {
        Ok(index) => PredictionInput::Index(index),
        Err(_) => PredictionInput::Label(pick.to_string()),
    })
}

fn prompt_predictions(ledger: &Ledger) -> Result<(Handles, Vec<Option<PredictionInput>>)> {
    let discord = inquire::Text::new("Discord handle:").prompt_skippable()?;
    let x = inquire::Text::new("X handle:").prompt_skippable()?;

    let mut predictions = Vec::with_capacity(ledger.registry().len());
    for event in ledger.registry().events() {
        let labels: Vec<String> = event.outcomes.labels().into_iter().map(String::from).collect();
        let prompt = format!("{} ({})", event.metadata.title, event.id);
        let choice = inquire::Select::new(&prompt, labels).prompt_skippable()?;
        predictions.push(choice.map(PredictionInput::Label));
    }

    Ok((Handles::new(discord, x), predictions))
}

fn read_attestation(path: &Path) -> Result<Attestation> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read attestation {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse attestation {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_event(view: &EventView) {
    let status = if view.has_resolved {
        format!(
            "Resolved - {}",
            view.certified_outcome.as_deref().unwrap_or("?")
        )
        .green()
    } else {
        "Open".yellow()
    };
    let criteria = match &view.resolution {
        ResolutionSpec::Url { url } => url.clone(),
        ResolutionSpec::Lookup { lookup, parameter } => format!("{lookup}({parameter})"),
    };

    println!("{}", "═".repeat(50).bright_black());
    println!("{}: {}", "Event ID".yellow().bold(), view.id.cyan());
    println!("{}: {}", "Title".yellow().bold(), view.title);
    if !view.description.is_empty() {
        println!("{}: {}", "Description".yellow().bold(), view.description);
    }
    println!("{}: {}", "Category".yellow().bold(), view.category);
    println!("{}: {}", "Outcomes".yellow().bold(), view.possible_outcomes.join(" | "));
    println!("{}: {}", "Resolution Date".yellow().bold(), view.resolution_date);
    println!("{}: {}", "Resolution".yellow().bold(), criteria);
    println!("{}: {}", "Status".yellow().bold(), status);
    if view.has_resolved && !view.reason.is_empty() {
        println!("{}: {}", "Reason".yellow().bold(), view.reason);
    }
    println!("{}: {}", "Predictions".yellow().bold(), view.users_bets.len());
}
