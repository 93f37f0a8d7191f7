//! # Undercover CLI
//!
//! Runs "Who is the Undercover" games between LLM agents.
//!
//! Usage:
//!   undercover play [OPTIONS]
//!   undercover categories
//!   undercover pairs <CATEGORY>
//!   undercover check <PROVIDER:MODEL>
//!
//! Examples:
//!   undercover play --players 5 --model mock:offline --judge mock:offline
//!   undercover play --player openai:gpt-4o --player anthropic:Claude-3-Haiku \
//!       --player google:gemini-1.5-flash --judge openai:GPT-4o-mini --category Food
//!   undercover play --config game.json --output result.json --events events.jsonl
//!   undercover check anthropic:Claude-3-Haiku

mod offline;

use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use undercover_error::{Error, Result};
use undercover_game::{
    AgentSpec, ChannelSink, ConceptLibrary, ConceptSource, GameConfig, GameEngine, GameEvent,
    GameResult, Language, RetryConfig, Role, RoundPhase,
};
use undercover_llm::{ProviderConfig, ProviderRegistry, ProviderType};

#[derive(Parser)]
#[command(name = "undercover")]
#[command(author, version, about = "Who is the Undercover, played by language models")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory of <Category>.json concept files overlaying the built-in pairs
    #[arg(long, global = true)]
    concepts: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one game
    Play(PlayArgs),
    /// List concept categories
    Categories,
    /// List the concept pairs of a category
    Pairs {
        category: String,
    },
    /// Verify credentials and model name for a provider
    Check {
        /// Agent to test, as provider:model
        agent: AgentSpec,
    },
}

#[derive(Args)]
struct PlayArgs {
    /// JSON game config; other game flags are ignored when given
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of players when --player is not given
    #[arg(long, default_value = "5")]
    players: usize,

    /// Number of undercover players
    #[arg(long, default_value = "1")]
    undercover: usize,

    /// One player as provider:model; repeat for each player
    #[arg(long = "player")]
    player: Vec<AgentSpec>,

    /// provider:model used for every player when --player is not given
    #[arg(long, default_value = "mock:offline")]
    model: AgentSpec,

    /// One judge as provider:model; repeat for each judge
    #[arg(long = "judge")]
    judge: Vec<AgentSpec>,

    /// Concept category
    #[arg(long, default_value = "Animals")]
    category: String,

    /// Fixed pair index within the category (random otherwise)
    #[arg(long)]
    pair_index: Option<usize>,

    #[arg(long, default_value = "en")]
    language: Language,

    #[arg(long, default_value = "10")]
    max_rounds: u32,

    /// Hold a vote every N rounds
    #[arg(long, default_value = "1")]
    voting_every: u32,

    /// Judge average below which a speaker is eliminated
    #[arg(long, default_value = "0.5")]
    threshold: f64,

    /// Seed for roles, pair choice and fallback votes
    #[arg(long)]
    seed: Option<u64>,

    /// Per-call timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Write the final result as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write every event as one JSON line
    #[arg(long)]
    events: Option<PathBuf>,
}

fn load_library(dir: Option<&Path>, seed: Option<u64>) -> Result<ConceptLibrary> {
    let library = match dir {
        Some(dir) => ConceptLibrary::load_dir(dir)?,
        None => ConceptLibrary::builtin(),
    };
    Ok(match seed {
        Some(seed) => library.with_seed(seed),
        None => library,
    })
}

fn build_config(args: &PlayArgs, concepts: Option<&Path>) -> Result<GameConfig> {
    if let Some(path) = &args.config {
        return GameConfig::from_file(path);
    }

    let mut library = load_library(concepts, args.seed)?;
    let pair = match args.pair_index {
        Some(index) => library.pair_by_index(&args.category, index)?,
        None => library.get_pair(&args.category)?,
    };

    let players = if args.player.is_empty() {
        vec![args.model.clone(); args.players]
    } else {
        args.player.clone()
    };

    let mut config = GameConfig::new(pair, players, args.undercover)
        .with_judges(args.judge.clone())
        .with_max_rounds(args.max_rounds)
        .with_rounds_before_voting(args.voting_every)
        .with_threshold(args.threshold)
        .with_language(args.language)
        .with_retry(RetryConfig::default());
    if let Some(secs) = args.timeout {
        config = config.with_call_timeout(secs);
    }
    config.validate()?;
    Ok(config)
}

fn build_registry(config: &GameConfig) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::from_env()?;
    let wants_mock = config
        .players
        .iter()
        .chain(&config.judges)
        .any(|spec| spec.provider == ProviderType::Mock);
    if wants_mock {
        registry.register(ProviderType::Mock, offline::offline_chat());
    }
    Ok(registry)
}

fn open_writer(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| Error::from(e).with_context("path", path.display().to_string()))
}

fn print_event(event: &GameEvent) {
    match event {
        GameEvent::GameSetup {
            players,
            judges,
            concept_pair,
        } => {
            println!(
                "Words: \"{}\" vs \"{}\"",
                concept_pair.concept_a, concept_pair.concept_b
            );
            for p in players {
                println!(
                    "  Player {} ({}:{}) {} [{}]",
                    p.id, p.provider, p.model, p.role, p.concept
                );
            }
            for j in judges {
                println!("  {} ({}:{})", j.id, j.provider, j.model);
            }
        }
        GameEvent::GameStart { max_rounds, .. } => {
            println!("Game started, at most {} rounds", max_rounds);
        }
        GameEvent::RoundStart { round, phase } => {
            let label = match phase {
                RoundPhase::Statements => "statements",
                RoundPhase::Voting => "voting",
            };
            println!("\n=== Round {}: {} ===", round, label);
        }
        GameEvent::StatementGenerated { statement } => {
            println!("Player {}: \"{}\"", statement.player_id, statement.statement);
        }
        GameEvent::StatementEvaluated { scores, .. } => match scores.average {
            Some(avg) => println!("  score {:.2}", avg),
            None => println!("  no judge could score this"),
        },
        GameEvent::VoteGenerated {
            voter_id,
            voted_for,
            ..
        } => {
            println!("  Player {} -> Player {}", voter_id, voted_for);
        }
        GameEvent::PlayerEliminated { elimination } => {
            println!(
                "  Player {} eliminated ({}), was {}",
                elimination.player_id, elimination.cause, elimination.role
            );
        }
        GameEvent::Error {
            player_id, message, ..
        } => {
            eprintln!("  Player {} failed: {}", player_id, message);
        }
        GameEvent::GameEnd { winner, reason, .. } => {
            println!("\n=== {} win: {} ===", winner, reason);
        }
        GameEvent::PlayerTurn { .. } | GameEvent::RoundEnd { .. } => {}
    }
}

async fn play(args: PlayArgs, concepts: Option<PathBuf>) -> Result<()> {
    let config = build_config(&args, concepts.as_deref())?;
    let registry = build_registry(&config)?;

    let (sink, mut rx) = ChannelSink::new();
    let mut events_out = args.events.as_deref().map(open_writer).transpose()?;

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event);
            if let Some(out) = events_out.as_mut() {
                let written = serde_json::to_writer(&mut *out, &event)
                    .map_err(Error::from)
                    .and_then(|_| writeln!(out).map_err(Error::from));
                if let Err(e) = written {
                    log::warn!("failed to write event: {}", e);
                }
            }
        }
        if let Some(mut out) = events_out {
            if let Err(e) = out.flush() {
                log::warn!("failed to flush events: {}", e);
            }
        }
    });

    let mut engine = GameEngine::new(config, registry)?.with_sink(sink);
    if let Some(seed) = args.seed {
        engine = engine.with_seed(seed);
    }
    let outcome = engine.run().await;
    drop(engine);

    if let Err(e) = printer.await {
        log::warn!("event printer stopped: {}", e);
    }

    let result = outcome?;
    print_summary(&result);

    if let Some(path) = &args.output {
        let mut out = open_writer(path)?;
        serde_json::to_writer_pretty(&mut out, &result)?;
        writeln!(out)?;
        out.flush()?;
        println!("Result written to {}", path.display());
    }
    Ok(())
}

fn print_summary(result: &GameResult) {
    println!(
        "{} rounds, {} statements, {} eliminations",
        result.total_rounds,
        result.statements.len(),
        result.eliminations.len()
    );
    let undercover: Vec<String> = result
        .players
        .iter()
        .filter(|p| p.role == Role::Undercover)
        .map(|p| format!("Player {}", p.id))
        .collect();
    println!("Undercover: {}", undercover.join(", "));
}

fn list_categories(concepts: Option<&Path>) -> Result<()> {
    let library = load_library(concepts, None)?;
    for name in library.categories() {
        println!("{:<24} {} pairs", name, library.category_size(name)?);
    }
    Ok(())
}

fn list_pairs(category: &str, concepts: Option<&Path>) -> Result<()> {
    let library = load_library(concepts, None)?;
    for pair in library.all_pairs(category)? {
        println!(
            "{:>3}  {} / {}",
            pair.index.unwrap_or_default(),
            pair.concept_a,
            pair.concept_b
        );
    }
    Ok(())
}

async fn check(agent: &AgentSpec) -> Result<()> {
    let chat = match agent.provider {
        ProviderType::Mock => offline::offline_chat(),
        provider => {
            let config = ProviderConfig::from_env(provider).ok_or_else(|| {
                Error::config_invalid(format!(
                    "no API key for {}, set {}",
                    provider,
                    provider.key_vars().join(" or ")
                ))
            })?;
            ProviderRegistry::build(config)?
        }
    };

    chat.test_connection(&agent.model).await?;
    println!("{} is reachable", agent);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    let concepts = cli.concepts;
    let outcome = match cli.command {
        Commands::Play(args) => play(args, concepts).await,
        Commands::Categories => list_categories(concepts.as_deref()),
        Commands::Pairs { category } => list_pairs(&category, concepts.as_deref()),
        Commands::Check { agent } => check(&agent).await,
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> PlayArgs {
        let mut argv = vec!["undercover", "play"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Play(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_config_from_flags() {
        let args = parse(&[
            "--players",
            "6",
            "--undercover",
            "2",
            "--judge",
            "mock:judge",
            "--category",
            "Animals",
            "--pair-index",
            "1",
            "--language",
            "zh",
            "--timeout",
            "30",
        ]);
        let config = build_config(&args, None).unwrap();
        assert_eq!(config.player_count, 6);
        assert_eq!(config.undercover_count, 2);
        assert_eq!(config.concept_pair.concept_a, "shark");
        assert_eq!(config.language, Language::Zh);
        assert_eq!(config.call_timeout_secs, Some(30.0));
        assert_eq!(config.judges.len(), 1);
        assert!(config.players.iter().all(|p| p.provider == ProviderType::Mock));
    }

    #[test]
    fn test_explicit_players_win_over_count() {
        let args = parse(&[
            "--player",
            "openai:gpt-4o",
            "--player",
            "anthropic:Claude-3-Haiku",
            "--player",
            "gemini:gemini-1.5-flash",
        ]);
        let config = build_config(&args, None).unwrap();
        assert_eq!(config.player_count, 3);
        assert_eq!(config.players[2].provider, ProviderType::Google);
    }

    #[test]
    fn test_invalid_setup_is_rejected() {
        let args = parse(&["--players", "3", "--undercover", "3"]);
        assert!(build_config(&args, None).is_err());

        let args = parse(&["--category", "Planets"]);
        assert!(build_config(&args, None).is_err());
    }

    #[test]
    fn test_bad_agent_spec_fails_to_parse() {
        assert!(Cli::try_parse_from(["undercover", "play", "--player", "openai"]).is_err());
        assert!(Cli::try_parse_from(["undercover", "check", "acme:model"]).is_err());
    }

    #[tokio::test]
    async fn test_offline_game_runs_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("result.json");
        let events = dir.path().join("events.jsonl");

        let out = output.to_str().unwrap();
        let ev = events.to_str().unwrap();
        let args = parse(&[
            "--judge", "mock:judge", "--seed", "7", "--max-rounds", "3", "--output", out,
            "--events", ev,
        ]);
        play(args, None).await.unwrap();

        let result: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert!(result["totalRounds"].as_u64().unwrap() <= 3);

        let lines = std::fs::read_to_string(&events).unwrap();
        let first: serde_json::Value = serde_json::from_str(lines.lines().next().unwrap()).unwrap();
        let last: serde_json::Value = serde_json::from_str(lines.lines().last().unwrap()).unwrap();
        assert_eq!(first["type"], "gameSetup");
        assert_eq!(last["type"], "gameEnd");
    }
}
