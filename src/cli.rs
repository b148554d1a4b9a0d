use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::agent::{describe_move, DecisionAgent};
use crate::config::{AgentConfig, VotingPolicy};
use crate::display::{castle_table, move_line, print_error, search_table, standings_table};
use crate::error::KingResult;
use crate::model::{MAX_PLAYERS, MIN_PLAYERS};
use crate::protocol::{
    available_characters, build_state, encode_move, parse_hand, parse_roster, parse_turn_snapshot,
};
use crate::rules::{apply_move, get_valid_moves, setup_game};

#[derive(Parser)]
#[command(name = "kingme", version = "1.0.0", about = "King Me! engine with a parallel MCTS player.")]
struct Cli {
    /// JSON file with search and voting settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log filter when RUST_LOG is unset (e.g. warn, debug, king_me=trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Voting {
    Search,
    Favorites,
    Heuristic,
}

impl From<Voting> for VotingPolicy {
    fn from(v: Voting) -> Self {
        match v {
            Voting::Search => VotingPolicy::Search,
            Voting::Favorites => VotingPolicy::Favorites,
            Voting::Heuristic => VotingPolicy::Heuristic,
        }
    }
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Search iterations per decision
    #[arg(short, long)]
    iterations: Option<usize>,
    /// Worker threads sharing one tree
    #[arg(short, long)]
    threads: Option<usize>,
    /// UCB1 exploration weight
    #[arg(short, long)]
    exploration: Option<f64>,
    /// Base RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
    /// Wall-clock budget per decision in milliseconds
    #[arg(long)]
    time_limit: Option<u64>,
    /// Voting policy
    #[arg(long)]
    voting: Option<Voting>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a full match with every seat driven by the search agent
    Play {
        /// Number of players (2-6)
        #[arg(short, long, default_value = "4")]
        players: usize,
        /// Print the castle after every move
        #[arg(long)]
        verbose: bool,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Suggest a move from server records
    Suggest {
        /// Turn snapshot file (header line + floor,code lines); `-` reads stdin
        snapshot: PathBuf,
        /// Roster file with id,name,score lines
        #[arg(short, long)]
        roster: PathBuf,
        /// Our hand of six character codes (e.g. ABCDEG)
        #[arg(long)]
        hand: String,
        /// Our server player id
        #[arg(long)]
        me: i64,
        /// Number of root moves to show
        #[arg(long, default_value = "8")]
        top: usize,
        #[command(flatten)]
        search: SearchArgs,
    },
}

pub fn run() {
    let cli = Cli::parse();
    dispatch(cli);
}

pub fn run_with_args(args: Vec<String>) {
    let cli = Cli::parse_from(args);
    dispatch(cli);
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // Only the first init in a process takes effect; later commands reuse it.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn dispatch(cli: Cli) {
    init_tracing(&cli.log_level);

    let result = match cli.command {
        Commands::Play { players, verbose, search } => {
            load_config(cli.config.as_deref(), &search)
                .and_then(|config| play_match(players, verbose, config))
        }
        Commands::Suggest { snapshot, roster, hand, me, top, search } => {
            load_config(cli.config.as_deref(), &search)
                .and_then(|config| suggest(&snapshot, &roster, &hand, me, top, config))
        }
    };

    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>, args: &SearchArgs) -> KingResult<AgentConfig> {
    let mut config = match path {
        Some(path) => AgentConfig::load(path)?,
        None => AgentConfig::default(),
    };
    if let Some(iterations) = args.iterations {
        config.search.iterations = iterations;
    }
    if let Some(threads) = args.threads {
        config.search.threads = threads;
    }
    if let Some(exploration) = args.exploration {
        config.search.exploration = exploration;
    }
    if args.seed.is_some() {
        config.search.seed = args.seed;
    }
    if args.time_limit.is_some() {
        config.search.time_limit_ms = args.time_limit;
    }
    if let Some(voting) = args.voting {
        config.voting = voting.into();
    }
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// play
// ---------------------------------------------------------------------------

fn play_match(num_players: usize, verbose: bool, config: AgentConfig) -> KingResult<()> {
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&num_players) {
        return Err(crate::error::KingError::InvalidConfiguration(format!(
            "players must be between {} and {}",
            MIN_PLAYERS, MAX_PLAYERS
        )));
    }

    let mut rng = match config.search.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut state = setup_game(num_players, &mut rng)?;
    let agents: Vec<DecisionAgent> = (0..num_players)
        .map(|seat| DecisionAgent::new(seat, config.clone()))
        .collect();

    println!();
    println!("  {} {}", "King Me!".bold(), "parallel MCTS self-play".dimmed());
    println!(
        "  Players: {} | Iterations: {} | Threads: {} | Voting: {}",
        num_players,
        config.search.iterations,
        config.search.threads,
        config.voting.as_str()
    );
    println!();

    let start = Instant::now();
    let mut last_round_phase = None;

    while !state.is_game_over() {
        if last_round_phase != Some((state.current_round, state.current_phase)) {
            println!(
                "  {} {} | {}",
                "Round".bold(),
                state.current_round,
                state.current_phase.to_string().cyan()
            );
            last_round_phase = Some((state.current_round, state.current_phase));
        }

        if get_valid_moves(&state).is_empty() {
            state.transition_to_next_phase();
            continue;
        }

        let seat = state.current_player_index;
        let Some(mv) = agents[seat].make_move(&state)? else {
            warn!(
                player = agents[seat].player_id(),
                phase = %state.current_phase,
                "agent found no move, forcing transition"
            );
            state.transition_to_next_phase();
            continue;
        };

        println!("{}", move_line(&state, seat, &mv));
        apply_move(&mut state, &mv)?;

        if verbose {
            println!("{}", castle_table(&state));
        }
    }

    let elapsed = start.elapsed();
    info!(elapsed_ms = elapsed.as_millis() as u64, "match finished");

    println!();
    println!("{}", castle_table(&state));
    println!();
    println!("{}", standings_table(&state));
    println!();
    println!("  Finished in {:.2}s", elapsed.as_secs_f64());
    Ok(())
}

// ---------------------------------------------------------------------------
// suggest
// ---------------------------------------------------------------------------

fn read_input(path: &Path) -> KingResult<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

fn suggest(
    snapshot_path: &Path,
    roster_path: &Path,
    hand: &str,
    me: i64,
    top: usize,
    config: AgentConfig,
) -> KingResult<()> {
    let snapshot = parse_turn_snapshot(&read_input(snapshot_path)?)?;
    let roster = parse_roster(&read_input(roster_path)?)?;
    let hand = parse_hand(hand)?;

    let mut rng = match config.search.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let (state, seat) = build_state(&snapshot, &roster, me, &hand, &mut rng)?;

    println!();
    println!("{}", castle_table(&state));
    let waiting: String = available_characters(&snapshot.board)
        .into_iter()
        .filter_map(crate::model::character_code)
        .collect();
    if !waiting.is_empty() {
        println!("  {} {}", "Not yet placed:".dimmed(), waiting);
    }
    println!();

    if state.current_player_index != seat {
        println!("  {}", "It is not our turn; suggesting for the current seat's position anyway.".yellow());
    }

    let decision = DecisionAgent::new(seat, config).decide(&state)?;
    if let Some(report) = &decision.report {
        println!("{}", search_table(report, &state, top));
        println!();
    }

    match decision.mv {
        Some(mv) => {
            println!("  {} {}", "Move:".bold(), encode_move(&mv).green().bold());
            println!("  {}", describe_move(&state, &mv));
        }
        None => println!("  {}", "No legal move: the phase must advance.".yellow()),
    }
    println!();
    Ok(())
}
