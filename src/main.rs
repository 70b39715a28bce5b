use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use kestrel_chess::{ChessPosition, Decision, DecisionSource, LineBook, PieceSquareEvaluator, Player};
use kestrel_search::{Position, SearchConfig, TerminalStatus};
use tracing::info;

/// Search a chess position, or play a game against itself.
#[derive(Debug, Parser)]
#[command(name = "kestrel", version)]
struct Cli {
    /// Position to search, as FEN. Defaults to the starting position.
    #[arg(long)]
    fen: Option<String>,

    /// Maximum iteration depth.
    #[arg(short, long, default_value_t = 8)]
    depth: u8,

    /// Time budget per move in milliseconds.
    #[arg(short, long)]
    movetime: Option<u64>,

    /// Node budget per move.
    #[arg(short, long)]
    nodes: Option<u64>,

    /// Transposition table size in megabytes.
    #[arg(long, default_value_t = 16)]
    hash: usize,

    /// Search without a transposition table.
    #[arg(long)]
    no_tt: bool,

    /// Worker threads for the root split; 1 keeps the search sequential.
    #[arg(short, long, default_value_t = 1)]
    threads: usize,

    /// Skip the opening book.
    #[arg(long)]
    no_book: bool,

    /// Play this many moves against itself instead of a single search.
    #[arg(long)]
    play: Option<u32>,
}

impl Cli {
    fn search_config(&self) -> SearchConfig {
        let mut config = SearchConfig::default()
            .with_depth(self.depth)
            .with_table_mb(self.hash)
            .with_threads(self.threads);
        if let Some(ms) = self.movetime {
            config = config.with_time(Duration::from_millis(ms));
        }
        if let Some(nodes) = self.nodes {
            config = config.with_nodes(nodes);
        }
        if self.no_tt {
            config = config.without_table();
        }
        config
    }
}

fn report(decision: &Decision) {
    match (&decision.source, &decision.search) {
        (DecisionSource::Search, Some(result)) => {
            let pv = result.pv.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ");
            let score = match result.mate_in() {
                Some(n) => format!("mate {n}"),
                None => format!("cp {}", result.score),
            };
            println!(
                "bestmove {} score {score} depth {} nodes {} time {}ms pv {pv}",
                decision.mv,
                result.depth,
                result.nodes,
                result.elapsed.as_millis()
            );
        }
        (source, _) => println!("bestmove {} ({source:?})", decision.mv),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut position = match &cli.fen {
        Some(fen) => ChessPosition::from_fen(fen)?,
        None => ChessPosition::startpos(),
    };

    let mut player = Player::new(cli.search_config(), PieceSquareEvaluator)?;
    if !cli.no_book {
        player = player.with_book(LineBook::standard()?);
    }
    info!(?player, "kestrel starting");

    let Some(moves) = cli.play else {
        let decision = player.choose_move(&position, &[])?;
        report(&decision);
        return Ok(());
    };

    if moves == 0 {
        bail!("--play needs at least one move");
    }

    let mut history = Vec::new();
    for ply in 0..moves {
        let status = position.terminal_status();
        if status != TerminalStatus::None {
            println!("game over after {ply} plies: {status:?}");
            return Ok(());
        }
        let decision = player
            .choose_move(&position, &history)
            .with_context(|| format!("choosing move {} in {position}", ply + 1))?;
        report(&decision);
        history.push(position.hash());
        position = position.apply(decision.mv)?;
    }

    println!("final position {position}");
    Ok(())
}
