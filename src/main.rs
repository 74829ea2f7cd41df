use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use crossbeam_channel::bounded;

use semaphore_speller::{
    config::SpellerConfig,
    pipeline::{parse_replay, script_frames, start_replay, start_speller, write_replay},
    types::{SpellerUpdate, Symbol, UpdateReason},
    word::WordBreakPolicy,
};

#[derive(Parser)]
#[command(
    name = "semaphore-speller",
    about = "Spell words with flag-semaphore arm poses",
    version
)]
struct Cli {
    /// Enable debug logging (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded joint frames through the speller
    Replay {
        /// JSON-lines file with one frame per line
        path: PathBuf,

        /// How long a pose must be held before its letter is confirmed
        #[arg(long, default_value = "3000")]
        hold_ms: u64,

        /// What the word break pose does to the word
        #[arg(long, value_enum, default_value_t = WordBreakPolicy::AppendSpace)]
        word_break: WordBreakPolicy,
    },

    /// Write a replay that spells TEXT (space = word break, '-' = reset)
    Script {
        text: String,

        /// Pose hold time the script is timed for
        #[arg(long, default_value = "3000")]
        hold_ms: u64,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Replay {
            path,
            hold_ms,
            word_break,
        } => {
            let config = SpellerConfig::default()
                .with_hold_duration(Duration::from_millis(hold_ms))
                .with_word_break(word_break);
            run_replay(path, config)
        }
        Commands::Script {
            text,
            hold_ms,
            output,
        } => run_script(&text, Duration::from_millis(hold_ms), output),
    }
}

fn run_replay(path: PathBuf, config: SpellerConfig) -> Result<()> {
    let file =
        File::open(&path).with_context(|| format!("failed to open replay {}", path.display()))?;
    let frames = parse_replay(BufReader::new(file))
        .with_context(|| format!("failed to parse replay {}", path.display()))?;

    let (frame_tx, frame_rx) = bounded(4);
    let (update_tx, update_rx) = bounded(64);

    let speller = start_speller(config, frame_rx, update_tx);
    let replay = start_replay(frames, frame_tx);

    let mut shown = Symbol::None;
    let mut last: Option<SpellerUpdate> = None;
    for update in update_rx.iter() {
        if let Some(committed) = update.committed {
            let via = match update.reason {
                UpdateReason::Frame => "frame",
                UpdateReason::HoldElapsed => "timer",
            };
            println!(
                "+ {:<9}  {}  ({via})",
                committed.label(),
                update.display_text()
            );
        } else if update.symbol != shown {
            println!("  {}", update.display_text());
        }
        shown = update.symbol;
        last = Some(update);
    }

    replay.wait();
    speller
        .join()
        .map_err(|_| anyhow!("speller thread panicked"))?;

    match last {
        Some(update) => {
            for word in update.completed_words.iter() {
                println!("completed: {word}");
            }
            println!("word: \"{}\"", update.word);
        }
        None => println!("replay contained no frames"),
    }

    Ok(())
}

fn run_script(text: &str, hold: Duration, output: Option<PathBuf>) -> Result<()> {
    let frames = script_frames(text, hold).context("failed to script replay")?;

    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_replay(&frames, BufWriter::new(file))
                .with_context(|| format!("failed to write {}", path.display()))?;
            log::info!("wrote {} frames to {}", frames.len(), path.display());
        }
        None => write_replay(&frames, std::io::stdout().lock())?,
    }

    Ok(())
}
