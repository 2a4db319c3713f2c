use anyhow::{Context, Result as AnyhowResult};
use clap::{Parser, ValueEnum};
use dagview::app::{display_solve_status, DisplayMode};
use dagview::config::Config;
use dagview::services::status_reader::{CancelToken, JsonLinesReader};
use dagview::services::terminal_modes;
use dagview::services::tracing_setup;
use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal};
use std::path::PathBuf;

/// Live progress display for build/solve graphs
#[derive(Parser, Debug)]
#[command(name = "dagview")]
#[command(about = "Render a stream of solve status batches as a live progress display", long_about = None)]
#[command(version)]
struct Args {
    /// JSON lines of solve status batches (default: stdin)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output mode
    #[arg(long, value_enum, default_value_t = Mode::Auto)]
    mode: Mode,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Path to log file for diagnostics (default: system temp dir)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Full-screen when stdout is a terminal, plain otherwise
    Auto,
    Tui,
    Plain,
}

impl Mode {
    fn resolve(self) -> DisplayMode {
        match self {
            Mode::Tui => DisplayMode::Tui,
            Mode::Plain => DisplayMode::Plain,
            Mode::Auto if io::stdout().is_terminal() => DisplayMode::Tui,
            Mode::Auto => DisplayMode::Plain,
        }
    }
}

fn load_config(args: &Args) -> AnyhowResult<Config> {
    match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn open_input(args: &Args) -> AnyhowResult<Box<dyn BufRead + Send>> {
    match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn main() -> AnyhowResult<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    if args.dump_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    let log_file = args
        .log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("dagview.log"));
    if let Err(e) = tracing_setup::init_global(&log_file) {
        eprintln!("Warning: could not open log file {}: {}", log_file.display(), e);
    }
    tracing::info!("dagview starting");

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        terminal_modes::emergency_cleanup();
        original_hook(panic);
    }));

    let cancel = CancelToken::new();
    let reader = JsonLinesReader::with_cancel(open_input(&args)?, cancel.clone());
    let interrupt = Box::new(move || cancel.cancel());

    let mode = args.mode.resolve();
    let mut stdout = io::stdout();
    let summary = display_solve_status(interrupt, &mut stdout, reader, mode, config)?;
    tracing::info!(
        "finished: {} vertices, errors: {}",
        summary.vertex_count,
        summary.has_errors
    );

    if summary.has_errors {
        std::process::exit(1);
    }
    Ok(())
}
