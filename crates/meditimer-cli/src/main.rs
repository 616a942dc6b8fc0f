use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod backends;
mod commands;

#[derive(Parser)]
#[command(name = "meditimer", version, about = "Meditation timer with bells and background audio")]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a meditation session
    Session(commands::session::SessionArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Background track library
    Tracks {
        #[command(subcommand)]
        action: commands::tracks::TracksAction,
    },
    /// Session logs and journaling
    Logs {
        #[command(subcommand)]
        action: commands::logs::LogsAction,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("meditimer=info")),
        1 => EnvFilter::new("meditimer=debug"),
        _ => EnvFilter::new("meditimer=trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Session(args) => commands::session::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Tracks { action } => commands::tracks::run(action),
        Commands::Logs { action } => commands::logs::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
