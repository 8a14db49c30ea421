use anyhow::Result;
use clap::Parser;
use deployrisk::cli::{Cli, Commands};
use deployrisk::commands::{self, ExplainCommand, GenerateCommand, ScoreCommand};
use tracing_subscriber::EnvFilter;

fn verbosity_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity_filter(cli.verbosity)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate {
            rows,
            out,
            seed,
            anchor_date,
        } => commands::generate_dataset(GenerateCommand {
            rows,
            out,
            seed,
            anchor_date,
        }),
        Commands::Train { config } => commands::train_model(&config),
        Commands::Score { config, top_k } => {
            commands::score_dataset(ScoreCommand { config, top_k })
        }
        Commands::Explain { config, k, repeats } => commands::explain_releases(ExplainCommand {
            config,
            k,
            repeats,
            quiet: cli.quiet,
        }),
        Commands::Init { force, path } => commands::init_config(&path, force),
    }
}
