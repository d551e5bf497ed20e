mod commands;
mod console;
mod output;
mod scenario;

use clap::{Parser, Subcommand};
use haven_core::config;
use miette::Result;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "haven")]
#[command(about = "Haven sensory overload companion")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the watchers against a scripted sensor scenario
    Simulate {
        /// Scenario file (TOML)
        scenario: PathBuf,

        /// How long to run, overriding the scenario
        #[arg(long)]
        duration: Option<u64>,

        /// Profile name for the session
        #[arg(long)]
        name: Option<String>,

        /// Send notifications to the log instead of the terminal
        #[arg(long)]
        headless: bool,

        /// Write the final session snapshot as JSON
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Record a manual check-in
    Checkin {
        /// calm, okay, overwhelmed, angry, sad or unknown
        mood: String,

        /// Free-form symptoms
        symptoms: Vec<String>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Save current configuration to file
    Save {
        /// Path to save configuration
        #[arg(default_value = "haven.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .rgb_colors(miette::RgbColors::Preferred)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))?;
    miette::set_panic_hook();
    let cli = Cli::parse();

    use tracing_subscriber::{EnvFilter, fmt};

    let filter = if cli.debug {
        EnvFilter::new("haven_core=debug,haven_cli=debug")
    } else {
        // Info for haven crates, warn for everything else
        EnvFilter::new("haven_core=info,haven_cli=info,warn")
    };

    fmt()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_timer(tracing_subscriber::fmt::time::LocalTime::rfc_3339())
        .compact()
        .init();

    let config = if let Some(config_path) = &cli.config {
        info!("Loading config from: {:?}", config_path);
        config::load_config(config_path).await?
    } else {
        info!("Loading config from standard locations");
        config::load_config_from_standard_locations().await?
    };

    match &cli.command {
        Commands::Simulate {
            scenario,
            duration,
            name,
            headless,
            export,
        } => {
            commands::simulate::run(
                &config,
                scenario,
                *duration,
                name.as_deref(),
                *headless,
                export.as_deref(),
            )
            .await?
        }
        Commands::Checkin { mood, symptoms } => {
            commands::checkin::record(&config, mood, symptoms.clone())?
        }
        Commands::Config { cmd } => match cmd {
            ConfigCommands::Show => commands::config::show(&config).await?,
            ConfigCommands::Save { path } => commands::config::save(&config, path).await?,
        },
    }

    Ok(())
}
