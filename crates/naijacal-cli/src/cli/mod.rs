//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use naijacal_core::{config, logging};

mod commands;

#[derive(Parser)]
#[command(name = "naijacal")]
#[command(version)]
#[command(about = "Log what you ate and get a calorie breakdown from NaijaCal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in with username and password
    Login {
        /// Username (prompted when omitted)
        #[arg(short, long)]
        username: Option<String>,

        /// Password (prompted when unset)
        #[arg(long, env = "NAIJACAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and log in with it
    Register {
        /// Username (prompted when omitted)
        #[arg(short, long)]
        username: Option<String>,

        /// Optional email stored with the account
        #[arg(long)]
        email: Option<String>,

        /// Password (prompted when unset)
        #[arg(long, env = "NAIJACAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Log out and forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Parse a food log and show the calorie breakdown
    Parse {
        /// Food log text (reads stdin when neither TEXT nor --file is given)
        #[arg(value_name = "TEXT", conflicts_with = "file")]
        text: Option<String>,

        /// Read the food log from a file
        #[arg(short, long, value_name = "PATH")]
        file: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = config::Config::load().context("load config")?;
    logging::init(&config);

    match cli.command {
        Commands::Login { username, password } => {
            commands::auth::login(&config, username, password).await
        }
        Commands::Register {
            username,
            email,
            password,
        } => commands::auth::register(&config, username, email, password).await,
        Commands::Logout => commands::auth::logout(&config),
        Commands::Whoami => commands::auth::whoami(&config).await,
        Commands::Parse { text, file } => commands::parse::run(&config, text, file).await,
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
