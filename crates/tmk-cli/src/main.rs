use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tmk")]
#[command(about = "Token market ledger tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> local...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Realized gain/loss per asset from a history file
    Gains {
        /// History file (.csv or .json)
        #[arg(long)]
        history: String,

        /// Only this asset (default: every asset in the file)
        #[arg(long)]
        asset: Option<String>,

        /// Layered config paths; supplies ledger policies
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Fail on malformed records instead of coercing them
        #[arg(long, default_value_t = false)]
        strict: bool,

        /// Fail when a sale exceeds the open quantity
        #[arg(long = "reject-oversell", default_value_t = false)]
        reject_oversell: bool,

        /// Mark price for unrealized gain/loss (requires --asset)
        #[arg(long, requires = "asset")]
        mark: Option<String>,

        /// Emit JSON instead of key=value lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Open lots of one asset, oldest first
    Lots {
        #[arg(long)]
        history: String,

        #[arg(long)]
        asset: String,

        /// Layered config paths; supplies ledger policies
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Fail on malformed records instead of coercing them
        #[arg(long, default_value_t = false)]
        strict: bool,

        /// Fail when a sale exceeds the open quantity
        #[arg(long = "reject-oversell", default_value_t = false)]
        reject_oversell: bool,
    },

    /// Current price of one asset via the pricing service
    Price {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        #[arg(long)]
        asset: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let loaded = tmk_config::load_layered_yaml(&paths[..])?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Gains {
            history,
            asset,
            config_paths,
            strict,
            reject_oversell,
            mark,
            json,
        } => {
            let opts = commands::replay_options(&config_paths, strict, reject_oversell)?;
            commands::gains::run(commands::gains::GainsArgs {
                history: &history,
                asset: asset.as_deref(),
                opts,
                mark: mark.as_deref(),
                json,
            })?;
        }

        Commands::Lots {
            history,
            asset,
            config_paths,
            strict,
            reject_oversell,
        } => {
            let opts = commands::replay_options(&config_paths, strict, reject_oversell)?;
            commands::gains::lots(&history, &asset, opts)?;
        }

        Commands::Price {
            config_paths,
            asset,
        } => {
            commands::price::run(&config_paths, &asset).await?;
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
