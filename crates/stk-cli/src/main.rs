use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

mod commands;

use stk_config::EngineConfig;

#[derive(Parser)]
#[command(name = "stk")]
#[command(about = "Option-level stock reconciliation tools", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (later overrides earlier)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a target total across options proportionally
    Distribute {
        /// New aggregate total
        #[arg(long)]
        target: i64,

        /// Current quantities as `option_id=quantity`, in group order
        #[arg(required = true)]
        current: Vec<String>,
    },

    /// Validate proposed option quantities against an item snapshot (JSON file)
    Validate {
        /// Item snapshot JSON (as returned by GetItem)
        #[arg(long)]
        item: String,

        /// Proposed value as `option_id=value`; raw text is validated as typed
        #[arg(long = "set", required = true)]
        set: Vec<String>,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Audit log utilities
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },

    /// Menu item commands against the configured backend
    Item {
        #[command(subcommand)]
        cmd: ItemCmd,
    },
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Merge menu-item and option audit logs (JSONL), newest first
    Merge {
        #[arg(long = "menu-item")]
        menu_item: String,

        #[arg(long)]
        option: String,
    },
}

#[derive(Subcommand)]
enum ItemCmd {
    /// Print the item, its stock mode and aggregate drift
    Show {
        #[arg(long)]
        id: String,
    },

    /// Set the aggregate stock; redistributes under option-level tracking
    Adjust {
        #[arg(long)]
        id: String,

        #[arg(long)]
        total: i64,

        #[arg(long)]
        reason: Option<String>,
    },

    /// Redistribute the current aggregate across the tracked group
    Sync {
        #[arg(long)]
        id: String,

        #[arg(long)]
        reason: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Dev convenience; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();
    let cfg = commands::load_engine_config(&cli.config_paths)?;
    init_tracing(&cfg);
    debug!(layers = cli.config_paths.len(), "config loaded");

    match cli.cmd {
        Commands::Distribute { target, current } => commands::offline::distribute(target, &current),
        Commands::Validate { item, set } => commands::offline::validate(&cfg, &item, &set),
        Commands::ConfigHash { paths } => commands::offline::config_hash(&paths),
        Commands::Audit { cmd } => match cmd {
            AuditCmd::Merge { menu_item, option } => {
                commands::offline::audit_merge(&menu_item, &option)
            }
        },
        Commands::Item { cmd } => match cmd {
            ItemCmd::Show { id } => commands::item::show(&cfg, &id).await,
            ItemCmd::Adjust { id, total, reason } => {
                commands::item::adjust(&cfg, &id, total, reason.as_deref()).await
            }
            ItemCmd::Sync { id, reason } => {
                commands::item::sync(&cfg, &id, reason.as_deref()).await
            }
        },
    }
}

/// `RUST_LOG` wins; otherwise the configured filter. Logs go to stderr so
/// command output on stdout stays machine-readable.
fn init_tracing(cfg: &EngineConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
