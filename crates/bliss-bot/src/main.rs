mod console;
mod scheduler;

use std::path::PathBuf;

use bliss_core::{Assistant, BotConfig, ChatKind, Command, Invocation, RefreshOutcome};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

#[derive(Parser)]
#[command(name = "bliss-bot", version, about = "BlissROMs build lookup bot")]
struct Cli {
    /// Config file (defaults to $BLISS_BOT_CONFIG or the state dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the refresh scheduler with an interactive console
    Serve {
        /// User id the console acts as
        #[arg(long, default_value_t = 0)]
        user_id: i64,
        /// Act as a member of this group chat instead of a private chat
        #[arg(long)]
        group: Option<i64>,
        /// Only run the scheduler
        #[arg(long)]
        headless: bool,
    },
    /// Print the cached device list
    List,
    /// Show the build menu for a device
    Lookup { codename: String },
    /// Follow a callback token as if its button was pressed
    Press { token: String },
    /// Refresh the device catalog now
    Refresh,
    /// Config file helpers
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },
}

#[derive(Subcommand)]
enum ConfigCmd {
    /// Write the effective config to the config path
    Init {
        #[arg(long)]
        force: bool,
    },
}

fn load_config(
    path: Option<&PathBuf>,
    required: bool,
) -> Result<BotConfig, bliss_core::ConfigError> {
    match path {
        Some(path) => {
            let mut cfg = BotConfig::from_file(path, required)?;
            cfg.apply_overrides(bliss_util::env_var);
            Ok(cfg)
        }
        None => BotConfig::load(),
    }
}

fn local_invocation(user_id: i64) -> Invocation {
    Invocation {
        user_id,
        chat_id: user_id,
        chat: ChatKind::Private,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    bliss_util::init_tracing()?;
    let cli = Cli::parse();
    // `config init` may target a file that does not exist yet.
    let required = !matches!(cli.cmd, Cmd::Config { .. });
    let cfg = load_config(cli.config.as_ref(), required)?;

    match cli.cmd {
        Cmd::Config {
            cmd: ConfigCmd::Init { force },
        } => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(bliss_core::config::default_config_path);
            if path.exists() && !force {
                return Err(format!("{} exists; pass --force to overwrite", path.display()).into());
            }
            cfg.save(&path)?;
            println!("Wrote {}", path.display());
        }
        Cmd::Refresh => {
            let assistant = Assistant::from_config(&cfg)?;
            match assistant.cache().refresh().await? {
                RefreshOutcome::Replaced => println!(
                    "Catalog updated at {}",
                    assistant.cache().snapshot_path().display()
                ),
                RefreshOutcome::Unchanged => println!("Catalog already up to date"),
            }
        }
        Cmd::List => {
            let assistant = Assistant::from_config(&cfg)?;
            let reply = assistant
                .handle_command(&local_invocation(0), Command::List)
                .await;
            println!("{}", console::format_reply(&reply));
        }
        Cmd::Lookup { codename } => {
            let assistant = Assistant::from_config(&cfg)?;
            let reply = assistant
                .handle_command(
                    &local_invocation(0),
                    Command::Bliss {
                        codename: Some(codename),
                    },
                )
                .await;
            println!("{}", console::format_reply(&reply));
        }
        Cmd::Press { token } => {
            let assistant = Assistant::from_config(&cfg)?;
            let outcome = assistant
                .handle_callback(&local_invocation(0), &token)
                .await;
            println!("{}", console::format_outcome(&outcome));
        }
        Cmd::Serve {
            user_id,
            group,
            headless,
        } => {
            let assistant = Assistant::from_config(&cfg)?;
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let refresher = scheduler::spawn_catalog_refresh(
                assistant.cache().clone(),
                cfg.refresh_interval(),
                shutdown_rx.clone(),
            );
            let invocation = match group {
                Some(chat_id) => Invocation {
                    user_id,
                    chat_id,
                    chat: ChatKind::Group,
                },
                None => local_invocation(user_id),
            };

            if headless {
                tokio::signal::ctrl_c().await?;
            } else {
                tokio::select! {
                    res = console::run_console(&assistant, invocation, shutdown_rx) => res?,
                    res = tokio::signal::ctrl_c() => res?,
                }
            }
            info!("Shutting down");
            let _ = shutdown_tx.send(true);
            refresher.await?;
        }
    }

    Ok(())
}
