//! waka-hook: CLI front end for editor activity heartbeats.
//!
//! Hosts that would rather shell out than link `waka-core` call this binary
//! once per editor event. It is also the diagnosis tool for humans.
//!
//! ## Subcommands
//!
//! - `heartbeat`: Send one heartbeat through the helper (always exits 0)
//! - `events`: Route JSON editor events from stdin, one per line
//! - `install`: Download the helper if it isn't installed yet
//! - `status`: Report helper and config state
//! - `config show|set`: Inspect or edit `~/.wakatime.cfg`
//! - `configure`: Interactive settings prompt

mod commands;
mod logging;
mod terminal_ui;

use clap::{Parser, Subcommand, ValueEnum};
use waka_core::{Category, EntityType};

#[derive(Parser)]
#[command(name = "waka-hook")]
#[command(about = "Editor activity tracker for wakatime-cli")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one heartbeat and wait for the helper
    Heartbeat(commands::HeartbeatArgs),

    /// Route editor events (one JSON object per line on stdin) until EOF
    Events(commands::ProjectArgs),

    /// Install the helper executable if it is missing
    Install,

    /// Show helper and config status
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or edit the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Prompt for the API key and URL on the terminal
    Configure,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current settings (API key masked)
    Show {
        #[arg(long)]
        json: bool,
    },

    /// Update one or both settings, keeping everything else in the file
    Set {
        #[arg(long)]
        api_key: Option<String>,

        /// Empty string removes the `api_url` line
        #[arg(long)]
        api_url: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CategoryArg {
    Coding,
    Designing,
    Debugging,
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Coding => Category::Coding,
            CategoryArg::Designing => Category::Designing,
            CategoryArg::Debugging => Category::Debugging,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum EntityTypeArg {
    File,
    App,
}

impl From<EntityTypeArg> for EntityType {
    fn from(arg: EntityTypeArg) -> Self {
        match arg {
            EntityTypeArg::File => EntityType::File,
            EntityTypeArg::App => EntityType::App,
        }
    }
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Heartbeat(args) => {
            // Heartbeats are best-effort - log failures but exit 0 so hosts never stall
            if let Err(e) = commands::heartbeat(args) {
                tracing::warn!(error = %e, "waka-hook heartbeat failed");
            }
            Ok(())
        }
        Commands::Events(project) => {
            if let Err(e) = commands::events(project) {
                tracing::warn!(error = %e, "waka-hook events failed");
            }
            Ok(())
        }
        Commands::Install => commands::install(),
        Commands::Status { json } => commands::status(json),
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => commands::config_show(json),
            ConfigAction::Set { api_key, api_url } => commands::config_set(api_key, api_url),
        },
        Commands::Configure => commands::configure(),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "waka-hook command failed");
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_heartbeat() {
        let cli = Cli::try_parse_from([
            "waka-hook",
            "heartbeat",
            "--category",
            "designing",
            "--entity-type",
            "app",
            "--entity",
            "Unreal Editor",
            "--project",
            "Arena",
            "--write",
        ])
        .unwrap();

        match cli.command {
            Commands::Heartbeat(args) => {
                assert!(matches!(args.category, CategoryArg::Designing));
                assert!(args.write);
                assert_eq!(args.project.project.as_deref(), Some("Arena"));
            }
            _ => panic!("expected heartbeat"),
        }
    }

    #[test]
    fn test_cli_parses_events_with_project() {
        let cli = Cli::try_parse_from([
            "waka-hook",
            "events",
            "--project-folder",
            "/work/arena",
            "--timeout-secs",
            "10",
        ])
        .unwrap();

        match cli.command {
            Commands::Events(project) => {
                assert_eq!(project.project_folder.as_deref(), Some("/work/arena"));
                assert_eq!(project.timeout_secs, 10);
            }
            _ => panic!("expected events"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_category() {
        let result = Cli::try_parse_from([
            "waka-hook",
            "heartbeat",
            "--category",
            "browsing",
            "--entity-type",
            "app",
            "--entity",
            "x",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parses_config_set() {
        let cli =
            Cli::try_parse_from(["waka-hook", "config", "set", "--api-url", ""]).unwrap();
        match cli.command {
            Commands::Config {
                action: ConfigAction::Set { api_key, api_url },
            } => {
                assert!(api_key.is_none());
                assert_eq!(api_url.as_deref(), Some(""));
            }
            _ => panic!("expected config set"),
        }
    }
}
