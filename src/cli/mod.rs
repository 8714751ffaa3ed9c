use clap::{Parser, Subcommand};
use exedao::governance::ActionKind;
use std::path::{Path, PathBuf};

pub mod config;
pub mod context;
pub mod init;
pub mod logging;
pub mod query;
pub mod submit;
pub mod version;

use config::default_config_path;
use context::Context;

#[derive(Parser)]
#[command(name = "exedao")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for the exedao policy engine", long_about = None)]
pub struct Cli {
    /// Path to config file (default: ~/.local/share/exedao/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the state snapshot from the [genesis] config section
    Init {
        /// Overwrite an existing state snapshot
        #[arg(long)]
        force: bool,
    },

    /// Submit or endorse minting shares to a member
    Mint {
        /// Recipient (64 hex characters or a label)
        #[arg(long)]
        member: String,

        /// Shares to mint
        #[arg(long)]
        amount: u64,

        /// Submitting member (64 hex characters or a label)
        #[arg(long)]
        caller: String,
    },

    /// Submit or endorse changing an action's approval threshold
    SetRequirement {
        /// Governed action (mint-shares or set-approval-requirement)
        #[arg(long)]
        action: ActionKind,

        /// New threshold in percent (0-100)
        #[arg(long)]
        percent: u8,

        /// Submitting member (64 hex characters or a label)
        #[arg(long)]
        caller: String,
    },

    /// Show member shares and total
    Shares {
        /// Only show this member
        #[arg(long)]
        member: Option<String>,
    },

    /// Show approval requirements
    Requirements,

    /// List pending proposals
    Proposals {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the status of a payload hash
    Status {
        /// Payload hash (64 hex characters)
        #[arg(long)]
        payload: String,
    },

    /// Show executed actions
    History {
        /// Maximum entries to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Remove expired proposals
    Prune,

    /// Display version information
    Version,
}

pub fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Version => {
            version::execute();
            Ok(())
        }
        Commands::Init { force } => init::execute(&config_path, force),
        Commands::Mint {
            member,
            amount,
            caller,
        } => submit::mint(&open(&config_path)?, &member, amount, &caller),
        Commands::SetRequirement {
            action,
            percent,
            caller,
        } => submit::set_requirement(&open(&config_path)?, action, percent, &caller),
        Commands::Shares { member } => query::shares(&open(&config_path)?, member.as_deref()),
        Commands::Requirements => query::requirements(&open(&config_path)?),
        Commands::Proposals { json } => query::proposals(&open(&config_path)?, json),
        Commands::Status { payload } => query::status(&open(&config_path)?, &payload),
        Commands::History { limit } => query::history(&open(&config_path)?, limit),
        Commands::Prune => query::prune(&open(&config_path)?),
    }
}

/// Load config and install logging for commands that need existing state.
fn open(config_path: &Path) -> Result<Context, Box<dyn std::error::Error>> {
    let ctx = Context::load(config_path)?;
    logging::init(&ctx.config.logging)?;
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_mint() {
        let cli = Cli::parse_from([
            "exedao", "mint", "--member", "acct1", "--amount", "49", "--caller", "acct0",
        ]);

        match cli.command {
            Commands::Mint {
                member,
                amount,
                caller,
            } => {
                assert_eq!(member, "acct1");
                assert_eq!(amount, 49);
                assert_eq!(caller, "acct0");
            }
            _ => panic!("Expected Mint command"),
        }
        assert_eq!(cli.config, None);
    }

    #[test]
    fn test_cli_parse_set_requirement() {
        let cli = Cli::parse_from([
            "exedao",
            "--config",
            "/etc/exedao/config.toml",
            "set-requirement",
            "--action",
            "mint-shares",
            "--percent",
            "75",
            "--caller",
            "acct0",
        ]);

        match cli.command {
            Commands::SetRequirement {
                action,
                percent,
                caller,
            } => {
                assert_eq!(action, ActionKind::MintShares);
                assert_eq!(percent, 75);
                assert_eq!(caller, "acct0");
            }
            _ => panic!("Expected SetRequirement command"),
        }
        assert_eq!(cli.config, Some("/etc/exedao/config.toml".to_string()));
    }

    #[test]
    fn test_cli_rejects_unknown_action() {
        let result = Cli::try_parse_from([
            "exedao",
            "set-requirement",
            "--action",
            "burn-shares",
            "--percent",
            "10",
            "--caller",
            "acct0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_negative_amount() {
        let result = Cli::try_parse_from([
            "exedao", "mint", "--member", "a", "--amount", "-1", "--caller", "b",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_history_default_limit() {
        let cli = Cli::parse_from(["exedao", "history"]);
        match cli.command {
            Commands::History { limit } => assert_eq!(limit, 20),
            _ => panic!("Expected History command"),
        }
    }

    #[test]
    fn test_cli_parse_init_force() {
        let cli = Cli::parse_from(["exedao", "init", "--force"]);
        assert!(matches!(cli.command, Commands::Init { force: true }));
    }

    #[test]
    fn test_missing_config_reports_init() {
        let cli = Cli::parse_from([
            "exedao",
            "--config",
            "/nonexistent/exedao/config.toml",
            "requirements",
        ]);
        let err = execute(cli).unwrap_err();
        assert!(err.to_string().contains("exedao init"));
    }
}
