//! Command-line arguments

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use vaultporter_core::ConflictStrategy;

/// VaultPorter - move notes between Obsidian vaults without losing data
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "VAULTPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true, action = clap::ArgAction::SetTrue)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan conventional locations for vaults
    Discover {
        /// Register every vault found that is not registered yet
        #[arg(long)]
        add: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage registered vaults
    #[command(subcommand)]
    Vaults(VaultsCommand),

    /// Move (or copy) files into another vault
    Move(MoveArgs),

    /// Delete stale transfer backups
    Cleanup,
}

#[derive(Subcommand, Debug)]
pub enum VaultsCommand {
    /// List registered vaults
    List {
        #[arg(long)]
        json: bool,
    },

    /// Register a vault
    Add {
        /// Display name
        name: String,

        /// Vault root (`~` is expanded)
        path: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        color: Option<String>,

        /// Register even if the directory is not a vault
        #[arg(long)]
        force: bool,
    },

    /// Unregister a vault (files are untouched)
    Remove {
        /// Vault id or name
        vault: String,
    },

    /// Re-validate registered vaults
    Validate {
        /// Vault id or name (all vaults when omitted)
        vault: Option<String>,
    },

    /// List folders inside a vault
    Folders {
        /// Vault id or name
        vault: String,
    },
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Files to transfer, relative to the source vault root
    #[arg(required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Source vault root
    #[arg(long, default_value = ".")]
    pub from: String,

    /// Target vault id or name (last used vault when omitted)
    #[arg(long)]
    pub to: Option<String>,

    /// Vault-rooted target folder
    #[arg(long, default_value = "/")]
    pub folder: String,

    /// Keep the source file
    #[arg(long)]
    pub copy: bool,

    /// What to do when the target already exists
    #[arg(long)]
    pub strategy: Option<ConflictStrategy>,

    /// Do not copy timestamps onto the target
    #[arg(long)]
    pub no_preserve_metadata: bool,

    /// Do not print per-stage progress
    #[arg(long)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_move() {
        let cli = Cli::parse_from([
            "vaultporter",
            "move",
            "Inbox/Draft.md",
            "--from",
            "~/Work",
            "--to",
            "Archive",
            "--folder",
            "/Inbox",
            "--strategy",
            "skip",
            "--copy",
        ]);

        let Command::Move(args) = cli.command else {
            panic!("expected move");
        };
        assert_eq!(args.files, vec![PathBuf::from("Inbox/Draft.md")]);
        assert_eq!(args.to.as_deref(), Some("Archive"));
        assert_eq!(args.strategy, Some(ConflictStrategy::Skip));
        assert!(args.copy);
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["vaultporter", "vaults", "list", "--verbose", "--log-format", "json"]);
        assert!(cli.verbose);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(matches!(
            cli.command,
            Command::Vaults(VaultsCommand::List { json: false })
        ));
    }
}
