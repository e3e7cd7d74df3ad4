//! # VaultPorter
//!
//! Command-line shell around the transfer engine: manage registered vaults,
//! discover new ones and move notes between them.
//!
//! ```text
//! vaultporter vaults add Archive ~/Vaults/Archive
//! vaultporter move Inbox/Draft.md --from ~/Vaults/Work --to Archive --folder /Inbox
//! ```
//!
//! Settings live in `$XDG_CONFIG_HOME/vaultporter/settings.yaml` (see
//! [`vaultporter_core::SettingsStore`]); `VAULTPORTER_*` environment
//! variables override them for a single run.

pub mod app;
pub mod cli;
pub mod logging;

pub use app::{App, load_effective};
pub use cli::{Cli, Command, LogFormat, MoveArgs, VaultsCommand};
