//! Conflict resolution for occupied target paths.

use vaultporter_core::prelude::*;
use vaultporter_vault::VaultRegistry;

/// Decide where a transfer should write when `proposed` is already taken.
///
/// Returns `None` when the transfer should be abandoned. Only meaningful
/// when the proposed path exists; callers check that first.
///
/// | strategy | result |
/// |---|---|
/// | skip | `None` |
/// | overwrite | `proposed` unchanged |
/// | rename, ask | next free `name N.ext` |
pub async fn resolve_conflict(
    registry: &VaultRegistry,
    target_vault: &VaultConfig,
    proposed: &str,
    strategy: ConflictStrategy,
) -> Option<String> {
    match strategy {
        ConflictStrategy::Skip => {
            log::info!("Target {} exists, skipping", proposed);
            None
        }
        ConflictStrategy::Overwrite => {
            log::info!("Target {} exists, overwriting", proposed);
            Some(normalize_vault_path(proposed))
        }
        // No interactive prompt is wired in, so `ask` renames.
        ConflictStrategy::Rename | ConflictStrategy::Ask => {
            let renamed = registry.next_available_name(target_vault, proposed).await;
            log::info!("Target {} exists, renaming to {}", proposed, renamed);
            Some(renamed)
        }
    }
}
