//! Command handlers for the shell.
//!
//! [`App`] owns the persisted settings, the registry built from them and a
//! transfer engine sharing that registry. Every command that changes the
//! registry writes the settings back before returning.

use crate::cli::{Command, MoveArgs, VaultsCommand};
use anyhow::{Context, Result, anyhow, bail};
use std::path::{Path, PathBuf};
use vaultporter_core::{
    MoveOptions, MoveResult, SettingsStore, TransferProgress, TransferSettings, VaultConfig,
    VaultConfigPatch, normalize_vault_path, to_json_string,
};
use vaultporter_transfer::{BatchProgress, ProgressCallback, TransferEngine};
use vaultporter_vault::{VaultDiscovery, VaultRegistry, expand_path};

/// Environment prefix for settings overrides, e.g.
/// `VAULTPORTER_DEFAULT_OPTIONS__CONFLICT_STRATEGY=skip`
pub const ENV_PREFIX: &str = "VAULTPORTER";

/// Load the settings file layered with `VAULTPORTER_*` environment overrides
pub fn load_effective(settings_file: &Path) -> Result<TransferSettings> {
    let layered = config::Config::builder()
        .add_source(
            config::File::from(settings_file)
                .format(config::FileFormat::Yaml)
                .required(false),
        )
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to load settings from {}", settings_file.display()))?;

    let settings: TransferSettings = layered
        .try_deserialize()
        .context("Invalid settings")?;
    settings.validate()?;
    Ok(settings)
}

pub struct App {
    store: SettingsStore,
    /// The persisted document; environment overrides never leak into it
    settings: TransferSettings,
    defaults: MoveOptions,
    registry: VaultRegistry,
    engine: TransferEngine,
    discovery_roots: Option<Vec<PathBuf>>,
}

impl App {
    /// Open the settings at `config`, or the platform default location
    pub async fn open(config: Option<PathBuf>) -> Result<Self> {
        let store = match config {
            Some(file) => SettingsStore::at(expand_path(&file.to_string_lossy())),
            None => SettingsStore::init().await?,
        };

        let settings = store.load().await?;
        let effective = load_effective(store.settings_file())?;
        log::debug!(
            "Loaded {} vaults from {}",
            settings.vaults.len(),
            store.settings_file().display()
        );

        let registry = VaultRegistry::from_settings(&settings);
        let engine = TransferEngine::new(registry.clone()).with_settings(&effective);

        Ok(Self {
            store,
            settings,
            defaults: effective.default_options,
            registry,
            engine,
            discovery_roots: None,
        })
    }

    /// Keep transfer backups in `dir`
    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.engine = self.engine.with_backup_dir(dir);
        self
    }

    /// Scan these roots instead of the conventional locations
    pub fn with_discovery_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.discovery_roots = Some(roots);
        self
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    pub fn registry(&self) -> &VaultRegistry {
        &self.registry
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Discover { add, json } => self.discover(add, json).await,
            Command::Vaults(command) => self.vaults(command).await,
            Command::Move(args) => self.transfer(args).await,
            Command::Cleanup => {
                let removed = self.engine.cleanup_old_backups().await;
                println!(
                    "Removed {} stale backups from {}",
                    removed,
                    self.engine.backups().dir().display()
                );
                Ok(())
            }
        }
    }

    fn discovery(&self) -> VaultDiscovery {
        match &self.discovery_roots {
            Some(roots) => VaultDiscovery::with_roots(roots.clone()),
            None => VaultDiscovery::new(),
        }
    }

    async fn persist(&mut self) -> Result<()> {
        self.settings.vaults = self.registry.list().await;
        self.store.save(&self.settings).await?;
        Ok(())
    }

    async fn resolve_vault(&self, key: &str) -> Result<VaultConfig> {
        self.registry
            .find(key)
            .await
            .ok_or_else(|| anyhow!("Unknown vault: {}", key))
    }

    /// Register discovered vaults whose path is not registered yet
    async fn register_discovered(&mut self, found: Vec<VaultConfig>) -> Result<usize> {
        let known: Vec<PathBuf> = self.registry.list().await.into_iter().map(|v| v.path).collect();
        let mut added = 0;

        for vault in found {
            if known.contains(&vault.path) {
                continue;
            }
            log::info!("Registering discovered vault '{}'", vault.name);
            self.registry.add(vault).await?;
            added += 1;
        }

        if added > 0 {
            self.persist().await?;
        }
        Ok(added)
    }

    /// Run discovery once when nothing is registered and the user opted in
    async fn auto_discover(&mut self) -> Result<()> {
        if self.settings.auto_discover && self.registry.is_empty().await {
            let found = self.discovery().discover().await;
            let added = self.register_discovered(found).await?;
            if added > 0 {
                log::info!("Auto-discovered {} vaults", added);
            }
        }
        Ok(())
    }

    async fn discover(&mut self, add: bool, json: bool) -> Result<()> {
        let found = self.discovery().discover().await;

        if json {
            println!("{}", to_json_string(&found, "discovered vaults")?);
        } else if found.is_empty() {
            println!("No vaults found");
        } else {
            for vault in &found {
                println!("{:<24} {}", vault.name, vault.path.display());
            }
        }

        if add {
            let added = self.register_discovered(found).await?;
            println!("Registered {} new vaults", added);
        }
        Ok(())
    }

    async fn vaults(&mut self, command: VaultsCommand) -> Result<()> {
        match command {
            VaultsCommand::List { json } => {
                self.auto_discover().await?;
                let vaults = self.registry.list().await;
                if json {
                    println!("{}", to_json_string(&vaults, "vaults")?);
                } else if vaults.is_empty() {
                    println!("No vaults registered");
                } else {
                    for vault in &vaults {
                        println!(
                            "{:<20} {:<24} {} [{}]",
                            vault.id,
                            vault.name,
                            vault.path.display(),
                            if vault.is_valid { "valid" } else { "invalid" }
                        );
                    }
                }
                Ok(())
            }

            VaultsCommand::Add {
                name,
                path,
                description,
                color,
                force,
            } => {
                let path = expand_path(&path);
                let path = tokio::fs::canonicalize(&path).await.unwrap_or(path);
                let result = self.registry.validate(&path).await;
                if !result.is_valid && !force {
                    bail!(
                        "{} is not a vault: {}",
                        path.display(),
                        result.error.unwrap_or_default()
                    );
                }

                let mut builder = VaultConfig::builder(name, path).valid(result.is_valid);
                if let Some(description) = description {
                    builder = builder.description(description);
                }
                if let Some(color) = color {
                    builder = builder.color(color);
                }
                let vault = builder.build()?;

                self.registry.add(vault.clone()).await?;
                self.persist().await?;
                println!("Added vault '{}' ({})", vault.name, vault.id);
                Ok(())
            }

            VaultsCommand::Remove { vault } => {
                let vault = self.resolve_vault(&vault).await?;
                self.registry.remove(&vault.id).await?;
                self.settings.forget_vault(&vault.id);
                self.persist().await?;
                println!("Removed vault '{}'", vault.name);
                Ok(())
            }

            VaultsCommand::Validate { vault: Some(key) } => {
                let vault = self.resolve_vault(&key).await?;
                let result = self.registry.validate(&vault.path).await;
                self.registry
                    .update(
                        &vault.id,
                        VaultConfigPatch {
                            is_valid: Some(result.is_valid),
                            ..Default::default()
                        },
                    )
                    .await?;
                self.persist().await?;

                match result.error {
                    Some(error) => println!("{}: invalid ({})", vault.name, error),
                    None => println!(
                        "{}: valid (plugins: {}, data files: {})",
                        vault.name, result.has_plugins_subfolder, result.has_data_file
                    ),
                }
                Ok(())
            }

            VaultsCommand::Validate { vault: None } => {
                let changed = self.registry.revalidate_all().await;
                self.persist().await?;
                for vault in self.registry.list().await {
                    println!(
                        "{:<24} {}",
                        vault.name,
                        if vault.is_valid { "valid" } else { "invalid" }
                    );
                }
                println!("{} vaults changed state", changed);
                Ok(())
            }

            VaultsCommand::Folders { vault } => {
                let vault = self.resolve_vault(&vault).await?;
                for folder in self.registry.list_folders(&vault).await {
                    println!("{}", folder);
                }
                Ok(())
            }
        }
    }

    async fn transfer(&mut self, args: MoveArgs) -> Result<()> {
        self.auto_discover().await?;

        let source_root = expand_path(&args.from);
        let source_root = tokio::fs::canonicalize(&source_root)
            .await
            .with_context(|| format!("Source vault not found: {}", source_root.display()))?;

        let target = match &args.to {
            Some(key) => self.resolve_vault(key).await?,
            None => self
                .settings
                .default_vault()
                .cloned()
                .map_err(|_| anyhow!("No destination vault configured"))?,
        };

        let mut options = self.defaults;
        if args.copy {
            options.delete_original = false;
        }
        if let Some(strategy) = args.strategy {
            options.conflict_strategy = strategy;
        }
        if args.no_preserve_metadata {
            options.preserve_metadata = false;
        }
        if args.quiet || args.json {
            options.show_progress = false;
        }

        let files = args
            .files
            .iter()
            .map(|file| relative_to_root(&source_root, file))
            .collect::<Result<Vec<_>>>()?;

        let on_progress = |p: TransferProgress| {
            eprintln!("  [{:>3}%] {:<9} {}", p.percentage, p.stage, p.message)
        };
        let on_batch =
            |b: BatchProgress| eprintln!("({}/{}) {}", b.index + 1, b.total, b.file_name);
        let progress: Option<ProgressCallback<'_>> = if options.show_progress {
            Some(&on_progress)
        } else {
            None
        };

        let results: Vec<(PathBuf, MoveResult)> = if let [file] = files.as_slice() {
            let result = self
                .engine
                .transfer_file(file, &source_root, &target, &args.folder, &options, progress)
                .await;
            vec![(file.clone(), result)]
        } else {
            self.engine
                .transfer_files(
                    &files,
                    &source_root,
                    &target,
                    &args.folder,
                    &options,
                    if options.show_progress {
                        Some(&on_batch)
                    } else {
                        None
                    },
                    progress,
                )
                .await
                .into_iter()
                .collect()
        };

        let succeeded = results.iter().filter(|(_, r)| r.success).count();
        if succeeded > 0 {
            self.settings
                .record_destination(&target.id, normalize_vault_path(&args.folder));
            self.registry.touch(&target.id).await?;
            self.persist().await?;
        }

        let durations = self.engine.tracker().metrics().duration_ms.stats();
        log::info!(
            "{} transfers: mean {:.0} ms, max {:.0} ms",
            durations.count,
            durations.mean,
            durations.max
        );

        if args.json {
            let files: Vec<_> = results
                .iter()
                .map(|(file, result)| serde_json::json!({ "file": file, "result": result }))
                .collect();
            let report = serde_json::json!({ "results": files, "duration_ms": durations });
            println!("{}", to_json_string(&report, "transfer results")?);
        } else {
            let (action, verb) = if options.delete_original {
                ("Moved", "move")
            } else {
                ("Copied", "copy")
            };
            for (file, result) in &results {
                match (&result.new_path, &result.error) {
                    (Some(new_path), _) if result.success => println!(
                        "{} {} to {}:{} ({} ms)",
                        action,
                        file.display(),
                        target.name,
                        new_path,
                        result.duration
                    ),
                    (_, error) => {
                        eprintln!(
                            "Failed to {} {}: {}",
                            verb,
                            file.display(),
                            error.as_deref().unwrap_or("unknown error")
                        );
                        if let Some(backup) = &result.backup_path {
                            eprintln!("  backup kept at {}", backup.display());
                        }
                    }
                }
            }
        }

        let failed = results.len() - succeeded;
        if failed > 0 {
            bail!("{} of {} transfers failed", failed, results.len());
        }
        Ok(())
    }
}

/// Express `file` relative to the source vault root
fn relative_to_root(root: &Path, file: &Path) -> Result<PathBuf> {
    if !file.is_absolute() {
        return Ok(file.to_path_buf());
    }
    let file = std::fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
    file.strip_prefix(root)
        .map(Path::to_path_buf)
        .map_err(|_| anyhow!("{} is outside the source vault {}", file.display(), root.display()))
}
