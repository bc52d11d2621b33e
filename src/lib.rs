pub mod accounts;
pub mod app_dirs;
pub mod catalog;
pub mod cli;
pub mod db;
pub mod error;
pub mod mindfulness;
pub mod models;
pub mod session_commands;
pub mod settings;
pub mod storage;
pub mod store;
pub mod timer;
pub mod utils;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;

use catalog::Catalog;
use db::Database;
use settings::{SettingsStore, StorageBackend};
use storage::{JsonFileStorage, SessionStorage, SqliteStorage, SESSIONS_KEY};
use store::SessionStore;

/// Everything a command needs, opened once per process.
pub struct AppState {
    pub catalog: &'static Catalog,
    pub settings: SettingsStore,
    pub store: SessionStore,
    pub data_dir: PathBuf,
}

impl AppState {
    pub async fn open(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;

        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        let storage: Arc<dyn SessionStorage> = match settings.get().storage_backend {
            StorageBackend::Json => Arc::new(JsonFileStorage::new(&data_dir, SESSIONS_KEY)),
            StorageBackend::Sqlite => {
                let database = Database::new(data_dir.join("teabrew.sqlite3"))?;
                Arc::new(SqliteStorage::new(database, SESSIONS_KEY))
            }
        };

        Ok(Self {
            catalog: Catalog::builtin()?,
            settings,
            store: SessionStore::open(storage).await,
            data_dir,
        })
    }
}

pub fn run() -> Result<()> {
    utils::logging::init();

    let cli = cli::Cli::parse();
    log::debug!("teabrew starting with {:?}", cli.command);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(async move {
        let data_dir = app_dirs::data_dir(cli.data_dir.clone())?;
        let state = AppState::open(data_dir).await?;
        cli::dispatch(&state, cli.command).await
    })
}
