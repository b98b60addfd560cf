//! Device-catalog cache backed by a single JSON snapshot file.
//!
//! Readers get an `Arc<DeviceCatalog>`; a refresh never mutates a catalog that has
//! been handed out, it swaps in a new one after the snapshot rename lands.

use std::{
    io,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::catalog::{DeviceCatalog, DeviceEntry};
use crate::config::{BotConfig, ChangeDetection};
use crate::error::{CatalogError, FetchError};
use crate::fetch::CatalogFetcher;
use crate::hashing::sha256_file;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The staged catalog was renamed over the live snapshot.
    Replaced,
    /// Upstream matched the snapshot; the staging file was discarded.
    Unchanged,
}

pub struct CatalogCache {
    fetcher: CatalogFetcher,
    snapshot_path: PathBuf,
    change_detection: ChangeDetection,
    current: RwLock<Option<Arc<DeviceCatalog>>>,
    // Held from staging through the swap so disk and memory change together.
    refresh_lock: Mutex<()>,
}

impl CatalogCache {
    pub fn new(
        fetcher: CatalogFetcher,
        snapshot_path: impl Into<PathBuf>,
        change_detection: ChangeDetection,
    ) -> Self {
        Self {
            fetcher,
            snapshot_path: snapshot_path.into(),
            change_detection,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn from_config(cfg: &BotConfig) -> Result<Self, FetchError> {
        Ok(Self::new(
            CatalogFetcher::from_config(cfg)?,
            cfg.snapshot_path(),
            cfg.change_detection,
        ))
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// The in-memory catalog, if one has been loaded.
    pub fn current(&self) -> Option<Arc<DeviceCatalog>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the current catalog, reading the snapshot on first use and fetching
    /// upstream when no snapshot exists yet.
    pub async fn load(&self) -> Result<Arc<DeviceCatalog>, CatalogError> {
        if let Some(catalog) = self.current() {
            return Ok(catalog);
        }

        match self.read_snapshot().await {
            Ok(catalog) => Ok(self.install_if_empty(catalog)),
            Err(CatalogError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                info!(
                    "No catalog snapshot at {}; fetching upstream",
                    self.snapshot_path.display()
                );
                self.refresh().await?;
                self.current().ok_or_else(|| {
                    CatalogError::Io(io::Error::new(
                        io::ErrorKind::NotFound,
                        "catalog missing after refresh",
                    ))
                })
            }
            Err(err) => {
                warn!("Snapshot {} unusable: {}", self.snapshot_path.display(), err);
                Err(err)
            }
        }
    }

    /// Fetches the catalog and replaces the snapshot when it changed.
    ///
    /// On any failure the live snapshot and the in-memory catalog are left untouched.
    pub async fn refresh(&self) -> Result<RefreshOutcome, CatalogError> {
        let data = self.fetcher.fetch().await.map_err(|err| {
            warn!("Catalog fetch from {} failed: {}", self.fetcher.url(), err);
            err
        })?;
        let catalog = DeviceCatalog::parse(&data).map_err(|err| {
            warn!("Upstream catalog rejected: {}", err);
            err
        })?;

        let _guard = self.refresh_lock.lock().await;
        if let Some(parent) = self.snapshot_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = bliss_util::staging_path(&self.snapshot_path);
        if let Err(err) = tokio::fs::write(&staging, &data).await {
            discard(&staging).await;
            return Err(err.into());
        }

        let changed = match self.snapshot_differs(&staging, &data).await {
            Ok(changed) => changed,
            Err(err) => {
                discard(&staging).await;
                return Err(err.into());
            }
        };

        if !changed {
            discard(&staging).await;
            // Memory must mirror the kept snapshot, not the discarded fetch.
            if self.current().is_none() {
                let kept = self.read_snapshot().await?;
                self.install_if_empty(kept);
            }
            debug!("Catalog unchanged; kept {}", self.snapshot_path.display());
            return Ok(RefreshOutcome::Unchanged);
        }

        if let Err(err) = tokio::fs::rename(&staging, &self.snapshot_path).await {
            discard(&staging).await;
            return Err(err.into());
        }
        let devices = catalog.len();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(catalog));
        info!(
            "Catalog snapshot replaced ({} devices) at {}",
            devices,
            self.snapshot_path.display()
        );
        Ok(RefreshOutcome::Replaced)
    }

    /// Entry for `codename` from the current catalog. Load failures read as absence.
    pub async fn lookup(&self, codename: &str) -> Option<DeviceEntry> {
        match self.load().await {
            Ok(catalog) => catalog.get(codename).cloned(),
            Err(err) => {
                warn!("Catalog unavailable for lookup of '{}': {}", codename, err);
                None
            }
        }
    }

    async fn read_snapshot(&self) -> Result<DeviceCatalog, CatalogError> {
        let data = tokio::fs::read(&self.snapshot_path).await?;
        Ok(DeviceCatalog::parse(&data)?)
    }

    async fn snapshot_differs(&self, staging: &Path, data: &[u8]) -> io::Result<bool> {
        let live = match tokio::fs::metadata(&self.snapshot_path).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(err) => return Err(err),
        };
        match self.change_detection {
            ChangeDetection::Size => {
                let staged = tokio::fs::metadata(staging).await?;
                Ok(staged.len() != live.len())
            }
            ChangeDetection::Sha256 => {
                let path = self.snapshot_path.clone();
                let live_digest = tokio::task::spawn_blocking(move || sha256_file(&path))
                    .await
                    .map_err(io::Error::other)??;
                Ok(live_digest != Sha256::digest(data))
            }
        }
    }

    fn install_if_empty(&self, catalog: DeviceCatalog) -> Arc<DeviceCatalog> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(existing) => Arc::clone(existing),
            None => {
                let catalog = Arc::new(catalog);
                *guard = Some(Arc::clone(&catalog));
                catalog
            }
        }
    }
}

async fn discard(staging: &Path) {
    if let Err(err) = tokio::fs::remove_file(staging).await {
        if err.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove staging file {}: {}", staging.display(), err);
        }
    }
}
