use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::thread;

use log::{debug, info, warn};

use crate::backend::PackageBackend;
use crate::catalog::{CatalogCache, RefreshCoordinator, RefreshMessage, load_source, spawn_refresh};
use crate::error::Result;
use crate::installed::{InstalledSet, InstalledSetTracker};
use crate::types::{SourceCatalog, SourceId};

/// Owns the cached package lists and the installed set for one run of the program.
///
/// All cache writes happen through `&mut self`; background refreshes only hand their
/// results back as `RefreshMessage`s.
pub struct PackageSession {
    backend: Arc<dyn PackageBackend + Send + Sync>,
    cache: CatalogCache,
    coordinator: RefreshCoordinator,
    tracker: InstalledSetTracker,
}

impl PackageSession {
    pub fn open(backend: Arc<dyn PackageBackend + Send + Sync>) -> Result<Self> {
        let mut tracker = InstalledSetTracker::default();
        tracker.refresh(backend.as_ref())?;
        let installed = tracker.snapshot();
        if installed.is_empty() {
            warn!("the package database reports no installed packages");
        } else {
            info!("{} packages installed", installed.len());
        }

        Ok(Self {
            backend,
            cache: CatalogCache::default(),
            coordinator: RefreshCoordinator::default(),
            tracker,
        })
    }

    pub fn installed(&self) -> Arc<InstalledSet> {
        self.tracker.snapshot()
    }

    pub fn is_loaded(&self, source: SourceId) -> bool {
        self.cache.is_loaded(source)
    }

    pub fn is_refreshing(&self, source: SourceId) -> bool {
        self.coordinator.is_in_flight(source)
    }

    /// Cached list for `source`, refreshed first when missing or when `force` is set.
    pub fn load(&mut self, source: SourceId, force: bool) -> Result<Arc<SourceCatalog>> {
        load_source(
            &mut self.cache,
            &mut self.coordinator,
            &self.tracker,
            self.backend.as_ref(),
            source,
            force,
        )
    }

    /// Refresh `source` on a worker thread. Returns the flag that cancels it.
    pub fn start_refresh(
        &mut self,
        source: SourceId,
        sender: mpsc::Sender<RefreshMessage>,
    ) -> Result<(Arc<AtomicBool>, thread::JoinHandle<()>)> {
        let ticket = self.coordinator.begin(&self.cache, &self.tracker, source)?;
        let cancel = ticket.cancel_handle();
        let handle = spawn_refresh(Arc::clone(&self.backend), ticket, sender);
        Ok((cancel, handle))
    }

    pub fn complete_refresh(&mut self, message: RefreshMessage) -> Result<Arc<SourceCatalog>> {
        let RefreshMessage::Finished { ticket, result } = message;
        self.coordinator.finish(&mut self.cache, ticket, result)
    }

    /// Wait for the worker refreshing `source`. A worker that panicked never sends its
    /// message, so its source is released here. Returns whether the worker finished cleanly.
    pub fn join_refresh(&mut self, source: SourceId, handle: thread::JoinHandle<()>) -> bool {
        if handle.join().is_ok() {
            return true;
        }
        warn!("refresh worker for {} panicked", source.key());
        self.coordinator.abandon(source);
        false
    }

    /// Packages were installed or removed: reread the installed set and drop every list.
    pub fn packages_changed(&mut self) -> Result<()> {
        self.cache.invalidate_all();
        self.tracker.refresh(self.backend.as_ref())?;
        debug!("package lists invalidated after a package change");
        Ok(())
    }

    /// Run `packages_changed` after an install or removal, keeping `outcome` as the result.
    /// A failure to reread the installed set is only logged.
    pub fn finish_change<T>(&mut self, outcome: Result<T>) -> Result<T> {
        if let Err(err) = self.packages_changed() {
            warn!("could not reread installed packages: {}", err);
        }
        outcome
    }
}
