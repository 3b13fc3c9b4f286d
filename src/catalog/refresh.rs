use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::apt::parse_package_index;
use crate::backend::PackageBackend;
use crate::error::{Error, Result};
use crate::installed::{InstalledSet, InstalledSetTracker};
use crate::types::{PackageRecord, SourceCatalog, SourceId};

use super::cache::CatalogCache;
use super::reconcile::{reconcile, split_policy_facts};

/// One refresh of one source, from `begin` to `finish`.
///
/// Carries the cache generation seen at the start and the installed set frozen for the
/// whole pass.
#[derive(Debug)]
pub struct RefreshTicket {
    source: SourceId,
    generation: u64,
    snapshot: Arc<InstalledSet>,
    cancel: Arc<AtomicBool>,
    started_at: DateTime<Utc>,
}

impl RefreshTicket {
    /// Flag the owner can set to abort the refresh from another thread.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled(self.source))
        } else {
            Ok(())
        }
    }
}

pub enum RefreshMessage {
    Finished {
        ticket: RefreshTicket,
        result: Result<Vec<PackageRecord>>,
    },
}

/// Allows one refresh per source at a time and decides whether a finished refresh may be
/// committed to the cache.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    in_flight: HashSet<SourceId>,
}

impl RefreshCoordinator {
    pub fn is_in_flight(&self, source: SourceId) -> bool {
        self.in_flight.contains(&source)
    }

    pub fn begin(
        &mut self,
        cache: &CatalogCache,
        tracker: &InstalledSetTracker,
        source: SourceId,
    ) -> Result<RefreshTicket> {
        if !self.in_flight.insert(source) {
            return Err(Error::RefreshInFlight(source));
        }

        info!("refreshing {} package list", source.key());
        Ok(RefreshTicket {
            source,
            generation: cache.generation(source),
            snapshot: tracker.snapshot(),
            cancel: Arc::new(AtomicBool::new(false)),
            started_at: Utc::now(),
        })
    }

    /// Release `source` when its ticket can no longer reach `finish`, such as after the
    /// worker running it panicked. The cache is left untouched.
    pub fn abandon(&mut self, source: SourceId) -> bool {
        let released = self.in_flight.remove(&source);
        if released {
            warn!("abandoned refresh of {}", source.key());
        }
        released
    }

    /// Commit the result of `ticket` unless it failed, was cancelled, or its source was
    /// invalidated after it began. Only a successful commit touches the cache.
    pub fn finish(
        &mut self,
        cache: &mut CatalogCache,
        ticket: RefreshTicket,
        result: Result<Vec<PackageRecord>>,
    ) -> Result<Arc<SourceCatalog>> {
        self.in_flight.remove(&ticket.source);

        if ticket.is_cancelled() {
            info!("refresh of {} cancelled", ticket.source.key());
            return Err(Error::Cancelled(ticket.source));
        }

        let records = result?;

        if cache.generation(ticket.source) != ticket.generation {
            debug!(
                "discarding {} refresh started at {}: source invalidated meanwhile",
                ticket.source.key(),
                ticket.started_at
            );
            return Err(Error::StaleRefresh(ticket.source));
        }

        let mut catalog = SourceCatalog::new(ticket.source, records);
        catalog.loaded_at = ticket.started_at;
        let catalog = cache.put(ticket.source, catalog);
        info!(
            "{} package list ready with {} packages",
            ticket.source.key(),
            catalog.len()
        );
        Ok(catalog)
    }
}

/// Fetch, parse, query and classify one source. Performs no cache writes.
pub(crate) fn run_refresh(
    backend: &dyn PackageBackend,
    ticket: &RefreshTicket,
) -> Result<Vec<PackageRecord>> {
    let raw = backend.fetch_index(ticket.source)?;
    ticket.check_cancelled()?;

    let entries = parse_package_index(&raw);
    debug!(
        "parsed {} entries from {} index",
        entries.len(),
        ticket.source.key()
    );

    // Packages outside the snapshot are not installed, so only installed names need a
    // policy lookup.
    let names: Vec<String> = entries
        .iter()
        .filter(|entry| ticket.snapshot.contains(&entry.name))
        .map(|entry| entry.name.clone())
        .collect();
    let facts = if names.is_empty() {
        Default::default()
    } else {
        backend.query_policy(&names)?
    };
    ticket.check_cancelled()?;

    let (installed, candidates) = split_policy_facts(facts, &ticket.snapshot);
    Ok(reconcile(ticket.source, &entries, &installed, &candidates))
}

/// Return the cached list for `source`, running a refresh when there is none or when
/// `force` is set. A failed or cancelled refresh keeps whatever was cached.
pub fn load_source(
    cache: &mut CatalogCache,
    coordinator: &mut RefreshCoordinator,
    tracker: &InstalledSetTracker,
    backend: &dyn PackageBackend,
    source: SourceId,
    force: bool,
) -> Result<Arc<SourceCatalog>> {
    if !force {
        if let Some(catalog) = cache.get(source) {
            debug!(
                "reusing cached {} package list (populated #{})",
                source.key(),
                catalog.populated_at()
            );
            return Ok(catalog);
        }
    }

    let ticket = coordinator.begin(cache, tracker, source)?;
    let result = run_refresh(backend, &ticket);
    coordinator.finish(cache, ticket, result)
}

/// Run `run_refresh` on a worker thread and report back through `sender`.
pub fn spawn_refresh(
    backend: Arc<dyn PackageBackend + Send + Sync>,
    ticket: RefreshTicket,
    sender: mpsc::Sender<RefreshMessage>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let source = ticket.source;
        let result = run_refresh(backend.as_ref(), &ticket);
        if sender.send(RefreshMessage::Finished { ticket, result }).is_err() {
            warn!("refresh of {} finished with nobody listening", source.key());
        }
    })
}
