use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::types::{SourceCatalog, SourceId};

/// Last classified package list per repository.
///
/// Entries live until invalidated; nothing expires on its own. Each invalidation bumps the
/// source's generation so a refresh started before it can be told apart from one started
/// after.
#[derive(Debug, Default)]
pub struct CatalogCache {
    entries: HashMap<SourceId, Arc<SourceCatalog>>,
    generations: HashMap<SourceId, u64>,
    populated_counter: u64,
}

impl CatalogCache {
    /// The stored catalog, or `None` if the source was never loaded, was invalidated, or
    /// loaded with zero packages.
    pub fn get(&self, source: SourceId) -> Option<Arc<SourceCatalog>> {
        self.entries
            .get(&source)
            .filter(|catalog| !catalog.is_empty())
            .map(Arc::clone)
    }

    pub fn is_loaded(&self, source: SourceId) -> bool {
        self.get(source).is_some()
    }

    pub fn put(&mut self, source: SourceId, mut catalog: SourceCatalog) -> Arc<SourceCatalog> {
        self.populated_counter += 1;
        catalog.set_source(source);
        catalog.populated_at = self.populated_counter;

        debug!(
            "caching {} packages for {} (populated #{})",
            catalog.len(),
            source.key(),
            catalog.populated_at
        );
        let catalog = Arc::new(catalog);
        self.entries.insert(source, Arc::clone(&catalog));
        catalog
    }

    pub fn invalidate(&mut self, source: SourceId) {
        debug!("invalidating {} package list", source.key());
        self.entries.remove(&source);
        *self.generations.entry(source).or_insert(0) += 1;
    }

    pub fn invalidate_all(&mut self) {
        for source in SourceId::all() {
            self.invalidate(*source);
        }
    }

    /// Number of invalidations seen by `source`.
    pub fn generation(&self, source: SourceId) -> u64 {
        self.generations.get(&source).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PackageRecord, PackageStatus};
    use crate::version::Version;

    fn catalog(names: &[&str]) -> SourceCatalog {
        let records = names
            .iter()
            .map(|name| PackageRecord {
                name: name.to_string(),
                candidate_version: Version::parse("1.0"),
                installed_version: Version::none(),
                description: String::new(),
                status: PackageStatus::NotInstalled,
                tooltip: String::new(),
            })
            .collect();
        SourceCatalog::new(SourceId::Stable, records)
    }

    #[test]
    fn repeated_get_reuses_the_stored_catalog() {
        let mut cache = CatalogCache::default();
        let stored = cache.put(SourceId::Stable, catalog(&["vim", "git"]));

        let first = cache.get(SourceId::Stable).expect("cached catalog");
        let second = cache.get(SourceId::Stable).expect("cached catalog");
        assert!(Arc::ptr_eq(&stored, &first));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn invalidate_removes_entry() {
        let mut cache = CatalogCache::default();
        cache.put(SourceId::Stable, catalog(&["vim"]));
        cache.invalidate(SourceId::Stable);
        assert!(cache.get(SourceId::Stable).is_none());
        assert_eq!(cache.generation(SourceId::Stable), 1);
    }

    #[test]
    fn sources_are_independent() {
        let mut cache = CatalogCache::default();
        cache.put(SourceId::Stable, catalog(&["vim"]));
        cache.put(SourceId::Test, catalog(&["mx-tools"]));
        cache.invalidate(SourceId::Test);

        assert!(cache.is_loaded(SourceId::Stable));
        assert!(!cache.is_loaded(SourceId::Test));
        assert_eq!(cache.generation(SourceId::Stable), 0);
    }

    #[test]
    fn empty_catalog_counts_as_not_loaded() {
        let mut cache = CatalogCache::default();
        cache.put(SourceId::Backports, catalog(&[]));
        assert!(cache.get(SourceId::Backports).is_none());
    }

    #[test]
    fn put_assigns_source_and_counter() {
        let mut cache = CatalogCache::default();
        let first = cache.put(SourceId::Test, catalog(&["a"]));
        let second = cache.put(SourceId::Backports, catalog(&["b"]));
        assert_eq!(first.source(), SourceId::Test);
        assert!(second.populated_at() > first.populated_at());
    }

    #[test]
    fn invalidate_all_clears_every_source() {
        let mut cache = CatalogCache::default();
        for source in SourceId::all() {
            cache.put(*source, catalog(&["pkg"]));
        }
        cache.invalidate_all();
        for source in SourceId::all() {
            assert!(cache.get(*source).is_none());
            assert_eq!(cache.generation(*source), 1);
        }
    }
}
