use std::collections::HashSet;
use std::sync::Arc;

use log::debug;

use crate::apt::strip_arch_qualifier;
use crate::backend::PackageBackend;
use crate::error::Result;

/// Names of the packages currently installed, without architecture qualifiers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstalledSet {
    names: HashSet<String>,
}

impl InstalledSet {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|name| strip_arch_qualifier(name.as_ref().trim()).to_string())
            .filter(|name| !name.is_empty())
            .collect();
        Self { names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(strip_arch_qualifier(name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Holds the live installed set and hands out frozen snapshots of it.
#[derive(Debug, Default)]
pub struct InstalledSetTracker {
    current: Arc<InstalledSet>,
}

impl InstalledSetTracker {
    /// Replace the set wholesale from the package database.
    pub fn refresh(&mut self, backend: &dyn PackageBackend) -> Result<()> {
        let set = backend.list_installed()?;
        debug!("installed set refreshed with {} packages", set.len());
        self.replace(set);
        Ok(())
    }

    pub fn replace(&mut self, set: InstalledSet) {
        self.current = Arc::new(set);
    }

    /// The set as of now. Later refreshes do not affect a snapshot already taken.
    pub fn snapshot(&self) -> Arc<InstalledSet> {
        Arc::clone(&self.current)
    }
}
