use std::collections::HashMap;

use crate::apt::PolicyFacts;
use crate::error::Result;
use crate::installed::InstalledSet;
use crate::types::SourceId;

/// Long-running queries against the package system that feed a refresh.
///
/// Implementations may block; callers run them off the owner thread.
pub trait PackageBackend {
    /// Raw `Packages` index text for one repository, all components concatenated.
    fn fetch_index(&self, source: SourceId) -> Result<String>;

    /// Installed and candidate versions for the given package names.
    fn query_policy(&self, names: &[String]) -> Result<HashMap<String, PolicyFacts>>;

    fn list_installed(&self) -> Result<InstalledSet>;
}
