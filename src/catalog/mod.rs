mod cache;
mod reconcile;
mod refresh;

pub(crate) use cache::CatalogCache;
pub(crate) use refresh::{RefreshCoordinator, RefreshMessage, load_source, spawn_refresh};
