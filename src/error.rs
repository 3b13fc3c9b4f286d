//! Error types for package list refreshes and their collaborators.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::SourceId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid app descriptor {}: {message}", path.display())]
    Descriptor { path: PathBuf, message: String },

    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with status {code:?}: {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("installing {app} failed: {source}")]
    InstallFailed { app: String, source: Box<Error> },

    #[error("internet is not available, cannot download the list of packages")]
    Offline,

    #[error("a refresh of the {0} repository is already running")]
    RefreshInFlight(SourceId),

    #[error("refresh of the {0} repository was cancelled")]
    Cancelled(SourceId),

    #[error("refresh of the {0} repository was invalidated while running")]
    StaleRefresh(SourceId),
}

pub type Result<T> = std::result::Result<T, Error>;
