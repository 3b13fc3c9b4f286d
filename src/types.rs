use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::version::Version;

/// Repository a package list is read from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Stable,
    Test,
    Backports,
}

impl Default for SourceId {
    fn default() -> Self {
        SourceId::Stable
    }
}

impl SourceId {
    pub fn all() -> &'static [SourceId] {
        &[SourceId::Stable, SourceId::Test, SourceId::Backports]
    }

    pub fn key(self) -> &'static str {
        match self {
            SourceId::Stable => "stable",
            SourceId::Test => "test",
            SourceId::Backports => "backports",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SourceId::Stable => "Stable",
            SourceId::Test => "MX Test",
            SourceId::Backports => "Debian Backports",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PackageStatus {
    NotInstalled,
    Installed,
    Upgradable,
}

impl PackageStatus {
    pub fn label(self) -> &'static str {
        match self {
            PackageStatus::NotInstalled => "not installed",
            PackageStatus::Installed => "installed",
            PackageStatus::Upgradable => "upgradable",
        }
    }
}

/// One package of a repository, classified against the installed system.
#[derive(Clone, Debug, PartialEq)]
pub struct PackageRecord {
    pub name: String,
    pub candidate_version: Version,
    pub installed_version: Version,
    pub description: String,
    pub status: PackageStatus,
    pub tooltip: String,
}

/// The classified package list of one repository.
#[derive(Clone, Debug)]
pub struct SourceCatalog {
    source: SourceId,
    records: Vec<PackageRecord>,
    positions: HashMap<String, usize>,
    pub(crate) populated_at: u64,
    pub(crate) loaded_at: DateTime<Utc>,
}

impl SourceCatalog {
    pub fn new(source: SourceId, records: Vec<PackageRecord>) -> Self {
        let positions = records
            .iter()
            .enumerate()
            .map(|(idx, record)| (record.name.clone(), idx))
            .collect();
        Self {
            source,
            records,
            positions,
            populated_at: 0,
            loaded_at: Utc::now(),
        }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub(crate) fn set_source(&mut self, source: SourceId) {
        self.source = source;
    }

    pub fn records(&self) -> &[PackageRecord] {
        &self.records
    }

    pub fn get(&self, name: &str) -> Option<&PackageRecord> {
        self.positions.get(name).map(|idx| &self.records[*idx])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Logical counter assigned by the cache when this catalog was stored.
    pub fn populated_at(&self) -> u64 {
        self.populated_at
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Machine architecture as reported by `arch`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Arch {
    X86_64,
    I686,
    Other(String),
}

impl Arch {
    pub fn from_uname(value: &str) -> Self {
        match value.trim() {
            "x86_64" => Arch::X86_64,
            "i686" => Arch::I686,
            other => Arch::Other(other.to_string()),
        }
    }

    pub fn is_64_bit(&self) -> bool {
        matches!(self, Arch::X86_64)
    }

    pub fn is_32_bit(&self) -> bool {
        matches!(self, Arch::I686)
    }

    /// Architecture component of Debian repository paths.
    pub fn debian_label(&self) -> &str {
        match self {
            Arch::I686 => "i386",
            _ => "amd64",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub(crate) fn success(&self) -> bool {
        self.code.unwrap_or(-1) == 0
    }

    /// Best description of why the command failed: stderr, then stdout, then the code.
    pub(crate) fn failure_message(&self) -> String {
        if !self.stderr.trim().is_empty() {
            self.stderr.trim().to_string()
        } else if !self.stdout.trim().is_empty() {
            self.stdout.trim().to_string()
        } else {
            format!("Exit code: {}", self.code.unwrap_or(-1))
        }
    }
}
