use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::types::{Arch, SourceId};

const APP_SETTINGS_FILE: &str = "settings.json";
const REPOSITORIES_FILE: &str = "repositories.toml";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_popular_apps_dir")]
    pub popular_apps_dir: PathBuf,
    #[serde(default)]
    pub default_source: SourceId,
    #[serde(default = "default_confirm_pref")]
    pub confirm_install: bool,
    #[serde(default = "default_confirm_pref")]
    pub confirm_remove: bool,
    #[serde(default = "default_terminal")]
    pub terminal: String,
    #[serde(default = "default_online_check_url")]
    pub online_check_url: String,
}

fn default_popular_apps_dir() -> PathBuf {
    PathBuf::from("/usr/share/mx-package-manager-pkglist")
}

fn default_confirm_pref() -> bool {
    true
}

fn default_terminal() -> String {
    "x-terminal-emulator".to_string()
}

fn default_online_check_url() -> String {
    "http://google.com".to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            popular_apps_dir: default_popular_apps_dir(),
            default_source: SourceId::Stable,
            confirm_install: default_confirm_pref(),
            confirm_remove: default_confirm_pref(),
            terminal: default_terminal(),
            online_check_url: default_online_check_url(),
        }
    }
}

/// Where each repository's `Packages` indices come from.
///
/// `{arch}` in a URL is replaced with the Debian architecture label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepositoryTable {
    #[serde(default = "default_stable_repository")]
    pub stable: RepositoryDefinition,
    #[serde(default = "default_test_repository")]
    pub test: RepositoryDefinition,
    #[serde(default = "default_backports_repository")]
    pub backports: RepositoryDefinition,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryDefinition {
    /// Remote `Packages.gz` files, one per component.
    #[serde(default)]
    pub index_urls: Vec<String>,
    /// Already downloaded, uncompressed `Packages` files read directly.
    #[serde(default)]
    pub local_lists: Vec<String>,
}

fn default_stable_repository() -> RepositoryDefinition {
    RepositoryDefinition {
        index_urls: Vec::new(),
        local_lists: vec!["/var/lib/apt/lists".to_string()],
    }
}

fn default_test_repository() -> RepositoryDefinition {
    RepositoryDefinition {
        index_urls: vec![
            "http://mxrepo.com/mx/testrepo/dists/mx15/test/binary-{arch}/Packages.gz".to_string(),
        ],
        local_lists: Vec::new(),
    }
}

fn default_backports_repository() -> RepositoryDefinition {
    let components = ["main", "contrib", "non-free"];
    RepositoryDefinition {
        index_urls: components
            .iter()
            .map(|component| {
                format!(
                    "ftp://ftp.us.debian.org/debian/dists/jessie-backports/{}/binary-{{arch}}/Packages.gz",
                    component
                )
            })
            .collect(),
        local_lists: Vec::new(),
    }
}

impl Default for RepositoryTable {
    fn default() -> Self {
        Self {
            stable: default_stable_repository(),
            test: default_test_repository(),
            backports: default_backports_repository(),
        }
    }
}

impl RepositoryTable {
    pub fn definition(&self, source: SourceId) -> &RepositoryDefinition {
        match source {
            SourceId::Stable => &self.stable,
            SourceId::Test => &self.test,
            SourceId::Backports => &self.backports,
        }
    }

    pub fn index_urls(&self, source: SourceId, arch: &Arch) -> Vec<String> {
        self.definition(source)
            .index_urls
            .iter()
            .map(|url| url.replace("{arch}", arch.debian_label()))
            .collect()
    }
}

pub fn load_app_settings() -> AppSettings {
    let Some(path) = app_settings_path() else {
        return AppSettings::default();
    };

    let Ok(content) = fs::read_to_string(&path) else {
        return AppSettings::default();
    };

    match serde_json::from_str(&content) {
        Ok(settings) => settings,
        Err(err) => {
            warn!("ignoring unreadable settings {}: {}", path.display(), err);
            AppSettings::default()
        }
    }
}

pub fn save_app_settings(settings: &AppSettings) -> Result<()> {
    let path = app_settings_path().context("unable to determine settings directory")?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create settings directory {}", parent.display()))?;
    }

    let data = serde_json::to_string_pretty(settings).context("failed to serialize settings")?;
    fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))
}

/// Built-in repositories, overridden by `repositories.toml` in the config directory.
pub fn load_repository_table() -> Result<RepositoryTable> {
    match app_config_dir() {
        Some(dir) => load_repository_table_from(&dir.join(REPOSITORIES_FILE)),
        None => Ok(RepositoryTable::default()),
    }
}

fn load_repository_table_from(path: &Path) -> Result<RepositoryTable> {
    if !path.exists() {
        return Ok(RepositoryTable::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read repository file {}", path.display()))?;
    let table: RepositoryTable = toml::from_str(&raw)
        .with_context(|| format!("failed to parse repositories from {}", path.display()))?;
    Ok(table)
}

fn app_config_dir() -> Option<PathBuf> {
    if let Ok(custom) = env::var("MXPM_CONFIG_DIR") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        let trimmed = config_home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed).join("mxpm"));
        }
    }

    if let Ok(home) = env::var("HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed).join(".config").join("mxpm"));
        }
    }

    None
}

fn app_settings_path() -> Option<PathBuf> {
    app_config_dir().map(|dir| dir.join(APP_SETTINGS_FILE))
}
