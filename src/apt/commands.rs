use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::backend::PackageBackend;
use crate::error::{Error, Result};
use crate::installed::InstalledSet;
use crate::settings::{AppSettings, RepositoryTable};
use crate::types::{Arch, CommandResult, SourceId};

use super::parser::{PolicyFacts, parse_policy_output, parse_selections};
use super::privilege::run_privileged_command;

/// `apt-cache policy` takes names on the command line; keep each call well under ARG_MAX.
const POLICY_CHUNK: usize = 512;

/// Matches apt list files such as `deb.debian.org_debian_dists_bookworm_main_binary-amd64_Packages`.
static LIST_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"_binary-(?P<arch>[A-Za-z0-9]+)_Packages$").expect("valid regex")
});

pub(crate) fn run_command(program: &str, args: &[&str]) -> Result<CommandResult> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| Error::Launch {
            program: program.to_string(),
            source,
        })?;

    Ok(CommandResult {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

fn command_stdout(program: &str, args: &[&str]) -> Result<String> {
    let result = run_command(program, args)?;
    if !result.success() {
        return Err(Error::CommandFailed {
            program: program.to_string(),
            code: result.code,
            stderr: summarize_output_line(&result.failure_message()).unwrap_or_default(),
        });
    }
    Ok(result.stdout)
}

pub(crate) fn detect_arch() -> Result<Arch> {
    let stdout = command_stdout("arch", &[])?;
    let arch = Arch::from_uname(&stdout);
    debug!("running on {:?}", arch);
    Ok(arch)
}

pub(crate) fn check_online(url: &str) -> bool {
    match run_command("wget", &["-q", "--spider", url]) {
        Ok(result) => result.success(),
        Err(err) => {
            warn!("online check failed: {}", err);
            false
        }
    }
}

pub(crate) fn list_installed() -> Result<InstalledSet> {
    let stdout = command_stdout("dpkg", &["--get-selections"])?;
    Ok(InstalledSet::from_names(parse_selections(&stdout)))
}

pub(crate) fn query_policy(names: &[String]) -> Result<HashMap<String, PolicyFacts>> {
    let mut facts = HashMap::new();
    for chunk in names.chunks(POLICY_CHUNK) {
        let mut args = vec!["policy"];
        args.extend(chunk.iter().map(String::as_str));
        let stdout = command_stdout("apt-cache", &args)?;
        facts.extend(parse_policy_output(&stdout));
    }
    debug!("policy known for {} of {} packages", facts.len(), names.len());
    Ok(facts)
}

/// Download every `Packages.gz` in `urls` and return their text concatenated.
pub(crate) fn download_indexes(urls: &[String], online_check_url: &str) -> Result<String> {
    if urls.is_empty() {
        return Ok(String::new());
    }
    if !check_online(online_check_url) {
        return Err(Error::Offline);
    }

    let dir = TempDir::new()?;
    let mut combined = String::new();
    for (index, url) in urls.iter().enumerate() {
        let archive = dir.path().join(format!("Packages{}.gz", index));
        let archive_arg = archive.to_string_lossy();
        info!("downloading {}", url);
        command_stdout("wget", &["-q", "-O", archive_arg.as_ref(), url])?;
        command_stdout("gzip", &["-df", archive_arg.as_ref()])?;

        let text = fs::read_to_string(archive.with_extension(""))?;
        combined.push_str(&text);
        if !combined.ends_with('\n') {
            combined.push('\n');
        }
        combined.push('\n');
    }
    Ok(combined)
}

/// Read already downloaded lists. Directories are scanned for list files of `arch`.
pub(crate) fn read_local_lists(paths: &[String], arch: &Arch) -> Result<String> {
    let mut combined = String::new();
    for path in paths {
        let path = Path::new(path);
        let files = if path.is_dir() {
            list_files_in(path, arch)
        } else {
            vec![path.to_path_buf()]
        };

        for file in files {
            debug!("reading {}", file.display());
            combined.push_str(&fs::read_to_string(&file)?);
            if !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push('\n');
        }
    }
    Ok(combined)
}

fn list_files_in(dir: &Path, arch: &Arch) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            LIST_FILE.captures(&name).is_some_and(|caps| {
                let list_arch = &caps["arch"];
                list_arch == arch.debian_label() || list_arch == "all"
            })
        })
        .map(|entry| entry.into_path())
        .collect()
}

pub(crate) fn run_apt_update() -> Result<CommandResult> {
    run_privileged_command("apt-get", &["update"])
}

/// Run a descriptor hook script as root.
pub(crate) fn run_hook(script: &str) -> Result<CommandResult> {
    run_privileged_command("sh", &["-c", script])
}

/// `apt-get install` in a terminal so the user can answer its prompts.
pub(crate) fn run_apt_install(terminal: &str, packages: &[String]) -> Result<CommandResult> {
    run_apt_in_terminal(terminal, "install", packages)
}

pub(crate) fn run_apt_remove(terminal: &str, packages: &[String]) -> Result<CommandResult> {
    run_apt_in_terminal(terminal, "remove", packages)
}

fn run_apt_in_terminal(terminal: &str, action: &str, packages: &[String]) -> Result<CommandResult> {
    if packages.is_empty() {
        return Ok(CommandResult {
            code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        });
    }

    let mut args = vec!["-e", "pkexec", "apt-get", action];
    args.extend(packages.iter().map(String::as_str));
    run_command(terminal, &args)
}

pub(crate) fn summarize_output_line(text: &str) -> Option<String> {
    text.lines()
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
        .map(|line| truncate_for_summary(line, 96))
}

fn truncate_for_summary(text: &str, max_chars: usize) -> String {
    let mut result: String = text.chars().take(max_chars).collect();
    if text.chars().nth(max_chars).is_some() {
        result.push_str("...");
    }
    result
}

/// The package system of the running machine.
pub struct AptBackend {
    repositories: RepositoryTable,
    arch: Arch,
    online_check_url: String,
}

impl AptBackend {
    pub fn new(settings: &AppSettings, repositories: RepositoryTable, arch: Arch) -> Self {
        Self {
            repositories,
            arch,
            online_check_url: settings.online_check_url.clone(),
        }
    }
}

impl PackageBackend for AptBackend {
    fn fetch_index(&self, source: SourceId) -> Result<String> {
        let definition = self.repositories.definition(source);
        let mut raw = read_local_lists(&definition.local_lists, &self.arch)?;
        let urls = self.repositories.index_urls(source, &self.arch);
        raw.push_str(&download_indexes(&urls, &self.online_check_url)?);
        Ok(raw)
    }

    fn query_policy(&self, names: &[String]) -> Result<HashMap<String, PolicyFacts>> {
        query_policy(names)
    }

    fn list_installed(&self) -> Result<InstalledSet> {
        list_installed()
    }
}
