use std::collections::HashMap;

use crate::apt::{IndexEntry, PolicyFacts};
use crate::installed::InstalledSet;
use crate::types::{PackageRecord, PackageStatus, SourceId};
use crate::version::Version;

/// Classify every index entry of `source` against installed and candidate versions.
///
/// The repository's own index version decides the status; the system candidate from the
/// policy query only appears in the tooltip. Pure: same inputs, same records.
pub(crate) fn reconcile(
    source: SourceId,
    entries: &[IndexEntry],
    installed_versions: &HashMap<String, Version>,
    candidate_versions: &HashMap<String, Version>,
) -> Vec<PackageRecord> {
    entries
        .iter()
        .map(|entry| {
            let installed = installed_versions.get(&entry.name);
            let status = classify(installed, &entry.version);
            let installed_version = installed.cloned().unwrap_or_else(Version::none);
            let tooltip = tooltip(
                source,
                status,
                &installed_version,
                &entry.version,
                candidate_versions.get(&entry.name),
            );

            PackageRecord {
                name: entry.name.clone(),
                candidate_version: entry.version.clone(),
                installed_version,
                description: entry.description.clone(),
                status,
                tooltip,
            }
        })
        .collect()
}

/// Equal versions count as installed, never as upgradable.
pub(crate) fn classify(installed: Option<&Version>, repo_candidate: &Version) -> PackageStatus {
    match installed {
        Some(installed) if installed.is_known() => {
            if installed >= repo_candidate {
                PackageStatus::Installed
            } else {
                PackageStatus::Upgradable
            }
        }
        _ => PackageStatus::NotInstalled,
    }
}

/// Split policy facts into the installed and candidate maps `reconcile` takes.
///
/// Installed versions are kept only for names in `installed`, so a whole pass is
/// classified against one snapshot of the installed set.
pub(crate) fn split_policy_facts(
    facts: HashMap<String, PolicyFacts>,
    installed: &InstalledSet,
) -> (HashMap<String, Version>, HashMap<String, Version>) {
    let mut installed_versions = HashMap::new();
    let mut candidate_versions = HashMap::new();

    for (name, policy) in facts {
        if installed.contains(&name) && policy.installed.is_known() {
            installed_versions.insert(name.clone(), policy.installed);
        }
        candidate_versions.insert(name, policy.candidate);
    }

    (installed_versions, candidate_versions)
}

fn tooltip(
    source: SourceId,
    status: PackageStatus,
    installed: &Version,
    repo_candidate: &Version,
    system_candidate: Option<&Version>,
) -> String {
    let mut text = match status {
        PackageStatus::NotInstalled => {
            format!("Version {} in {} repo", repo_candidate, source.label())
        }
        PackageStatus::Installed => format!("Latest version {} already installed", installed),
        PackageStatus::Upgradable => format!(
            "Version {} installed, {} available",
            installed, repo_candidate
        ),
    };

    if let Some(system_candidate) = system_candidate {
        if system_candidate.is_known() && system_candidate != repo_candidate {
            text.push_str(&format!("\nSystem candidate: {}", system_candidate));
        }
    }

    text
}
