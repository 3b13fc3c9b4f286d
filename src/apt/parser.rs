use std::collections::{HashMap, HashSet};

use log::debug;

use crate::version::Version;

/// A package as described by one stanza of a `Packages` index.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexEntry {
    pub name: String,
    pub version: Version,
    pub description: String,
}

/// Installed and candidate versions reported by `apt-cache policy`.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyFacts {
    pub installed: Version,
    pub candidate: Version,
}

impl Default for PolicyFacts {
    fn default() -> Self {
        Self {
            installed: Version::none(),
            candidate: Version::none(),
        }
    }
}

#[derive(Default)]
struct Stanza {
    name: String,
    version: Option<String>,
    description: String,
}

/// Parse `Packages` index text into entries in first-seen order.
///
/// Only `Package`, `Version` and the first line of `Description` are read. Stanzas without
/// a version are dropped; fields seen outside a stanza are ignored. When a name appears
/// twice the later stanza replaces the earlier one in place.
pub(crate) fn parse_package_index(raw: &str) -> Vec<IndexEntry> {
    let mut entries: Vec<IndexEntry> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut current: Option<Stanza> = None;

    let mut finish = |stanza: Option<Stanza>| {
        let Some(stanza) = stanza else {
            return;
        };
        let Some(version) = stanza.version else {
            debug!("dropping index stanza for {} without a Version field", stanza.name);
            return;
        };
        let entry = IndexEntry {
            name: stanza.name,
            version: Version::parse(&version),
            description: stanza.description,
        };
        match positions.get(&entry.name) {
            Some(idx) => entries[*idx] = entry,
            None => {
                positions.insert(entry.name.clone(), entries.len());
                entries.push(entry);
            }
        }
    };

    for line in raw.lines() {
        let line = line.trim_end_matches('\r');

        if line.trim().is_empty() {
            finish(current.take());
            continue;
        }

        if let Some(name) = line.strip_prefix("Package:") {
            finish(current.take());
            let name = name.trim();
            if name.is_empty() {
                debug!("ignoring index stanza with an empty Package field");
                continue;
            }
            current = Some(Stanza {
                name: name.to_string(),
                ..Default::default()
            });
            continue;
        }

        let Some(stanza) = current.as_mut() else {
            continue;
        };

        if let Some(version) = line.strip_prefix("Version:") {
            stanza.version = Some(version.trim().to_string());
        } else if let Some(description) = line.strip_prefix("Description:") {
            stanza.description = description.trim().to_string();
        }
    }
    finish(current.take());

    entries
}

/// Parse `apt-cache policy` output into per-package version facts.
///
/// ```text
/// vim:
///   Installed: 2:8.2.2434-3
///   Candidate: 2:8.2.2434-3+deb11u1
///   Version table:
/// ```
pub(crate) fn parse_policy_output(raw: &str) -> HashMap<String, PolicyFacts> {
    let mut facts = HashMap::new();
    let mut current: Option<(String, PolicyFacts, bool, bool)> = None;

    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        let indented = line.starts_with(char::is_whitespace);
        if !indented {
            if let Some(header) = line.strip_suffix(':') {
                if let Some((name, policy, _, _)) = current.take() {
                    facts.insert(name, policy);
                }
                let name = strip_arch_qualifier(header.trim()).to_string();
                current = Some((name, PolicyFacts::default(), false, false));
            }
            continue;
        }

        let Some((_, policy, seen_installed, seen_candidate)) = current.as_mut() else {
            continue;
        };
        let trimmed = line.trim();
        if let Some(value) = trimmed.strip_prefix("Installed:") {
            if !*seen_installed {
                policy.installed = Version::parse(value.trim());
                *seen_installed = true;
            }
        } else if let Some(value) = trimmed.strip_prefix("Candidate:") {
            if !*seen_candidate {
                policy.candidate = Version::parse(value.trim());
                *seen_candidate = true;
            }
        }
    }

    if let Some((name, policy, _, _)) = current.take() {
        facts.insert(name, policy);
    }

    facts
}

/// Parse `dpkg --get-selections` output into installed package names.
///
/// Packages selected for `deinstall` or `purge` are skipped and architecture
/// qualifiers such as `:i386` are removed.
pub(crate) fn parse_selections(raw: &str) -> HashSet<String> {
    raw.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let name = fields.next()?;
            match fields.next() {
                Some("deinstall") | Some("purge") => None,
                _ => Some(strip_arch_qualifier(name).to_string()),
            }
        })
        .collect()
}

/// `libc6:i386` -> `libc6`
pub(crate) fn strip_arch_qualifier(name: &str) -> &str {
    match name.split_once(':') {
        Some((base, _)) => base,
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const INDEX: &str = indoc! {"
        Package: vim
        Source: vim (2:8.2.2434-3)
        Version: 2:8.2.2434-3+deb11u1
        Installed-Size: 3110
        Description: Vi IMproved - enhanced vi editor
         Vim is an almost compatible version of the UNIX editor Vi.
         .
         Package: not-a-field

        Package: git
        Version: 1:2.30.2-1
        Description: fast, scalable, distributed revision control system

        Package: broken
        Description: stanza without a version

        Version: 9.9
        Description: orphaned fields

        Package: vim
        Version: 2:9.0.1378-2
        Description: Vi IMproved - newer
    "};

    #[test]
    fn parses_names_versions_and_first_description_line() {
        let entries = parse_package_index(INDEX);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["vim", "git"]);

        let git = &entries[1];
        assert_eq!(git.version.as_str(), "1:2.30.2-1");
        assert_eq!(git.description, "fast, scalable, distributed revision control system");
    }

    #[test]
    fn later_duplicate_replaces_earlier_in_place() {
        let entries = parse_package_index(INDEX);
        assert_eq!(entries[0].name, "vim");
        assert_eq!(entries[0].version.as_str(), "2:9.0.1378-2");
        assert_eq!(entries[0].description, "Vi IMproved - newer");
    }

    #[test]
    fn fields_without_package_are_discarded() {
        let entries = parse_package_index("Version: 1.0\nDescription: nothing\n");
        assert!(entries.is_empty());
    }

    #[test]
    fn stanzas_without_blank_separator_still_split() {
        let raw = "Package: a\nVersion: 1\nPackage: b\nVersion: 2\r\n";
        let entries = parse_package_index(raw);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].version.as_str(), "2");
        assert_eq!(entries[1].description, "");
    }

    #[test]
    fn parses_policy_blocks() {
        let raw = indoc! {"
            vim:
              Installed: 2:8.2.2434-3
              Candidate: 2:8.2.2434-3+deb11u1
              Version table:
                 2:8.2.2434-3+deb11u1 500
                    500 http://deb.debian.org/debian bullseye/main amd64 Packages
            libc6:i386:
              Installed: (none)
              Candidate: 2.31-13
            ghost:
              Installed: (none)
              Candidate: (none)
        "};
        let facts = parse_policy_output(raw);
        assert_eq!(facts.len(), 3);

        let vim = &facts["vim"];
        assert_eq!(vim.installed.as_str(), "2:8.2.2434-3");
        assert_eq!(vim.candidate.as_str(), "2:8.2.2434-3+deb11u1");

        let libc = &facts["libc6"];
        assert!(!libc.installed.is_known());
        assert_eq!(libc.candidate.as_str(), "2.31-13");

        assert!(!facts["ghost"].candidate.is_known());
    }

    #[test]
    fn parses_selections() {
        let raw = "bash\t\t\t\tinstall\nlibc6:amd64\t\tinstall\nlibc6:i386\t\tinstall\nold\t\tdeinstall\n\n";
        let set = parse_selections(raw);
        assert_eq!(set.len(), 2);
        assert!(set.contains("bash"));
        assert!(set.contains("libc6"));
        assert!(!set.contains("old"));
    }
}
