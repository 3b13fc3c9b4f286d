use crate::installed::InstalledSet;
use crate::types::Arch;

/// Which architectures an app may be offered on.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ArchGate {
    #[default]
    Any,
    Only64,
    Only32,
}

impl ArchGate {
    /// Value of the `<installable>` element; anything but `64` or `32` means any.
    pub fn from_installable(value: &str) -> Self {
        match value.trim() {
            "64" => ArchGate::Only64,
            "32" => ArchGate::Only32,
            _ => ArchGate::Any,
        }
    }

    pub fn allows(self, arch: &Arch) -> bool {
        match self {
            ArchGate::Any => true,
            ArchGate::Only64 => arch.is_64_bit(),
            ArchGate::Only32 => arch.is_32_bit(),
        }
    }
}

/// A curated meta-package from a `.pm` descriptor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PopularApp {
    pub category: String,
    pub name: String,
    pub description: String,
    pub arch_gate: ArchGate,
    pub screenshot: String,
    pub preinstall: String,
    pub postinstall: String,
    pub install_names: Vec<String>,
    pub uninstall_names: Vec<String>,
}

impl PopularApp {
    /// True only when the app lists uninstall names and all of them are installed.
    pub fn is_already_installed(&self, installed: &InstalledSet) -> bool {
        !self.uninstall_names.is_empty()
            && self
                .uninstall_names
                .iter()
                .all(|name| installed.contains(name))
    }

    /// Apps without a pre-install hook can share one package manager run.
    pub fn is_batchable(&self) -> bool {
        self.preinstall.trim().is_empty()
    }

    pub fn screenshot_url(&self) -> Option<&str> {
        let url = self.screenshot.trim();
        if url.is_empty() || url == "none" {
            None
        } else {
            Some(url)
        }
    }
}

pub(crate) fn filter_by_arch(apps: &[PopularApp], arch: &Arch) -> Vec<PopularApp> {
    apps.iter()
        .filter(|app| app.arch_gate.allows(arch))
        .cloned()
        .collect()
}

/// Apps under their category, categories in first-seen order.
pub(crate) fn group_by_category(apps: &[PopularApp]) -> Vec<(&str, Vec<&PopularApp>)> {
    let mut groups: Vec<(&str, Vec<&PopularApp>)> = Vec::new();
    for app in apps {
        match groups
            .iter_mut()
            .find(|(category, _)| category.eq_ignore_ascii_case(&app.category))
        {
            Some((_, members)) => members.push(app),
            None => groups.push((app.category.as_str(), vec![app])),
        }
    }
    groups
}

/// Apps whose name contains `term`, plus every app of a category whose name contains it.
pub(crate) fn search<'a>(apps: &'a [PopularApp], term: &str) -> Vec<&'a PopularApp> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return apps.iter().collect();
    }

    apps.iter()
        .filter(|app| {
            app.name.to_lowercase().contains(&needle)
                || app.category.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Button state for a set of checked apps.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SelectionSummary {
    pub can_install: bool,
    pub can_uninstall: bool,
    pub reinstall: bool,
    pub uninstall_names: Vec<String>,
}

impl SelectionSummary {
    pub fn install_label(&self) -> &'static str {
        if self.reinstall { "Reinstall" } else { "Install" }
    }
}

pub(crate) fn summarize_selection(
    selected: &[&PopularApp],
    installed: &InstalledSet,
) -> SelectionSummary {
    if selected.is_empty() {
        return SelectionSummary::default();
    }

    let all_installed = selected.iter().all(|app| app.is_already_installed(installed));
    let mut uninstall_names: Vec<String> = Vec::new();
    for app in selected {
        for name in &app.uninstall_names {
            if !uninstall_names.contains(name) {
                uninstall_names.push(name.clone());
            }
        }
    }

    SelectionSummary {
        can_install: true,
        can_uninstall: all_installed,
        reinstall: all_installed,
        uninstall_names,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(name: &str, category: &str, gate: ArchGate, uninstall: &[&str]) -> PopularApp {
        PopularApp {
            category: category.to_string(),
            name: name.to_string(),
            arch_gate: gate,
            uninstall_names: uninstall.iter().map(|s| s.to_string()).collect(),
            install_names: uninstall.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn arch_filter_respects_gate() {
        let apps = vec![
            app("Chrome", "Browser", ArchGate::Only64, &["google-chrome-stable"]),
            app("Legacy", "Misc", ArchGate::Only32, &["legacy"]),
            app("Vlc", "Video", ArchGate::Any, &["vlc"]),
        ];

        let on_32: Vec<String> = filter_by_arch(&apps, &Arch::I686)
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(on_32, vec!["Legacy", "Vlc"]);

        let on_64: Vec<String> = filter_by_arch(&apps, &Arch::X86_64)
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(on_64, vec!["Chrome", "Vlc"]);

        let other = filter_by_arch(&apps, &Arch::Other("aarch64".to_string()));
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn already_installed_needs_every_name() {
        let foobar = app("FooBar", "Misc", ArchGate::Any, &["foo", "bar"]);
        assert!(!foobar.is_already_installed(&InstalledSet::from_names(["foo"])));
        assert!(foobar.is_already_installed(&InstalledSet::from_names(["foo", "bar:amd64"])));

        let nothing = app("Empty", "Misc", ArchGate::Any, &[]);
        assert!(!nothing.is_already_installed(&InstalledSet::from_names(["foo"])));
    }

    #[test]
    fn installable_values() {
        assert_eq!(ArchGate::from_installable("64"), ArchGate::Only64);
        assert_eq!(ArchGate::from_installable(" 32\n"), ArchGate::Only32);
        assert_eq!(ArchGate::from_installable(""), ArchGate::Any);
        assert_eq!(ArchGate::from_installable("all"), ArchGate::Any);
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let apps = vec![
            app("Firefox", "Browser", ArchGate::Any, &[]),
            app("Vlc", "Video", ArchGate::Any, &[]),
            app("Chromium", "browser", ArchGate::Any, &[]),
        ];
        let groups = group_by_category(&apps);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "Browser");
        let browsers: Vec<&str> = groups[0].1.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(browsers, vec!["Firefox", "Chromium"]);
    }

    #[test]
    fn search_matches_names_and_categories() {
        let apps = vec![
            app("Firefox", "Browser", ArchGate::Any, &[]),
            app("Vlc", "Video", ArchGate::Any, &[]),
            app("Kodi", "Video", ArchGate::Any, &[]),
        ];
        let names = |found: Vec<&PopularApp>| -> Vec<String> {
            found.into_iter().map(|a| a.name.clone()).collect()
        };
        assert_eq!(names(search(&apps, "fire")), vec!["Firefox"]);
        assert_eq!(names(search(&apps, "VIDEO")), vec!["Vlc", "Kodi"]);
        assert_eq!(search(&apps, "  ").len(), 3);
        assert!(search(&apps, "office").is_empty());
    }

    #[test]
    fn selection_summary() {
        let installed = InstalledSet::from_names(["vlc", "kodi"]);
        let vlc = app("Vlc", "Video", ArchGate::Any, &["vlc"]);
        let kodi = app("Kodi", "Video", ArchGate::Any, &["kodi", "vlc"]);
        let gimp = app("Gimp", "Graphics", ArchGate::Any, &["gimp"]);

        let summary = summarize_selection(&[&vlc, &kodi], &installed);
        assert!(summary.can_install);
        assert!(summary.can_uninstall);
        assert_eq!(summary.install_label(), "Reinstall");
        assert_eq!(summary.uninstall_names, vec!["vlc", "kodi"]);

        let summary = summarize_selection(&[&vlc, &gimp], &installed);
        assert!(summary.can_install);
        assert!(!summary.can_uninstall);
        assert_eq!(summary.install_label(), "Install");

        assert_eq!(summarize_selection(&[], &installed), SelectionSummary::default());
    }
}
