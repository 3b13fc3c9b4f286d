use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;
use xml::reader::{EventReader, XmlEvent};

use crate::error::{Error, Result};

use crate::types::Arch;

use super::catalog::{ArchGate, PopularApp, filter_by_arch};

const DESCRIPTOR_EXTENSION: &str = "pm";

/// Parse one `<app>` descriptor document.
pub(crate) fn parse_descriptor(xml: &str, path: &Path) -> Result<PopularApp> {
    let invalid = |message: String| Error::Descriptor {
        path: path.to_path_buf(),
        message,
    };

    let mut app = PopularApp::default();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut field: Option<String> = None;
    let mut text = String::new();

    for event in EventReader::new(xml.as_bytes()) {
        match event.map_err(|err| invalid(err.to_string()))? {
            XmlEvent::StartElement { name, .. } => {
                depth += 1;
                match depth {
                    1 if name.local_name == "app" => saw_root = true,
                    1 => return Err(invalid(format!("unexpected root <{}>", name.local_name))),
                    2 => {
                        field = Some(name.local_name);
                        text.clear();
                    }
                    _ => {}
                }
            }
            XmlEvent::Characters(chunk) | XmlEvent::CData(chunk) => {
                if depth >= 2 {
                    text.push_str(&chunk);
                }
            }
            XmlEvent::EndElement { .. } => {
                if depth == 2 {
                    if let Some(name) = field.take() {
                        apply_field(&mut app, &name, text.trim());
                    }
                }
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    if !saw_root {
        return Err(invalid("missing <app> element".to_string()));
    }
    if app.name.is_empty() {
        return Err(invalid("app has no <name>".to_string()));
    }

    Ok(app)
}

fn apply_field(app: &mut PopularApp, field: &str, value: &str) {
    match field {
        "category" => app.category = value.to_string(),
        "name" => app.name = value.to_string(),
        "description" => app.description = value.to_string(),
        "installable" => app.arch_gate = ArchGate::from_installable(value),
        "screenshot" => app.screenshot = value.to_string(),
        "preinstall" => app.preinstall = value.to_string(),
        "postinstall" => app.postinstall = value.to_string(),
        "install_package_names" => app.install_names = split_names(value),
        "uninstall_package_names" => app.uninstall_names = split_names(value),
        other => debug!("ignoring descriptor element <{}>", other),
    }
}

/// Package lists may be separated by newlines or spaces; order is kept, duplicates dropped.
fn split_names(value: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    value
        .split_whitespace()
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// Parse every descriptor, skipping invalid ones and later apps that reuse a name.
pub(crate) fn load_descriptors<'a, I>(descriptors: I) -> Vec<PopularApp>
where
    I: IntoIterator<Item = (&'a Path, &'a str)>,
{
    let mut apps: Vec<PopularApp> = Vec::new();
    let mut names = HashSet::new();

    for (path, xml) in descriptors {
        match parse_descriptor(xml, path) {
            Ok(app) => {
                if names.insert(app.name.clone()) {
                    apps.push(app);
                } else {
                    warn!("{}: duplicate app name {}, skipped", path.display(), app.name);
                }
            }
            Err(err) => warn!("could not load document: {}", err),
        }
    }

    apps
}

/// Load all `*.pm` descriptors from `dir` in file name order.
pub(crate) fn load_descriptor_dir(dir: &Path) -> Vec<PopularApp> {
    let files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("could not read {}: {}", dir.display(), err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext == DESCRIPTOR_EXTENSION)
        })
        .collect();

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        match fs::read_to_string(&path) {
            Ok(content) => documents.push((path, content)),
            Err(err) => warn!("could not open {}: {}", path.display(), err),
        }
    }

    let apps = load_descriptors(
        documents
            .iter()
            .map(|(path, content)| (path.as_path(), content.as_str())),
    );
    debug!("loaded {} popular apps from {}", apps.len(), dir.display());
    apps
}

/// Descriptors from `dir` that may be installed on `arch`.
pub(crate) fn load_available_apps(dir: &Path, arch: &Arch) -> Vec<PopularApp> {
    filter_by_arch(&load_descriptor_dir(dir), arch)
}
