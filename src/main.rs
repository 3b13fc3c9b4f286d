mod apt;
mod backend;
mod catalog;
mod error;
mod filter;
mod installed;
mod popular;
mod session;
mod settings;
mod types;
mod version;

use std::cmp::Ordering;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, mpsc};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{debug, info, warn};

use crate::apt::{AptBackend, run_apt_install, run_apt_remove, run_apt_update, run_hook};
use crate::filter::{StatusFilter, visible_records};
use crate::popular::{
    InstallStep, PopularApp, execute_plan, group_by_category, load_available_apps,
    plan_install, search, summarize_selection,
};
use crate::session::PackageSession;
use crate::settings::{AppSettings, load_app_settings, load_repository_table, save_app_settings};
use crate::types::{Arch, SourceId};
use crate::version::Version;

#[derive(Parser)]
#[command(name = "mxpm", version, about = "Browse and install packages from MX and Debian repositories")]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare two Debian version strings
    Compare { a: String, b: String },
    /// List the packages of a repository
    Packages {
        #[arg(long, value_enum)]
        source: Option<SourceId>,
        #[arg(long, value_enum, default_value = "all")]
        filter: StatusFilter,
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Refresh several repositories at once
    Refresh {
        #[arg(value_enum)]
        sources: Vec<SourceId>,
    },
    /// List the curated popular applications
    Popular {
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Install popular applications by name
    Install {
        #[arg(required = true)]
        apps: Vec<String>,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Remove popular applications by name
    Uninstall {
        #[arg(required = true)]
        apps: Vec<String>,
        #[arg(short, long)]
        yes: bool,
    },
    /// Show or change saved preferences
    Config {
        #[arg(long, value_enum)]
        default_source: Option<SourceId>,
        #[arg(long)]
        terminal: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let settings = load_app_settings();
    match cli.command {
        Command::Compare { a, b } => {
            for raw in [&a, &b] {
                let parsed = Version::parse(raw);
                debug!(
                    "{}: epoch {:?}, upstream {:?}, revision {:?}",
                    parsed,
                    parsed.epoch(),
                    parsed.upstream(),
                    parsed.revision()
                );
            }
            let symbol = match version::compare(&a, &b) {
                Ordering::Less => "<",
                Ordering::Equal => "=",
                Ordering::Greater => ">",
            };
            println!("{} {} {}", a, symbol, b);
            Ok(())
        }
        Command::Packages {
            source,
            filter,
            search,
        } => {
            let source = source.unwrap_or(settings.default_source);
            let (mut session, _) = open_session(&settings)?;
            let catalog = session.load(source, false)?;
            for record in visible_records(catalog.records(), filter, &search) {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    record.name,
                    record.status.label(),
                    record.installed_version,
                    record.candidate_version,
                    record.tooltip.replace('\n', "; ")
                );
            }
            info!(
                "{} packages in {}, loaded {}",
                catalog.len(),
                source,
                catalog.loaded_at().format("%Y-%m-%d %H:%M:%S")
            );
            Ok(())
        }
        Command::Refresh { sources } => {
            let sources = if sources.is_empty() {
                SourceId::all().to_vec()
            } else {
                sources
            };
            refresh_all(&settings, &sources)
        }
        Command::Popular { search: term } => {
            let (session, arch) = open_session(&settings)?;
            let installed = session.installed();
            let apps = load_available_apps(&settings.popular_apps_dir, &arch);
            let matches: Vec<PopularApp> = search(&apps, &term).into_iter().cloned().collect();
            for (category, members) in group_by_category(&matches) {
                println!("{}", category);
                for app in members {
                    let marker = if app.is_already_installed(&installed) {
                        "[installed]"
                    } else {
                        ""
                    };
                    println!("  {}\t{}\t{}", app.name, app.description, marker);
                    if let Some(url) = app.screenshot_url() {
                        debug!("{} screenshot: {}", app.name, url);
                    }
                }
            }
            Ok(())
        }
        Command::Install { apps, yes } => install(&settings, &apps, yes),
        Command::Uninstall { apps, yes } => uninstall(&settings, &apps, yes),
        Command::Config {
            default_source,
            terminal,
        } => {
            let mut settings = settings;
            let changed = default_source.is_some() || terminal.is_some();
            if let Some(source) = default_source {
                settings.default_source = source;
            }
            if let Some(terminal) = terminal {
                settings.terminal = terminal;
            }
            if changed {
                save_app_settings(&settings)?;
            }
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

/// Session over the real package system, plus the architecture it was opened for.
fn open_session(settings: &AppSettings) -> Result<(PackageSession, Arch)> {
    let arch = apt::detect_arch().context("failed to detect the machine architecture")?;
    let repositories = load_repository_table()?;
    let backend = AptBackend::new(settings, repositories, arch.clone());
    let session =
        PackageSession::open(Arc::new(backend)).context("failed to read installed packages")?;
    Ok((session, arch))
}

fn refresh_all(settings: &AppSettings, sources: &[SourceId]) -> Result<()> {
    let (mut session, _) = open_session(settings)?;
    let (sender, receiver) = mpsc::channel();

    let mut workers = Vec::new();
    for source in sources {
        if session.is_refreshing(*source) {
            continue;
        }
        let (_cancel, handle) = session.start_refresh(*source, sender.clone())?;
        workers.push((*source, handle));
    }
    drop(sender);

    for message in receiver {
        match session.complete_refresh(message) {
            Ok(catalog) => println!("{}\t{} packages", catalog.source(), catalog.len()),
            Err(err) => warn!("{}", err),
        }
    }
    for (source, handle) in workers {
        session.join_refresh(source, handle);
    }
    Ok(())
}

fn select_apps<'a>(apps: &'a [PopularApp], names: &[String]) -> Result<Vec<&'a PopularApp>> {
    names
        .iter()
        .map(|wanted| {
            apps.iter()
                .find(|app| app.name.eq_ignore_ascii_case(wanted))
                .with_context(|| format!("no popular app named {}", wanted))
        })
        .collect()
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn install(settings: &AppSettings, names: &[String], yes: bool) -> Result<()> {
    let (mut session, arch) = open_session(settings)?;
    let apps = load_available_apps(&settings.popular_apps_dir, &arch);
    let selected = select_apps(&apps, names)?;
    let summary = summarize_selection(&selected, &session.installed());
    let plan = plan_install(&selected);

    for step in &plan {
        println!("{}", step);
    }
    if settings.confirm_install && !yes && !confirm(&format!("{}?", summary.install_label()))? {
        return Ok(());
    }

    let outcome = execute_plan(&plan, |step| match step {
        InstallStep::UpdateLists => run_apt_update(),
        InstallStep::PreInstall { script, .. } | InstallStep::PostInstall { script, .. } => {
            run_hook(script)
        }
        InstallStep::Install { names, .. } => run_apt_install(&settings.terminal, names),
    });
    session.finish_change(outcome)?;
    println!("Process finished.");
    Ok(())
}

fn uninstall(settings: &AppSettings, names: &[String], yes: bool) -> Result<()> {
    let (mut session, arch) = open_session(settings)?;
    let apps = load_available_apps(&settings.popular_apps_dir, &arch);
    let selected = select_apps(&apps, names)?;
    let summary = summarize_selection(&selected, &session.installed());
    if !summary.can_uninstall {
        bail!("only applications that are fully installed can be removed");
    }

    let packages = summary.uninstall_names.join(" ");
    if settings.confirm_remove && !yes && !confirm(&format!("Remove {}?", packages))? {
        return Ok(());
    }

    let removal = run_apt_remove(&settings.terminal, &summary.uninstall_names);
    let result = session.finish_change(removal)?;
    if !result.success() {
        bail!("apt-get remove {} failed: {}", packages, result.failure_message());
    }
    Ok(())
}
