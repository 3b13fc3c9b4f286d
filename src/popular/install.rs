use std::fmt;

use log::{info, warn};

use crate::error::{Error, Result};
use crate::types::CommandResult;

use super::catalog::PopularApp;

/// One command of an install run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InstallStep {
    UpdateLists,
    PreInstall { app: String, script: String },
    /// `apps` names every app the packages belong to; a batched step lists several.
    Install { apps: Vec<String>, names: Vec<String> },
    PostInstall { app: String, script: String },
}

impl InstallStep {
    /// Which app a failure of this step is reported against.
    pub fn app_label(&self) -> String {
        match self {
            InstallStep::UpdateLists => "package lists".to_string(),
            InstallStep::PreInstall { app, .. } | InstallStep::PostInstall { app, .. } => {
                app.clone()
            }
            InstallStep::Install { apps, .. } => apps.join(", "),
        }
    }
}

impl fmt::Display for InstallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallStep::UpdateLists => write!(f, "apt-get update"),
            InstallStep::PreInstall { app, .. } => write!(f, "Pre-processing for {}", app),
            InstallStep::Install { names, .. } => write!(f, "apt-get install {}", names.join(" ")),
            InstallStep::PostInstall { app, .. } => write!(f, "Post-processing for {}", app),
        }
    }
}

/// Order the work for installing `apps`.
///
/// The package lists are updated once. Apps without a pre-install hook share a single
/// install command, followed by their post-install hooks in load order. Every other app
/// then runs its own pre-install, install and post-install in turn. Empty installs and
/// empty hooks are left out.
pub(crate) fn plan_install(apps: &[&PopularApp]) -> Vec<InstallStep> {
    let mut steps = vec![InstallStep::UpdateLists];

    let (batched, hooked): (Vec<&PopularApp>, Vec<&PopularApp>) =
        apps.iter().copied().partition(|app| app.is_batchable());

    let mut batch_apps = Vec::new();
    let mut batch_names: Vec<String> = Vec::new();
    for app in &batched {
        if app.install_names.is_empty() {
            continue;
        }
        batch_apps.push(app.name.clone());
        for name in &app.install_names {
            if !batch_names.contains(name) {
                batch_names.push(name.clone());
            }
        }
    }
    if !batch_names.is_empty() {
        steps.push(InstallStep::Install {
            apps: batch_apps,
            names: batch_names,
        });
    }
    for app in &batched {
        push_post_install(&mut steps, app);
    }

    for app in hooked {
        steps.push(InstallStep::PreInstall {
            app: app.name.clone(),
            script: app.preinstall.trim().to_string(),
        });
        if !app.install_names.is_empty() {
            steps.push(InstallStep::Install {
                apps: vec![app.name.clone()],
                names: app.install_names.clone(),
            });
        }
        push_post_install(&mut steps, app);
    }

    steps
}

fn push_post_install(steps: &mut Vec<InstallStep>, app: &PopularApp) {
    let script = app.postinstall.trim();
    if !script.is_empty() {
        steps.push(InstallStep::PostInstall {
            app: app.name.clone(),
            script: script.to_string(),
        });
    }
}

/// Run `steps` in order through `run`, stopping at the first one that fails.
pub(crate) fn execute_plan<F>(steps: &[InstallStep], mut run: F) -> Result<()>
where
    F: FnMut(&InstallStep) -> Result<CommandResult>,
{
    for step in steps {
        info!("{}", step);
        let failure = match run(step) {
            Ok(result) if result.success() => continue,
            Ok(result) => Error::CommandFailed {
                program: step.to_string(),
                code: result.code,
                stderr: result.failure_message(),
            },
            Err(err) => err,
        };

        warn!("install step failed for {}: {}", step.app_label(), failure);
        return Err(Error::InstallFailed {
            app: step.app_label(),
            source: Box::new(failure),
        });
    }
    Ok(())
}
