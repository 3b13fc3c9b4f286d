mod catalog;
mod descriptor;
mod install;

pub(crate) use catalog::{PopularApp, group_by_category, search, summarize_selection};
pub(crate) use descriptor::load_available_apps;
pub(crate) use install::{InstallStep, execute_plan, plan_install};
