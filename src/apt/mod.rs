mod commands;
mod parser;
mod privilege;

pub(crate) use commands::{
    AptBackend, detect_arch, run_apt_install, run_apt_remove, run_apt_update, run_hook,
};
pub(crate) use parser::{IndexEntry, PolicyFacts, parse_package_index, strip_arch_qualifier};
