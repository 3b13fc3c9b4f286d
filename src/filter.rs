use clap::ValueEnum;

use crate::types::{PackageRecord, PackageStatus};

/// Which package statuses a list shows.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum StatusFilter {
    #[default]
    All,
    Installed,
    Upgradable,
    NotInstalled,
}

impl StatusFilter {
    fn admits(self, status: PackageStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Installed => status == PackageStatus::Installed,
            StatusFilter::Upgradable => status == PackageStatus::Upgradable,
            StatusFilter::NotInstalled => status == PackageStatus::NotInstalled,
        }
    }
}

/// Whether `record` passes both the status filter and the search term.
///
/// The term is matched case-insensitively against the name and the description; an empty
/// term matches everything.
pub(crate) fn is_visible(record: &PackageRecord, filter: StatusFilter, term: &str) -> bool {
    if !filter.admits(record.status) {
        return false;
    }

    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    record.name.to_lowercase().contains(&needle)
        || record.description.to_lowercase().contains(&needle)
}

pub(crate) fn visible_records<'a>(
    records: &'a [PackageRecord],
    filter: StatusFilter,
    term: &str,
) -> Vec<&'a PackageRecord> {
    records
        .iter()
        .filter(|record| is_visible(record, filter, term))
        .collect()
}
