//! Version history menu.
//!
//! Renders the `versions` list a form fetch returned. No history (absent or
//! empty) gives a disabled menu holding a single "None" entry. Otherwise the menu
//! is a "Revert to…" sentinel followed by one entry per version, most recent
//! first, in the order the server sent them. Picking an entry only names a
//! version; loading it is the controller's job.

use api::{VersionEntry, VersionId};

pub const NONE_LABEL: &str = "None";
pub const REVERT_LABEL: &str = "Revert to…";

/// One entry of the rendered menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MenuOption {
    /// Placeholder shown when there is no history.
    Empty,
    /// Leading "Revert to…" entry; selecting it does nothing.
    Sentinel,
    Version(VersionEntry),
}

impl MenuOption {
    pub fn label(&self) -> &str {
        match self {
            MenuOption::Empty => NONE_LABEL,
            MenuOption::Sentinel => REVERT_LABEL,
            MenuOption::Version(entry) => &entry.label,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VersionMenu {
    entries: Vec<VersionEntry>,
}

impl VersionMenu {
    pub fn new(versions: Option<&[VersionEntry]>) -> Self {
        Self {
            entries: versions.map(<[VersionEntry]>::to_vec).unwrap_or_default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn options(&self) -> Vec<MenuOption> {
        if self.entries.is_empty() {
            return vec![MenuOption::Empty];
        }
        std::iter::once(MenuOption::Sentinel)
            .chain(self.entries.iter().cloned().map(MenuOption::Version))
            .collect()
    }

    /// Version named by the option at `index` of [`options`](Self::options).
    /// The sentinel, the placeholder and out-of-range indexes name nothing.
    pub fn select(&self, index: usize) -> Option<VersionId> {
        match self.options().into_iter().nth(index)? {
            MenuOption::Version(entry) => Some(entry.version_id),
            MenuOption::Empty | MenuOption::Sentinel => None,
        }
    }
}
