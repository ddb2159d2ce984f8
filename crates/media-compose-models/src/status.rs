use serde::{Deserialize, Serialize};
use std::fmt;

/// Default lists every account has. The backend recognises these by their
/// normalized type name rather than by list id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SystemList {
    /// Done with it (watched, read, played)
    Finished,
    /// In progress
    Currently,
    /// Want to get to
    Queue,
    Favorites,
    /// Did not finish
    Dnf,
}

impl SystemList {
    pub const ALL: [SystemList; 5] = [
        SystemList::Finished,
        SystemList::Currently,
        SystemList::Queue,
        SystemList::Favorites,
        SystemList::Dnf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SystemList::Finished => "finished",
            SystemList::Currently => "currently",
            SystemList::Queue => "queue",
            SystemList::Favorites => "favorites",
            SystemList::Dnf => "dnf",
        }
    }

    /// Exact match against the normalized vocabulary.
    pub fn from_normalized(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|list| list.as_str() == value)
    }
}

impl fmt::Display for SystemList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
