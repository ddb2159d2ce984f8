use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    #[default]
    List,
    Rank,
}

/// One row of the user's list/rank catalog as the backend returns it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListCatalogEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub kind: CatalogKind,
}

impl ListCatalogEntry {
    pub fn user_list(id: impl Into<String>, title: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            is_default: false,
            owner_id: Some(owner_id.into()),
            kind: CatalogKind::List,
        }
    }

    pub fn default_list(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            is_default: true,
            owner_id: None,
            kind: CatalogKind::List,
        }
    }

    pub fn rank(id: impl Into<String>, title: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            kind: CatalogKind::Rank,
            ..Self::user_list(id, title, owner_id)
        }
    }
}

/// A list or rank chosen as a draft attachment, classified against the
/// catalog. Derived on selection, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachmentTarget {
    pub id: String,
    pub is_system_list: bool,
    /// Normalized list type for system lists (`finished`, `queue`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inferred_type: Option<String>,
}

pub type ListTarget = AttachmentTarget;
pub type RankTarget = AttachmentTarget;
