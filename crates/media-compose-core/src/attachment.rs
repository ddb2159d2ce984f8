// Classifies list/rank catalog entries as system or user-defined and maps
// them to a backend destination. Pure; no I/O.

use media_compose_backend::TrackDestination;
use media_compose_models::{AttachmentTarget, CatalogKind, ListCatalogEntry, SystemList};
use tracing::debug;

/// Title fragments that identify a system list when the title is not an
/// exact vocabulary word ("My Watchlist", "Did Not Finish").
const SUBSTRING_ALIASES: &[(&str, SystemList)] = &[
    ("did not finish", SystemList::Dnf),
    ("dnf", SystemList::Dnf),
    ("finished", SystemList::Finished),
    ("currently", SystemList::Currently),
    ("watchlist", SystemList::Queue),
    ("want to", SystemList::Queue),
    ("queue", SystemList::Queue),
    ("favourites", SystemList::Favorites),
    ("favorites", SystemList::Favorites),
    ("favorite", SystemList::Favorites),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct AttachmentResolver;

impl AttachmentResolver {
    pub fn new() -> Self {
        Self
    }

    /// Lowercase, trim, collapse runs of whitespace/punctuation to one space.
    pub fn normalize_title(title: &str) -> String {
        let mut out = String::with_capacity(title.len());
        let mut pending_space = false;
        for c in title.trim().chars() {
            if c.is_alphanumeric() {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.extend(c.to_lowercase());
            } else {
                pending_space = true;
            }
        }
        out
    }

    fn substring_match(normalized: &str) -> Option<SystemList> {
        SUBSTRING_ALIASES
            .iter()
            .find(|(fragment, _)| normalized.contains(fragment))
            .map(|(_, list)| *list)
    }

    /// Classify one catalog entry.
    ///
    /// Priority: exact vocabulary match on the normalized title, then the
    /// explicit default/ownerless marker, then a substring match on the
    /// title. Ranks are only system entries when explicitly marked. A marked
    /// entry whose title names no vocabulary word stays a system entry with
    /// no inferred type, which `destination` routes by id.
    pub fn classify(&self, entry: &ListCatalogEntry) -> AttachmentTarget {
        let normalized = Self::normalize_title(&entry.title);
        let explicit_default = entry.is_default || entry.owner_id.is_none();

        if entry.kind == CatalogKind::Rank {
            return AttachmentTarget {
                id: entry.id.clone(),
                is_system_list: entry.is_default,
                inferred_type: None,
            };
        }

        if let Some(list) = SystemList::from_normalized(&normalized) {
            return Self::system(entry, list);
        }

        match Self::substring_match(&normalized) {
            Some(list) => Self::system(entry, list),
            None if explicit_default => {
                debug!(list_id = %entry.id, title = %entry.title, "Default list has no system list type; routing by id");
                AttachmentTarget {
                    id: entry.id.clone(),
                    is_system_list: true,
                    inferred_type: None,
                }
            }
            None => AttachmentTarget {
                id: entry.id.clone(),
                is_system_list: false,
                inferred_type: None,
            },
        }
    }

    fn system(entry: &ListCatalogEntry, list: SystemList) -> AttachmentTarget {
        debug!(list_id = %entry.id, title = %entry.title, list_type = %list, "Classified as system list");
        AttachmentTarget {
            id: entry.id.clone(),
            is_system_list: true,
            inferred_type: Some(list.as_str().to_string()),
        }
    }

    /// Classify the catalog entry with `id`, or None when it is not in the
    /// catalog.
    pub fn resolve(&self, catalog: &[ListCatalogEntry], id: &str) -> Option<AttachmentTarget> {
        catalog.iter().find(|entry| entry.id == id).map(|entry| self.classify(entry))
    }

    /// Resolve a user-supplied selector: a catalog id, a catalog title, or a
    /// bare system list name that is not in the catalog at all.
    pub fn resolve_selector(&self, catalog: &[ListCatalogEntry], selector: &str) -> Option<AttachmentTarget> {
        if let Some(target) = self.resolve(catalog, selector) {
            return Some(target);
        }
        let normalized = Self::normalize_title(selector);
        if let Some(entry) = catalog
            .iter()
            .find(|entry| Self::normalize_title(&entry.title) == normalized)
        {
            return Some(self.classify(entry));
        }
        SystemList::from_normalized(&normalized).map(|list| AttachmentTarget {
            id: list.as_str().to_string(),
            is_system_list: true,
            inferred_type: Some(list.as_str().to_string()),
        })
    }

    /// Backend destination for a resolved list target. System routes only
    /// carry vocabulary words; anything else goes by list id.
    pub fn destination(&self, target: &AttachmentTarget) -> TrackDestination {
        let system = target
            .inferred_type
            .as_deref()
            .filter(|_| target.is_system_list)
            .and_then(SystemList::from_normalized);
        match system {
            Some(list) => Self::system_destination(list),
            None => TrackDestination::custom(target.id.clone()),
        }
    }

    pub fn system_destination(list: SystemList) -> TrackDestination {
        TrackDestination::system(list.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(entry: ListCatalogEntry) -> AttachmentTarget {
        AttachmentResolver::new().classify(&entry)
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(AttachmentResolver::normalize_title("  Currently   Watching! "), "currently watching");
        assert_eq!(AttachmentResolver::normalize_title("DNF"), "dnf");
        assert_eq!(AttachmentResolver::normalize_title("--"), "");
    }

    #[test]
    fn test_exact_vocabulary_match_wins() {
        let target = classify(ListCatalogEntry::user_list("l-1", "Finished", "u-1"));
        assert!(target.is_system_list);
        assert_eq!(target.inferred_type.as_deref(), Some("finished"));
    }

    #[test]
    fn test_default_marker_with_unknown_title() {
        let target = classify(ListCatalogEntry::default_list("l-2", "Rewatch Pile"));
        assert!(target.is_system_list);
        assert_eq!(target.inferred_type, None);
        assert_eq!(
            AttachmentResolver::new().destination(&target),
            TrackDestination::custom("l-2")
        );

        let target = classify(ListCatalogEntry::default_list("l-3", "My Favourites"));
        assert_eq!(target.inferred_type.as_deref(), Some("favorites"));
    }

    #[test]
    fn test_substring_match_on_user_titles() {
        let target = classify(ListCatalogEntry::user_list("l-4", "My Watchlist", "u-1"));
        assert!(target.is_system_list);
        assert_eq!(target.inferred_type.as_deref(), Some("queue"));

        let target = classify(ListCatalogEntry::user_list("l-5", "Did Not Finish (2024)", "u-1"));
        assert_eq!(target.inferred_type.as_deref(), Some("dnf"));
    }

    #[test]
    fn test_user_defined_list() {
        let target = classify(ListCatalogEntry::user_list("abc-123", "Cozy Mysteries", "u-1"));
        assert!(!target.is_system_list);
        assert_eq!(target.inferred_type, None);
        assert_eq!(
            AttachmentResolver::new().destination(&target),
            TrackDestination::custom("abc-123")
        );
    }

    #[test]
    fn test_ranks_need_explicit_marker() {
        let target = classify(ListCatalogEntry::rank("r-1", "Favorite Pixar Films", "u-1"));
        assert!(!target.is_system_list);
        assert_eq!(target.inferred_type, None);
    }

    #[test]
    fn test_system_destination_uses_list_type() {
        let target = classify(ListCatalogEntry::user_list("l-9", "Queue", "u-1"));
        assert_eq!(
            AttachmentResolver::new().destination(&target),
            TrackDestination::system("queue")
        );
    }

    #[test]
    fn test_system_target_outside_vocabulary_routes_by_id() {
        let target = AttachmentTarget {
            id: "l-7".into(),
            is_system_list: true,
            inferred_type: Some("rewatch_pile".into()),
        };
        assert_eq!(
            AttachmentResolver::new().destination(&target),
            TrackDestination::custom("l-7")
        );
    }

    #[test]
    fn test_resolve_selector() {
        let catalog = vec![
            ListCatalogEntry::user_list("abc-123", "Cozy Mysteries", "u-1"),
            ListCatalogEntry::default_list("l-1", "Finished"),
        ];
        let resolver = AttachmentResolver::new();

        assert_eq!(resolver.resolve_selector(&catalog, "abc-123").unwrap().id, "abc-123");
        assert_eq!(resolver.resolve_selector(&catalog, "cozy mysteries").unwrap().id, "abc-123");

        let dnf = resolver.resolve_selector(&catalog, "dnf").unwrap();
        assert!(dnf.is_system_list);
        assert_eq!(resolver.destination(&dnf), TrackDestination::system("dnf"));

        assert!(resolver.resolve_selector(&catalog, "nope").is_none());
        assert!(resolver.resolve(&catalog, "nope").is_none());
    }
}
