// Normalizes heterogeneous search results into MediaReference.
// Every provider names things differently; this is the only place that knows.

use media_compose_models::{MediaReference, MediaType};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

const TITLE_FIELDS: &[&str] = &[
    "title",
    "name",
    "original_title",
    "original_name",
    "collectionName",
    "trackName",
];
const TYPE_FIELDS: &[&str] = &["media_type", "mediaType", "type", "kind", "wrapperType"];
const CREATOR_FIELDS: &[&str] = &[
    "creator",
    "author",
    "author_name",
    "artist",
    "artistName",
    "director",
    "publisher",
    "developer",
];
const IMAGE_FIELDS: &[&str] = &[
    "image",
    "imageUrl",
    "image_url",
    "poster_url",
    "thumbnail",
    "artworkUrl100",
    "cover",
    "cover_url",
];
const ID_FIELDS: &[&str] = &[
    "external_id",
    "externalId",
    "id",
    "tmdb_id",
    "trackId",
    "collectionId",
    "key",
];
const SOURCE_FIELDS: &[&str] = &["external_source", "externalSource", "source"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("search result is not an object")]
    NotAnObject,

    #[error("search result has no title")]
    MissingTitle,

    #[error("search result has no identifier")]
    MissingId,

    #[error("unrecognized media type: {0}")]
    UnknownType(String),
}

/// String value of the first present, non-empty field. Numbers are accepted
/// and rendered as strings (TMDB and iTunes ids are numeric).
fn first_string(object: &serde_json::Map<String, Value>, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match object.get(*field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Creator may also arrive as a list of author names.
fn creator_of(object: &serde_json::Map<String, Value>) -> Option<String> {
    first_string(object, CREATOR_FIELDS).or_else(|| {
        ["authors", "author_name", "artists"].iter().find_map(|field| {
            let first = object.get(*field)?.as_array()?.first()?;
            match first {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Object(inner) => first_string(inner, &["name"]),
                _ => None,
            }
        })
    })
}

fn image_of(object: &serde_json::Map<String, Value>) -> Option<String> {
    if let Some(url) = first_string(object, IMAGE_FIELDS) {
        return Some(url);
    }
    // TMDB returns a bare path
    let path = first_string(object, &["poster_path", "still_path"])?;
    if path.starts_with("http://") || path.starts_with("https://") {
        Some(path)
    } else {
        Some(format!("{}{}", TMDB_IMAGE_BASE, path))
    }
}

/// Converts provider-shaped search results into canonical references.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaReferenceResolver;

impl MediaReferenceResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, raw: &Value) -> Result<MediaReference, ResolveError> {
        let object = raw.as_object().ok_or(ResolveError::NotAnObject)?;

        let title = first_string(object, TITLE_FIELDS).ok_or(ResolveError::MissingTitle)?;
        let external_id = first_string(object, ID_FIELDS).ok_or(ResolveError::MissingId)?;

        let raw_type = first_string(object, TYPE_FIELDS);
        let media_type = match raw_type {
            Some(ref value) => {
                MediaType::parse_loose(value).ok_or_else(|| ResolveError::UnknownType(value.clone()))?
            }
            // TMDB movie results carry `title`, TV results carry `name`
            None if object.contains_key("first_air_date") => MediaType::Tv,
            None if object.contains_key("release_date") => MediaType::Movie,
            None => return Err(ResolveError::UnknownType(String::new())),
        };

        let external_source = first_string(object, SOURCE_FIELDS)
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|| media_type.default_source().to_string());

        Ok(MediaReference {
            title,
            media_type,
            creator: creator_of(object),
            image_url: image_of(object),
            external_id,
            external_source,
        })
    }

    /// Resolve a whole result page, skipping entries that cannot be resolved.
    pub fn resolve_all(&self, raw: &[Value]) -> Vec<MediaReference> {
        let resolved: Vec<MediaReference> = raw
            .iter()
            .filter_map(|value| match self.resolve(value) {
                Ok(media) => Some(media),
                Err(e) => {
                    warn!(error = %e, "Skipping unresolvable search result");
                    None
                }
            })
            .collect();
        debug!(input = raw.len(), resolved = resolved.len(), "Resolved search results");
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tmdb_movie_result() {
        let media = MediaReferenceResolver::new()
            .resolve(&json!({
                "id": 438631,
                "title": "Dune",
                "media_type": "movie",
                "poster_path": "/d5NXSklXo0qyIYkgV94XAgMIckC.jpg",
                "release_date": "2021-09-15"
            }))
            .unwrap();
        assert_eq!(media.title, "Dune");
        assert_eq!(media.media_type, MediaType::Movie);
        assert_eq!(media.external_id, "438631");
        assert_eq!(media.external_source, "tmdb");
        assert_eq!(
            media.image_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/d5NXSklXo0qyIYkgV94XAgMIckC.jpg")
        );
    }

    #[test]
    fn test_tv_inferred_from_air_date() {
        let media = MediaReferenceResolver::new()
            .resolve(&json!({"id": 1399, "name": "Game of Thrones", "first_air_date": "2011-04-17"}))
            .unwrap();
        assert!(media.is_tv());
        assert_eq!(media.key(), "tmdb:1399");
    }

    #[test]
    fn test_book_with_author_list() {
        let media = MediaReferenceResolver::new()
            .resolve(&json!({
                "key": "/works/OL893415W",
                "title": "Dune",
                "type": "book",
                "authors": [{"name": "Frank Herbert"}],
                "source": "OpenLibrary"
            }))
            .unwrap();
        assert_eq!(media.media_type, MediaType::Book);
        assert_eq!(media.creator.as_deref(), Some("Frank Herbert"));
        assert_eq!(media.external_source, "openlibrary");
    }

    #[test]
    fn test_itunes_podcast() {
        let media = MediaReferenceResolver::new()
            .resolve(&json!({
                "wrapperType": "podcast",
                "collectionId": 1200361736,
                "collectionName": "The Daily",
                "artistName": "The New York Times",
                "artworkUrl100": "https://is1-ssl.mzstatic.com/daily.jpg"
            }))
            .unwrap();
        assert_eq!(media.media_type, MediaType::Podcast);
        assert_eq!(media.external_id, "1200361736");
        assert_eq!(media.external_source, "itunes");
        assert_eq!(media.creator.as_deref(), Some("The New York Times"));
    }

    #[test]
    fn test_same_media_from_different_shapes_is_equal() {
        let resolver = MediaReferenceResolver::new();
        let a = resolver
            .resolve(&json!({"id": "438631", "title": "Dune", "media_type": "movie"}))
            .unwrap();
        let b = resolver
            .resolve(&json!({"external_id": 438631, "name": "Dune: Part One", "type": "film", "external_source": "tmdb"}))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejections() {
        let resolver = MediaReferenceResolver::new();
        assert_eq!(resolver.resolve(&json!("Dune")), Err(ResolveError::NotAnObject));
        assert_eq!(
            resolver.resolve(&json!({"id": 1, "media_type": "movie"})),
            Err(ResolveError::MissingTitle)
        );
        assert_eq!(
            resolver.resolve(&json!({"title": "Dune", "media_type": "movie"})),
            Err(ResolveError::MissingId)
        );
        assert_eq!(
            resolver.resolve(&json!({"id": 1, "title": "Dune", "media_type": "hologram"})),
            Err(ResolveError::UnknownType("hologram".into()))
        );
    }

    #[test]
    fn test_resolve_all_skips_bad_entries() {
        let results = MediaReferenceResolver::new().resolve_all(&[
            json!({"id": 1, "title": "Heat", "media_type": "movie"}),
            json!({"title": "No id"}),
            json!(42),
        ]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Heat");
    }
}
