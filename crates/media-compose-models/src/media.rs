use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
    Book,
    Music,
    Podcast,
    Game,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
            MediaType::Book => "book",
            MediaType::Music => "music",
            MediaType::Podcast => "podcast",
            MediaType::Game => "game",
        }
    }

    /// Parse the type names that show up across search providers
    /// ("show", "series", "album", "track", "videogame", ...).
    pub fn parse_loose(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "movie" | "film" | "feature" => Some(MediaType::Movie),
            "tv" | "show" | "series" | "tv_show" | "tvshow" | "tv-series" => Some(MediaType::Tv),
            "book" | "ebook" | "audiobook" | "novel" => Some(MediaType::Book),
            "music" | "album" | "track" | "song" | "artist" => Some(MediaType::Music),
            "podcast" | "podcast-episode" => Some(MediaType::Podcast),
            "game" | "videogame" | "video_game" => Some(MediaType::Game),
            _ => None,
        }
    }

    /// External catalog a reference of this type comes from when the search
    /// result does not say.
    pub fn default_source(&self) -> &'static str {
        match self {
            MediaType::Movie | MediaType::Tv => "tmdb",
            MediaType::Book => "openlibrary",
            MediaType::Music => "spotify",
            MediaType::Podcast => "itunes",
            MediaType::Game => "igdb",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical reference to one piece of media, produced once at the search
/// boundary and used everywhere downstream.
///
/// Two references are the same media when `(external_id, external_source)`
/// match; title and artwork are display data only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaReference {
    pub title: String,
    pub media_type: MediaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub external_id: String,
    pub external_source: String,
}

impl MediaReference {
    pub fn new(
        title: impl Into<String>,
        media_type: MediaType,
        external_id: impl Into<String>,
        external_source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            media_type,
            creator: None,
            image_url: None,
            external_id: external_id.into(),
            external_source: external_source.into(),
        }
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn is_tv(&self) -> bool {
        self.media_type == MediaType::Tv
    }

    /// Stable "source:id" key, e.g. `tmdb:438631`
    pub fn key(&self) -> String {
        format!("{}:{}", self.external_source, self.external_id)
    }
}

impl PartialEq for MediaReference {
    fn eq(&self, other: &Self) -> bool {
        self.external_id == other.external_id && self.external_source == other.external_source
    }
}

impl Eq for MediaReference {}

impl Hash for MediaReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.external_id.hash(state);
        self.external_source.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equality_ignores_display_fields() {
        let a = MediaReference::new("Dune", MediaType::Movie, "438631", "tmdb");
        let b = MediaReference::new("Dune: Part One", MediaType::Movie, "438631", "tmdb")
            .with_image("https://image.tmdb.org/t/p/w500/d5NXSklXo0qyIYkgV94XAgMIckC.jpg");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }

    #[test]
    fn test_same_id_different_source_is_different_media() {
        let a = MediaReference::new("Dune", MediaType::Movie, "438631", "tmdb");
        let b = MediaReference::new("Dune", MediaType::Book, "438631", "openlibrary");
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_loose() {
        assert_eq!(MediaType::parse_loose("Series"), Some(MediaType::Tv));
        assert_eq!(MediaType::parse_loose("album"), Some(MediaType::Music));
        assert_eq!(MediaType::parse_loose(" movie "), Some(MediaType::Movie));
        assert_eq!(MediaType::parse_loose("comic"), None);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&MediaType::Tv).unwrap();
        assert_eq!(json, "\"tv\"");
    }
}
