use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Season {
    pub number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Episode {
    pub season: u32,
    pub number: u32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub air_date: Option<NaiveDate>,
}

/// The season/episode a draft refers to when logging a single TV episode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeSelection {
    pub season: u32,
    pub episode: u32,
    pub episode_title: String,
}

impl From<&Episode> for EpisodeSelection {
    fn from(episode: &Episode) -> Self {
        Self {
            season: episode.season,
            episode: episode.number,
            episode_title: episode.title.clone(),
        }
    }
}
