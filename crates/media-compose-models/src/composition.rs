use serde::{Deserialize, Serialize};
use std::fmt;

use crate::list::{ListTarget, RankTarget};

/// Top-level user goal; constrains which actions are reachable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Log something you watched/read/played
    Capture,
    /// Share an opinion
    Say,
    /// Start an interactive thing (poll, rank, challenge)
    Play,
}

impl Intent {
    pub fn allowed_actions(&self) -> &'static [Action] {
        match self {
            Intent::Capture => &[Action::Track],
            Intent::Say => &[Action::Post, Action::HotTake, Action::AskForRecs],
            Intent::Play => &[Action::Poll, Action::Rank, Action::Challenge],
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        self.allowed_actions().contains(&action)
    }

    /// Action selected automatically when the intent is chosen.
    pub fn default_action(&self) -> Option<Action> {
        match self {
            Intent::Capture => Some(Action::Track),
            Intent::Say => Some(Action::Post),
            Intent::Play => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Capture => "capture",
            Intent::Say => "say",
            Intent::Play => "play",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The concrete composition type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Track,
    #[serde(alias = "thought")]
    Post,
    HotTake,
    Poll,
    AskForRecs,
    Rank,
    Challenge,
}

impl Action {
    pub fn intent(&self) -> Intent {
        match self {
            Action::Track => Intent::Capture,
            Action::Post | Action::HotTake | Action::AskForRecs => Intent::Say,
            Action::Poll | Action::Rank | Action::Challenge => Intent::Play,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Track => "track",
            Action::Post => "post",
            Action::HotTake => "hot_take",
            Action::Poll => "poll",
            Action::AskForRecs => "ask_for_recs",
            Action::Rank => "rank",
            Action::Challenge => "challenge",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Followers,
    Private,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Attachments {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<ListTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<RankTarget>,
    #[serde(default)]
    pub post_to_feed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_action_belongs_to_its_intent() {
        for intent in [Intent::Capture, Intent::Say, Intent::Play] {
            for action in intent.allowed_actions() {
                assert_eq!(action.intent(), intent);
            }
        }
    }

    #[test]
    fn test_default_actions_are_allowed() {
        assert_eq!(Intent::Capture.default_action(), Some(Action::Track));
        assert_eq!(Intent::Say.default_action(), Some(Action::Post));
        assert_eq!(Intent::Play.default_action(), None);
        assert!(!Intent::Say.allows(Action::Poll));
    }

    #[test]
    fn test_thought_is_an_alias_for_post() {
        let action: Action = serde_json::from_str("\"thought\"").unwrap();
        assert_eq!(action, Action::Post);
        assert_eq!(serde_json::to_string(&Action::AskForRecs).unwrap(), "\"ask_for_recs\"");
    }
}
