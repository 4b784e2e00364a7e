use serde::{Deserialize, Serialize};
use std::fmt;

/// Trading action recommended for a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Buy, Action::Sell, Action::Hold];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        }
    }

    /// Earliest standalone BUY/SELL/HOLD keyword in `text`, case-insensitive
    pub fn find_in(text: &str) -> Option<Action> {
        // ASCII uppercasing keeps byte offsets stable for the boundary checks
        let upper = text.to_ascii_uppercase();
        Self::ALL
            .iter()
            .filter_map(|action| first_word_match(&upper, action.as_str()).map(|pos| (pos, *action)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, action)| action)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn first_word_match(haystack: &str, word: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    haystack.match_indices(word).map(|(pos, _)| pos).find(|&pos| {
        let before_ok = pos == 0 || !bytes[pos - 1].is_ascii_alphanumeric();
        let end = pos + word.len();
        let after_ok = end >= bytes.len() || !bytes[end].is_ascii_alphanumeric();
        before_ok && after_ok
    })
}

/// Normalized outcome of the analysis step for one token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Recommendation { action: Action, rationale: String },
    Failure { detail: String },
}

impl Verdict {
    pub fn recommendation(action: Action, rationale: impl Into<String>) -> Self {
        Verdict::Recommendation {
            action,
            rationale: rationale.into(),
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Verdict::Failure {
            detail: detail.into(),
        }
    }

    pub fn is_recommendation(&self) -> bool {
        matches!(self, Verdict::Recommendation { .. })
    }

    pub fn action(&self) -> Option<Action> {
        match self {
            Verdict::Recommendation { action, .. } => Some(*action),
            Verdict::Failure { .. } => None,
        }
    }
}
