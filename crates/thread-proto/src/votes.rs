//! Vote-state derivation — pure functions over a comment's raw vote lists.
//!
//! Everything here is cheap enough to run on every frame: cost is linear in
//! the size of one comment's vote set, and nothing is cached.

use serde::{Deserialize, Serialize};

use crate::model::Comment;
use crate::store::StoreError;

/// A user's vote direction on one comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Vote {
    Down,
    #[default]
    Neutral,
    Up,
}

impl Vote {
    pub fn as_i8(self) -> i8 {
        match self {
            Self::Down => -1,
            Self::Neutral => 0,
            Self::Up => 1,
        }
    }

    /// Direction to write when the user clicks `clicked` while holding `current`.
    ///
    /// Clicking the already-selected arrow retracts the vote; clicking the other
    /// arrow overwrites it.
    pub fn toggled(current: Vote, clicked: Vote) -> Vote {
        if current == clicked {
            Vote::Neutral
        } else {
            clicked
        }
    }
}

impl From<Vote> for i8 {
    fn from(v: Vote) -> i8 {
        v.as_i8()
    }
}

impl TryFrom<i8> for Vote {
    type Error = StoreError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Down),
            0 => Ok(Self::Neutral),
            1 => Ok(Self::Up),
            other => Err(StoreError::InvalidVote(other)),
        }
    }
}

/// The current user's vote on `comment`.
///
/// `Neutral` when the comment or its vote set is absent.  If the user somehow
/// shows up on both sides the upvote wins.
pub fn user_vote_of(comment: Option<&Comment>, user_url: &str) -> Vote {
    let Some(votes) = comment.and_then(|c| c.votes.as_ref()) else {
        return Vote::Neutral;
    };
    if votes.upvotes.iter().any(|d| d.url == user_url) {
        return Vote::Up;
    }
    if votes.downvotes.iter().any(|d| d.url == user_url) {
        return Vote::Down;
    }
    Vote::Neutral
}

/// Net score (upvotes − downvotes), or `None` when there is no vote data.
pub fn karma_of(comment: Option<&Comment>) -> Option<i64> {
    let votes = comment.and_then(|c| c.votes.as_ref())?;
    Some(votes.upvotes.len() as i64 - votes.downvotes.len() as i64)
}
