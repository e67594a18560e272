use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::TournamentId;

/// A stored tournament.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub description: String,
    /// RFC3339
    pub date: DateTime<Utc>,
    pub kind: EntrantKind,
    pub max_entrants: Option<u64>,
    /// Nickname of the user who created the tournament.
    pub owner: String,
}

/// The body of a `POST /createtournament` request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentCreation {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// RFC3339, defaults to the time of creation.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub kind: EntrantKind,
    #[serde(default)]
    pub max_entrants: Option<u64>,
}

/// The type of entrants accepted by the tournament.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrantKind {
    Player,
    #[default]
    Team,
}

impl Display for EntrantKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Player => "Player",
                Self::Team => "Team",
            }
        )
    }
}
