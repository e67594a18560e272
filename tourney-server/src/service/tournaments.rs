use chrono::Utc;
use tourney_api::id::TournamentId;
use tourney_api::tournaments::{Tournament, TournamentCreation};

use crate::store::{Store, TOURNAMENT_ID_GENERATOR};

const MAX_NAME_LEN: usize = 128;

#[derive(Copy, Clone, Debug)]
pub struct TournamentService<'a> {
    store: &'a Store,
}

impl<'a> TournamentService<'a> {
    #[inline]
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Creates a new tournament owned by `owner`. Returns `false` if the payload is invalid or
    /// the name is already in use.
    pub fn create(&self, payload: &TournamentCreation, owner: &str) -> bool {
        let name = payload.name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            log::debug!("Rejecting tournament: invalid name {:?}", payload.name);
            return false;
        }

        // A tournament needs at least two entrants to play a single match.
        if matches!(payload.max_entrants, Some(n) if n < 2) {
            log::debug!("Rejecting tournament: max_entrants below 2");
            return false;
        }

        let tournament = Tournament {
            id: TournamentId(TOURNAMENT_ID_GENERATOR.generate()),
            name: name.to_owned(),
            description: payload.description.clone(),
            date: payload.date.unwrap_or_else(Utc::now),
            kind: payload.kind,
            max_entrants: payload.max_entrants,
            owner: owner.to_owned(),
        };
        let id = tournament.id;

        if !self.store.tournaments().insert(tournament) {
            log::debug!("Rejecting tournament: {:?} already exists", name);
            return false;
        }

        log::info!("User {:?} created tournament {} ({:?})", owner, id, name);
        true
    }
}
