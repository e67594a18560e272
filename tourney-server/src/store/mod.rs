use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;
use snowflaked::sync::Generator;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tourney_api::id::{TournamentId, UserId};
use tourney_api::tournaments::Tournament;
use tourney_api::users::{Role, User};

use crate::auth::password_hash;
use crate::service::is_valid_nickname;
use crate::Error;

pub static USER_ID_GENERATOR: Generator = Generator::new_unchecked(0);
pub static TOURNAMENT_ID_GENERATOR: Generator = Generator::new_unchecked(0);

/// In-memory storage for users and tournaments.
///
/// Cloning a `Store` returns a new handle to the same data.
#[derive(Clone, Debug, Default)]
pub struct Store {
    inner: Arc<RwLock<StoreInner>>,
}

#[derive(Debug, Default)]
struct StoreInner {
    users: HashMap<String, User>,
    tournaments: BTreeMap<TournamentId, Tournament>,
}

impl Store {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn users(&self) -> UsersClient<'_> {
        UsersClient { store: self }
    }

    #[inline]
    pub fn tournaments(&self) -> TournamentsClient<'_> {
        TournamentsClient { store: self }
    }

    /// Inserts all accounts from a JSON file containing a list of `{nickname, password, role}`
    /// objects. Accounts that already exist are skipped. Returns the number of inserted accounts.
    pub async fn load_users<P>(&self, path: P) -> Result<usize, Error>
    where
        P: AsRef<Path>,
    {
        let mut file = File::open(path).await?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;

        let seeds: Vec<SeedUser> = serde_json::from_slice(&buf)?;

        let mut count = 0;
        for seed in seeds {
            if !is_valid_nickname(&seed.nickname) {
                log::warn!("Skipping seed user with invalid nickname {:?}", seed.nickname);
                continue;
            }

            let id = UserId(USER_ID_GENERATOR.generate());

            let user = User {
                id,
                password: password_hash(&seed.password, id.0.to_le_bytes()),
                nickname: seed.nickname,
                role: seed.role,
            };

            let nickname = user.nickname.clone();
            if self.users().insert(user) {
                count += 1;
            } else {
                log::warn!("Skipping duplicate seed user {:?}", nickname);
            }
        }

        Ok(count)
    }
}

#[derive(Clone, Debug, Deserialize)]
struct SeedUser {
    nickname: String,
    password: String,
    #[serde(default)]
    role: Role,
}

#[derive(Copy, Clone, Debug)]
pub struct UsersClient<'a> {
    store: &'a Store,
}

impl<'a> UsersClient<'a> {
    pub fn get(&self, nickname: &str) -> Option<User> {
        self.store.inner.read().users.get(nickname).cloned()
    }

    /// Inserts a new user. Returns `false` if the nickname is already taken.
    pub fn insert(&self, user: User) -> bool {
        match self.store.inner.write().users.entry(user.nickname.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(user);
                true
            }
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct TournamentsClient<'a> {
    store: &'a Store,
}

impl<'a> TournamentsClient<'a> {
    #[cfg(test)]
    pub fn list(&self) -> Vec<Tournament> {
        self.store.inner.read().tournaments.values().cloned().collect()
    }

    /// Inserts a new tournament. Returns `false` if a tournament with the same id or name
    /// already exists.
    pub fn insert(&self, tournament: Tournament) -> bool {
        let mut inner = self.store.inner.write();

        if inner.tournaments.contains_key(&tournament.id)
            || inner
                .tournaments
                .values()
                .any(|t| t.name.eq_ignore_ascii_case(&tournament.name))
        {
            return false;
        }

        inner.tournaments.insert(tournament.id, tournament);
        true
    }
}
