use std::ops::Deref;
use std::sync::Arc;

use crate::auth::Authorization;
use crate::config::Config;
use crate::service::{TournamentService, UserService};
use crate::signal::Shutdown;
use crate::store::Store;

#[derive(Clone, Debug)]
pub struct State(Arc<StateInner>);

impl State {
    pub fn new(config: Config, store: Store) -> Self {
        let auth = Authorization::from_config(&config.authorization);

        Self(Arc::new(StateInner {
            store,
            config,
            auth,
            shutdown: Shutdown::new(),
        }))
    }

    #[inline]
    pub fn users(&self) -> UserService<'_> {
        UserService::new(&self.store, &self.auth)
    }

    #[inline]
    pub fn tournaments(&self) -> TournamentService<'_> {
        TournamentService::new(&self.store)
    }
}

impl Deref for State {
    type Target = StateInner;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
pub struct StateInner {
    pub store: Store,
    pub config: Config,
    pub auth: Authorization,
    pub shutdown: Shutdown,
}
