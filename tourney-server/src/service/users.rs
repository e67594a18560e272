use tourney_api::auth::{LoginData, Token};
use tourney_api::id::UserId;
use tourney_api::users::{RegistrationData, Role, User};

use crate::auth::{password_hash, Authorization};
use crate::store::{Store, USER_ID_GENERATOR};
use crate::Error;

const MAX_NICKNAME_LEN: usize = 32;
const MAX_PASSWORD_LEN: usize = 128;

/// A successful login.
#[derive(Clone, Debug)]
pub struct Session {
    pub token: Token,
    pub role: Role,
}

#[derive(Copy, Clone, Debug)]
pub struct UserService<'a> {
    store: &'a Store,
    auth: &'a Authorization,
}

impl<'a> UserService<'a> {
    #[inline]
    pub fn new(store: &'a Store, auth: &'a Authorization) -> Self {
        Self { store, auth }
    }

    /// Checks the credentials and issues a new token. Returns `None` if the user doesn't exist
    /// or the password is wrong.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if the token cannot be encoded.
    pub fn auth(&self, data: &LoginData) -> Result<Option<Session>, Error> {
        let user = match self.store.users().get(&data.nickname) {
            Some(user) => user,
            None => {
                log::debug!("Login for unknown user {:?}", data.nickname);
                return Ok(None);
            }
        };

        if password_hash(&data.password, user.id.0.to_le_bytes()) != user.password {
            log::debug!("Wrong password for user {:?}", user.nickname);
            return Ok(None);
        }

        let token = self.auth.create_token(&user.nickname)?;

        Ok(Some(Session {
            token,
            role: user.role,
        }))
    }

    /// Creates a new account with [`Role::User`]. Returns `false` if the data is invalid or the
    /// nickname is taken.
    pub fn register(&self, data: &RegistrationData) -> bool {
        if !is_valid_nickname(&data.nickname) {
            log::debug!("Rejecting registration: invalid nickname {:?}", data.nickname);
            return false;
        }

        if data.password.is_empty() || data.password.len() > MAX_PASSWORD_LEN {
            log::debug!("Rejecting registration: invalid password length");
            return false;
        }

        let id = UserId(USER_ID_GENERATOR.generate());

        let user = User {
            id,
            nickname: data.nickname.clone(),
            password: password_hash(&data.password, id.0.to_le_bytes()),
            role: Role::User,
        };

        if !self.store.users().insert(user) {
            log::debug!("Rejecting registration: {:?} is taken", data.nickname);
            return false;
        }

        log::info!("Registered user {:?}", data.nickname);
        true
    }

    /// Returns the user with the given nickname.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such user exists.
    pub fn find_user(&self, nickname: &str) -> Result<User, Error> {
        self.store.users().get(nickname).ok_or(Error::NotFound)
    }
}

/// Returns `true` if the nickname is 1 to 32 ASCII letters, digits, `_`, `-` or `.`.
pub fn is_valid_nickname(nickname: &str) -> bool {
    !nickname.is_empty()
        && nickname.len() <= MAX_NICKNAME_LEN
        && nickname
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
