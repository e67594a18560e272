use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// A registered account.
///
/// The password field holds the salted hash and is never serialized. `GET /account` returns
/// this type without it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: UserId,
    pub nickname: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        })
    }
}

/// The body of a `POST /registration` request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationData {
    pub nickname: String,
    pub password: String,
}
