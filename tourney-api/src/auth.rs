use std::fmt::{self, Display, Formatter};

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// An authorization token as it is sent in the `Authorization` header.
///
/// A `Token` always carries the [`Claims`] read from its payload segment. Constructing a
/// `Token` with [`Token::new`] does **not** verify the signature; that is up to the server.
#[derive(Clone, Debug)]
pub struct Token {
    token: String,
    claims: Claims,
}

impl Token {
    /// Parses the claims out of an encoded token.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the token has no payload segment or the payload is not valid
    /// base64url-encoded JSON.
    pub fn new<T>(token: T) -> Result<Self>
    where
        T: ToString,
    {
        let token = token.to_string();

        let claims = token.split('.').nth(1).ok_or(Error::InvalidToken)?;

        let claims = base64::decode_config(claims, base64::URL_SAFE_NO_PAD)?;
        let claims = serde_json::from_slice(&claims)?;

        Ok(Self { token, claims })
    }

    /// Creates a new `Token` from an already encoded token and its claims.
    #[cfg(feature = "server")]
    #[inline]
    pub fn from_parts(token: String, claims: Claims) -> Self {
        Self { token, claims }
    }

    #[inline]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[inline]
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    #[inline]
    pub fn into_token(self) -> String {
        self.token
    }

    #[inline]
    pub fn into_claims(self) -> Claims {
        self.claims
    }
}

impl Serialize for Token {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.token.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Token {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TokenVisitor;

        impl<'de> Visitor<'de> for TokenVisitor {
            type Value = Token;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("token")
            }

            fn visit_string<E>(self, v: String) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Token::new(v).map_err(E::custom)
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                self.visit_string(v.to_owned())
            }
        }

        deserializer.deserialize_string(TokenVisitor)
    }
}

impl Display for Token {
    #[inline]
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.token.fmt(f)
    }
}

// Tokens are equal when the token strings are equal. There is no need to compare
// the claims.
impl PartialEq for Token {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for Token {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Claims {
    /// Subject, the nickname of the user
    pub sub: String,
    /// Issued At
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Not before time
    pub nbf: u64,
}

impl Claims {
    pub fn new<T>(sub: T) -> Self
    where
        T: ToString,
    {
        Self {
            sub: sub.to_string(),
            iat: 0,
            exp: 0,
            nbf: 0,
        }
    }
}

/// The body of a `POST /auth` request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginData {
    pub nickname: String,
    pub password: String,
}
