//! Types exchanged between the tourney server and its clients.
//!
//! Every request and response body of the HTTP API is defined here, together with the
//! [`Token`] type used for the `Authorization` header.
//!
//! [`Token`]: auth::Token
pub mod auth;
pub mod id;
pub mod tournaments;
pub mod users;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token")]
    InvalidToken,
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("json decode error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}
