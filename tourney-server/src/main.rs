mod auth;
mod config;
mod http;
mod logger;
mod service;
mod signal;
mod state;
mod store;

use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use clap::Parser;
use hyper::StatusCode;
use thiserror::Error;

use crate::config::Config;
use crate::state::State;
use crate::store::Store;

#[derive(Clone, Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to the TOML config file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
    /// Ignore the config file and read every setting from the environment.
    #[arg(long)]
    env_only: bool,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = if args.env_only {
        Config::default().with_environment()
    } else {
        Config::from_file(&args.config).await?.with_environment()
    };
    config.validate()?;

    logger::init(config.loglevel);

    log::info!("Using config: {:?}", config);

    let store = Store::new();
    if let Some(path) = &config.users {
        let count = store.load_users(path).await?;
        log::info!("Loaded {} users from {:?}", count, path);
    }

    let state = State::new(config, store);

    let server = tokio::task::spawn(http::bind(state.config.bind.clone(), state.clone()));

    signal::wait().await;
    log::info!("Received shutdown signal");
    state.shutdown.terminate();

    server.await??;
    log::info!("Server stopped");

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Hyper(#[from] hyper::Error),
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("invalid token")]
    InvalidToken,
    #[error("token lifetime overflows the expiration time")]
    LifetimeOverflow,
    #[error("not found")]
    NotFound,
    /// Contains the comma separated list of allowed methods.
    #[error("method not allowed")]
    MethodNotAllowed(&'static str),
    #[error("bad request")]
    BadRequest,
    #[error("unsupported media type")]
    UnsupportedMediaType,
    #[error(transparent)]
    StatusCodeError(#[from] StatusCodeError),
}

/// An error that is returned to the client with the given status code and a plain-text
/// message.
#[derive(Clone, Debug, Error)]
pub struct StatusCodeError {
    pub code: StatusCode,
    pub message: Cow<'static, str>,
}

impl StatusCodeError {
    pub fn new<T>(code: StatusCode, message: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Replaces the message of the error.
    pub fn message<T>(mut self, message: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        self.message = message.into();
        self
    }

    /// 400 Bad Request
    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid body.")
    }

    /// 404 Not Found
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found.")
    }

    /// 405 Method Not Allowed
    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    }

    /// 408 Request Timeout
    pub fn request_timeout() -> Self {
        Self::new(StatusCode::REQUEST_TIMEOUT, "Request Timeout")
    }

    /// 413 Payload Too Large
    pub fn payload_too_large() -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
    }

    /// 415 Unsupported Media Type
    pub fn unsupported_media_type() -> Self {
        Self::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Invalid content type")
    }

    /// 500 Internal Server Error
    pub fn internal_server_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    }
}

impl Display for StatusCodeError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
