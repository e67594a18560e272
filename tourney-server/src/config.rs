use std::env;
use std::fmt::{self, Formatter};
use std::io;
use std::net::{AddrParseError, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use hyper::StatusCode;
use jsonwebtoken::Algorithm;
use log::LevelFilter;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// One year.
pub const MAX_TOKEN_LIFETIME: u64 = 60 * 60 * 24 * 365;

macro_rules! from_environment {
    ($config:expr, $($key:expr, $name:tt),*$(,)?) => {{
        $(
            {
                if let Ok(value) = env::var($key) {
                    match value.parse() {
                        Ok(value) => $config.$name = value,
                        Err(_) => eprintln!("Ignoring invalid value for {}", $key),
                    }
                }
            }
        )*
    }};
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub loglevel: LevelFilter,
    pub bind: BindAddr,
    /// JSON file with accounts created at startup.
    pub users: Option<PathBuf>,

    pub http: Http,
    pub authorization: Authorization,
}

impl Config {
    pub async fn from_file<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let mut file = File::open(path).await?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;

        Ok(toml::from_slice(&buf)?)
    }

    pub fn with_environment(mut self) -> Self {
        from_environment!(self, "TOURNEY_LOGLEVEL", loglevel, "TOURNEY_BIND", bind);

        if let Ok(value) = env::var("TOURNEY_USERS") {
            self.users = Some(value.into());
        }

        self.http = self.http.with_environment();
        self.authorization = self.authorization.with_environment();

        self
    }

    /// Checks the settings that cannot be expressed through the types alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.authorization.alg {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => (),
            alg => return Err(ConfigError::UnsupportedAlgorithm(alg)),
        }

        if self.authorization.token_lifetime == 0
            || self.authorization.token_lifetime > MAX_TOKEN_LIFETIME
        {
            return Err(ConfigError::InvalidValue("authorization.token_lifetime"));
        }

        if !self.http.prefix.is_empty() && !self.http.prefix.starts_with('/') {
            return Err(ConfigError::InvalidValue("http.prefix"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loglevel: LevelFilter::Info,
            bind: BindAddr::Tcp(SocketAddr::new([0, 0, 0, 0].into(), 8080)),
            users: None,
            http: Http::default(),
            authorization: Authorization::default(),
        }
    }
}

/// An address to bind the http server to.
///
/// This can currently be a tcp socket (net) or a unix socket (file).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum BindAddr {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl BindAddr {
    /// Parses the given string into a `Tcp` address.
    ///
    /// # Errors
    ///
    /// Returns an [`AddrParseError`] when parsing the input fails.
    #[inline]
    pub fn parse_socket(s: &str) -> Result<Self, AddrParseError> {
        s.parse().map(Self::Tcp)
    }
}

impl FromStr for BindAddr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(addr) = Self::parse_socket(s) {
            return Ok(addr);
        }

        Ok(Self::Unix(s.to_owned().into()))
    }
}

impl<'de> Deserialize<'de> for BindAddr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BindAddrVisitor;

        impl<'de> Visitor<'de> for BindAddrVisitor {
            type Value = BindAddr;

            fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
                formatter.write_str("an address with port, or file path")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(BindAddrVisitor)
    }
}

/// Settings of the request router.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Http {
    /// Path all routes are mounted under, e.g. `/api`. Empty mounts them at the root.
    pub prefix: String,
    /// Append CORS headers to every response.
    pub cors: bool,
    pub routes: Routes,
    /// Status returned for `/auth` with unknown credentials.
    pub login_failure: LoginFailure,
    /// Maximum accepted request body in bytes.
    pub max_body_size: u64,
    /// Seconds a client has to transmit the request body.
    pub body_timeout: u64,
}

impl Http {
    pub fn with_environment(mut self) -> Self {
        from_environment!(
            self,
            "TOURNEY_HTTP_PREFIX",
            prefix,
            "TOURNEY_HTTP_CORS",
            cors,
            "TOURNEY_HTTP_ROUTES",
            routes,
            "TOURNEY_HTTP_LOGIN_FAILURE",
            login_failure,
            "TOURNEY_HTTP_MAX_BODY_SIZE",
            max_body_size,
            "TOURNEY_HTTP_BODY_TIMEOUT",
            body_timeout,
        );

        self
    }
}

impl Default for Http {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            cors: true,
            routes: Routes::default(),
            login_failure: LoginFailure::Unauthorized,
            max_body_size: 16384,
            body_timeout: 30,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Auth,
    Registration,
    Account,
    CreateTournament,
}

impl Route {
    /// Returns the `Route` served at the given path segment.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "auth" => Some(Self::Auth),
            "registration" => Some(Self::Registration),
            "account" => Some(Self::Account),
            "createtournament" => Some(Self::CreateTournament),
            _ => None,
        }
    }
}

/// The set of enabled routes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Routes(pub Vec<Route>);

impl Routes {
    #[inline]
    pub fn contains(&self, route: Route) -> bool {
        self.0.contains(&route)
    }
}

impl Default for Routes {
    fn default() -> Self {
        Self(vec![
            Route::Auth,
            Route::Registration,
            Route::Account,
            Route::CreateTournament,
        ])
    }
}

/// Parses a comma separated list of routes, e.g. `auth,registration`.
impl FromStr for Routes {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Route::from_segment(s).ok_or(ConfigError::InvalidValue("http.routes")))
            .collect::<Result<_, _>>()
            .map(Self)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginFailure {
    /// 401 Unauthorized
    Unauthorized,
    /// 403 Forbidden
    Forbidden,
}

impl LoginFailure {
    #[inline]
    pub fn status(self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

impl FromStr for LoginFailure {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unauthorized" | "401" => Ok(Self::Unauthorized),
            "forbidden" | "403" => Ok(Self::Forbidden),
            _ => Err(ConfigError::InvalidValue("http.login_failure")),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Authorization {
    pub alg: Algorithm,
    /// HMAC secret. A random secret is generated when empty.
    pub secret: String,
    /// Seconds an issued token stays valid.
    pub token_lifetime: u64,
}

impl Authorization {
    pub fn with_environment(mut self) -> Self {
        from_environment!(
            self,
            "TOURNEY_AUTH_ALG",
            alg,
            "TOURNEY_AUTH_SECRET",
            secret,
            "TOURNEY_AUTH_TOKEN_LIFETIME",
            token_lifetime,
        );

        self
    }
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Authorization")
            .field("alg", &self.alg)
            .field("secret", &"<redacted>")
            .field("token_lifetime", &self.token_lifetime)
            .finish()
    }
}

impl Default for Authorization {
    fn default() -> Self {
        Self {
            alg: Algorithm::HS256,
            secret: String::new(),
            token_lifetime: 60 * 60,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error("unsupported token algorithm: {0:?}")]
    UnsupportedAlgorithm(Algorithm),
    #[error("invalid config value: {0}")]
    InvalidValue(&'static str),
}
