/// Checks the request method and runs the matching branch. If no branch matches a
/// `405 Method Not Allowed` error listing the allowed methods is returned.
///
/// `OPTIONS` requests never reach the routes, see [`service_root`].
macro_rules! method {
    ($req:expr, {$($method:ident => $branch:expr),* $(,)?}) => {
        match $req.method() {
            $(
                method if method == hyper::Method::$method => $branch,
            )*
            _ => Err($crate::Error::MethodNotAllowed(
                concat!($(stringify!($method), ","),*).trim_end_matches(','),
            )),
        }
    };
}

mod tournaments;
mod users;

use crate::config::{BindAddr, Route};
use crate::signal::ShutdownListener;
use crate::{Error, State, StatusCodeError};

use std::borrow::Cow;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use hyper::body::HttpBody;
use hyper::header::{
    HeaderValue, IntoHeaderName, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ALLOW, AUTHORIZATION,
    CONTENT_LENGTH, CONTENT_TYPE,
};
use hyper::http::request::Parts;
use hyper::server::conn::Http;
use hyper::service::Service;
use hyper::{Body, HeaderMap, Method, StatusCode, Uri};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpSocket;
use tokio::time::Instant;
use tourney_api::auth::Token;

pub type Result = std::result::Result<Response, Error>;

const CORS_ALLOW_METHODS: &str = "GET,PUT,POST,DELETE,PATCH,OPTIONS";
const CORS_ALLOW_HEADERS: &str = "Content-Type,Authorization";

pub async fn bind(addr: BindAddr, state: State) -> std::result::Result<(), Error> {
    match addr {
        BindAddr::Tcp(addr) => bind_tcp(addr, state).await,
        #[cfg(unix)]
        BindAddr::Unix(path) => bind_unix(path, state).await,
        #[cfg(not(unix))]
        BindAddr::Unix(_) => Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "unix sockets are not supported on this platform",
        )
        .into()),
    }
}

async fn bind_tcp(addr: SocketAddr, state: State) -> std::result::Result<(), Error> {
    let mut shutdown = state.shutdown.listen();
    let service = RootService { state };

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };

    if let Err(err) = socket.set_reuseaddr(true) {
        log::warn!("Failed to set SO_REUSEADDR flag: {}", err);
    }

    socket.bind(addr)?;
    let listener = socket.listen(1024)?;
    log::info!("Listening on {}", addr);

    loop {
        tokio::select! {
            res = listener.accept() => {
                let (stream, addr) = match res {
                    Ok((stream, addr)) => (stream, addr),
                    Err(err) => {
                        log::warn!("Failed to accept connection: {:?}", err);
                        continue;
                    }
                };
                log::debug!("Accepting new connection from {:?}", addr);

                tokio::task::spawn(serve(stream, service.clone(), shutdown.clone()));
            }
            // Shut down the server.
            _ = shutdown.wait() => {
                log::debug!("Shutting down http server");
                return Ok(());
            }
        }
    }
}

#[cfg(unix)]
async fn bind_unix(path: std::path::PathBuf, state: State) -> std::result::Result<(), Error> {
    use tokio::net::UnixListener;

    let mut shutdown = state.shutdown.listen();
    let service = RootService { state };

    let listener = UnixListener::bind(&path)?;
    log::info!("Listening on {:?}", path);

    loop {
        tokio::select! {
            res = listener.accept() => {
                let stream = match res {
                    Ok((stream, _)) => stream,
                    Err(err) => {
                        log::warn!("Failed to accept connection: {:?}", err);
                        continue;
                    }
                };

                tokio::task::spawn(serve(stream, service.clone(), shutdown.clone()));
            }
            _ = shutdown.wait() => {
                log::debug!("Shutting down http server");
                if let Err(err) = std::fs::remove_file(&path) {
                    log::warn!("Failed to remove socket {:?}: {}", path, err);
                }
                return Ok(());
            }
        }
    }
}

async fn serve<S>(stream: S, service: RootService, mut shutdown: ShutdownListener)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let conn = Http::new()
        .http1_keep_alive(true)
        .serve_connection(stream, service);
    tokio::pin!(conn);

    tokio::select! {
        res = &mut conn => {
            if let Err(err) = res {
                log::warn!("Http error: {:?}", err);
            }
            return;
        }
        _ = shutdown.wait() => {
            log::debug!("Shutting down connection");
        }
    }

    conn.as_mut().graceful_shutdown();
    if let Err(err) = conn.await {
        log::warn!("Http error: {:?}", err);
    }
}

#[derive(Clone, Debug)]
struct RootService {
    state: State,
}

impl Service<hyper::Request<Body>> for RootService {
    type Response = hyper::Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    #[inline]
    fn call(&mut self, req: hyper::Request<Body>) -> Self::Future {
        Box::pin(service_root(req, self.state.clone()))
    }
}

/// The single entry point of every request. All errors returned by the routes are turned into
/// responses here.
async fn service_root(
    req: hyper::Request<Body>,
    state: State,
) -> std::result::Result<hyper::Response<Body>, Infallible> {
    let start = Instant::now();

    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    log::debug!("request method={} path={:?}", method, path);
    log::trace!("headers={:?}", req.headers());

    let resp = if method == Method::OPTIONS {
        // Preflight requests are always answered, CORS enabled or not.
        cors(Response::no_content())
    } else {
        let resp = match route(Request::new(req, state.clone())).await {
            Ok(resp) => resp,
            Err(err) => error_response(err),
        };

        if state.config.http.cors {
            cors(resp).header(
                ACCESS_CONTROL_EXPOSE_HEADERS,
                HeaderValue::from_static("Authorization"),
            )
        } else {
            resp
        }
    };

    let resp = resp.build();

    log::info!(
        "response method={} path={:?} status={} elapsed={:?}",
        method,
        path,
        resp.status().as_u16(),
        start.elapsed()
    );

    Ok(resp)
}

async fn route(req: Request) -> Result {
    // Every POST route consumes JSON.
    if req.method() == Method::POST {
        req.require_json()?;
    }

    let path = req.uri().path().to_owned();
    let http = &req.state().config.http;

    let path = match path.strip_prefix(http.prefix.as_str()) {
        Some(path) if path.is_empty() || path.starts_with('/') => path,
        _ => return Err(Error::NotFound),
    };

    let mut uri = RequestUri::new(path);
    let route = match (uri.take_str(), uri.take_str()) {
        (Some(segment), None) => Route::from_segment(segment),
        _ => None,
    };

    match route.filter(|route| http.routes.contains(*route)) {
        Some(Route::Auth) => method!(req, {
            POST => users::auth(req).await,
        }),
        Some(Route::Registration) => method!(req, {
            POST => users::registration(req).await,
        }),
        Some(Route::Account) => method!(req, {
            GET => users::account(req).await,
        }),
        Some(Route::CreateTournament) => method!(req, {
            POST => tournaments::create(req).await,
        }),
        None => Err(Error::NotFound),
    }
}

fn error_response(err: Error) -> Response {
    let err = match err {
        Error::NotFound => StatusCodeError::not_found(),
        Error::BadRequest | Error::Json(_) => StatusCodeError::bad_request(),
        Error::UnsupportedMediaType => StatusCodeError::unsupported_media_type(),
        Error::MethodNotAllowed(allow) => {
            let err = StatusCodeError::method_not_allowed();
            return Response::ok()
                .status(err.code)
                .header(ALLOW, HeaderValue::from_static(allow))
                .text(err.message);
        }
        Error::StatusCodeError(err) => err,
        err => {
            log::error!("{:?}", err);
            StatusCodeError::internal_server_error()
        }
    };

    Response::ok().status(err.code).text(err.message)
}

fn cors(resp: Response) -> Response {
    resp.header(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"))
        .header(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        )
        .header(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        )
}

#[derive(Debug)]
pub struct Request {
    pub parts: Parts,
    pub body: Option<Body>,
    state: State,
}

impl Request {
    #[inline]
    fn new(req: hyper::Request<Body>, state: State) -> Self {
        let (parts, body) = req.into_parts();

        Self {
            parts,
            body: Some(body),
            state,
        }
    }

    #[inline]
    pub fn state(&self) -> &State {
        &self.state
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap<HeaderValue> {
        &self.parts.headers
    }

    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Returns an error unless the "Content-Type" header names JSON.
    pub fn require_json(&self) -> std::result::Result<(), Error> {
        let is_json = self
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false);

        if is_json {
            Ok(())
        } else {
            Err(Error::UnsupportedMediaType)
        }
    }

    /// Decodes and validates the token in the "Authorization" header.
    pub fn token(&self) -> std::result::Result<Token, Error> {
        let header = self
            .headers()
            .get(AUTHORIZATION)
            .ok_or(Error::InvalidToken)?
            .to_str()
            .map_err(|_| Error::InvalidToken)?;

        self.state.auth.validate_token(header)
    }

    /// Reads the whole body and parses it as JSON. Bodies that fail to parse result in
    /// [`Error::BadRequest`].
    pub async fn json<T>(&mut self) -> std::result::Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let bytes = self.bytes().await?;

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(value),
            Err(err) => {
                log::debug!("Failed to parse request body: {}", err);
                Err(Error::BadRequest)
            }
        }
    }

    async fn bytes(&mut self) -> std::result::Result<Vec<u8>, Error> {
        let limit = self.state.config.http.max_body_size;
        let timeout = Duration::from_secs(self.state.config.http.body_timeout);

        if let Some(length) = self.content_length()? {
            if length > limit {
                return Err(StatusCodeError::payload_too_large().into());
            }
        }

        let mut body = self.body.take().ok_or(Error::BadRequest)?;

        let read = async {
            let mut buf = Vec::new();
            while let Some(chunk) = body.data().await {
                let chunk = chunk?;

                if (buf.len() + chunk.len()) as u64 > limit {
                    return Err(StatusCodeError::payload_too_large().into());
                }

                buf.extend_from_slice(&chunk);
            }

            Ok::<_, Error>(buf)
        };

        match tokio::time::timeout(timeout, read).await {
            Ok(res) => res,
            Err(_) => {
                log::info!(
                    "Client failed to transmit body in {}s, dropping request",
                    timeout.as_secs()
                );

                Err(StatusCodeError::request_timeout().into())
            }
        }
    }

    /// Returns the value of the "Content-Length" header if present.
    pub fn content_length(&self) -> std::result::Result<Option<u64>, Error> {
        match self.headers().get(CONTENT_LENGTH) {
            Some(value) => match value.to_str().ok().and_then(|v| v.parse().ok()) {
                Some(value) => Ok(Some(value)),
                None => {
                    log::debug!("Failed to parse \"Content-Length\" header: {:?}", value);

                    Err(StatusCodeError::new(StatusCode::BAD_REQUEST, "Bad Request").into())
                }
            },
            None => Ok(None),
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct RequestUri<'a> {
    path: &'a str,
}

impl<'a> RequestUri<'a> {
    pub fn new(mut path: &'a str) -> Self {
        if path.starts_with('/') {
            path = &path[1..];
        }

        Self { path }
    }

    pub fn take_str(&mut self) -> Option<&'a str> {
        if self.path.is_empty() {
            None
        } else {
            Some(match self.path.split_once('/') {
                Some((part, rem)) => {
                    self.path = rem;
                    part
                }
                None => {
                    let path = self.path;
                    self.path = "";
                    path
                }
            })
        }
    }
}

#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl Response {
    /// 200 OK
    pub fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    /// 202 Accepted
    pub fn accepted() -> Self {
        Self::ok().status(StatusCode::ACCEPTED)
    }

    /// 204 No Content
    pub fn no_content() -> Self {
        Self::ok().status(StatusCode::NO_CONTENT)
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Sets a plain-text body.
    pub fn text<T>(mut self, body: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        self.body = Body::from(body.into());
        self.header(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )
    }

    pub fn json<T>(mut self, body: &T) -> Self
    where
        T: Serialize,
    {
        match serde_json::to_vec(body) {
            Ok(buf) => {
                self.body = Body::from(buf);
                self.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            }
            Err(err) => {
                log::error!("Failed to serialize response body: {}", err);

                let err = StatusCodeError::internal_server_error();
                self.status(err.code).text(err.message)
            }
        }
    }

    pub fn header<K>(mut self, key: K, value: HeaderValue) -> Self
    where
        K: IntoHeaderName,
    {
        self.headers.append(key, value);
        self
    }

    fn build(self) -> hyper::Response<Body> {
        let mut resp = hyper::Response::new(self.body);
        *resp.status_mut() = self.status;
        *resp.headers_mut() = self.headers;
        resp
    }
}

#[cfg(test)]
mod tests {
    use hyper::header::{
        HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
        ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ALLOW, AUTHORIZATION,
        CONTENT_LENGTH, CONTENT_TYPE,
    };
    use hyper::{Body, HeaderMap, Method, StatusCode};

    use super::{service_root, RequestUri};
    use crate::config::{Config, LoginFailure, Route, Routes};
    use crate::state::State;
    use crate::store::Store;

    fn state_with<F>(f: F) -> State
    where
        F: FnOnce(&mut Config),
    {
        let mut config = Config::default();
        config.authorization.secret = "test-secret".to_owned();
        f(&mut config);

        State::new(config, Store::new())
    }

    fn state() -> State {
        state_with(|_| ())
    }

    async fn send(
        state: &State,
        req: hyper::Request<Body>,
    ) -> (StatusCode, HeaderMap<HeaderValue>, String) {
        let resp = service_root(req, state.clone()).await.unwrap();

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = hyper::body::to_bytes(resp.into_body()).await.unwrap();

        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    fn post_json(path: &str, body: &str) -> hyper::Request<Body> {
        hyper::Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    fn get(path: &str, token: Option<&str>) -> hyper::Request<Body> {
        let mut builder = hyper::Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, token);
        }

        builder.body(Body::empty()).unwrap()
    }

    async fn register_and_login(state: &State, nickname: &str) -> String {
        let body = format!(r#"{{"nickname":"{}","password":"pw"}}"#, nickname);

        let (status, _, _) = send(state, post_json("/registration", &body)).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (status, headers, _) = send(state, post_json("/auth", &body)).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        headers[AUTHORIZATION].to_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn test_options_any_path() {
        for state in [state(), state_with(|config| config.http.cors = false)] {
            for path in ["/auth", "/does/not/exist", "/"] {
                let req = hyper::Request::builder()
                    .method(Method::OPTIONS)
                    .uri(path)
                    .body(Body::empty())
                    .unwrap();

                let (status, headers, body) = send(&state, req).await;
                assert_eq!(status, StatusCode::NO_CONTENT);
                assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
                assert_eq!(
                    headers[ACCESS_CONTROL_ALLOW_METHODS],
                    "GET,PUT,POST,DELETE,PATCH,OPTIONS"
                );
                assert_eq!(
                    headers[ACCESS_CONTROL_ALLOW_HEADERS],
                    "Content-Type,Authorization"
                );
                assert!(body.is_empty());
            }
        }
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let state = state();
        let (status, headers, _) = send(&state, get("/missing", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[ACCESS_CONTROL_EXPOSE_HEADERS], "Authorization");

        let state = state_with(|config| config.http.cors = false);
        let (status, headers, _) = send(&state, get("/missing", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_post_requires_json() {
        let state = state();

        let req = hyper::Request::builder()
            .method(Method::POST)
            .uri("/registration")
            .header(CONTENT_TYPE, "text/plain")
            .body(Body::from(r#"{"nickname":"alice","password":"pw"}"#))
            .unwrap();
        let (status, _, body) = send(&state, req).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body, "Invalid content type");
        assert!(state.store.users().get("alice").is_none());

        let req = hyper::Request::builder()
            .method(Method::POST)
            .uri("/auth")
            .body(Body::from(r#"{"nickname":"alice","password":"pw"}"#))
            .unwrap();
        let (status, _, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

        // Parameters after the media type are accepted.
        let req = hyper::Request::builder()
            .method(Method::POST)
            .uri("/registration")
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::from(r#"{"nickname":"alice","password":"pw"}"#))
            .unwrap();
        let (status, _, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_registration_and_auth() {
        let state = state();
        let body = r#"{"nickname":"alice","password":"pw"}"#;

        let (status, _, _) = send(&state, post_json("/registration", body)).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (status, headers, resp) = send(&state, post_json("/auth", body)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(resp, "\"USER\"");
        assert_eq!(headers[CONTENT_TYPE], "application/json");

        let token = headers[AUTHORIZATION].to_str().unwrap();
        let token = state.auth.validate_token(token).unwrap();
        assert_eq!(token.claims().sub, "alice");

        // Duplicate nickname.
        let (status, _, resp) = send(&state, post_json("/registration", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp, "Problem with registration");

        let (status, headers, resp) = send(
            &state,
            post_json("/auth", r#"{"nickname":"alice","password":"wrong"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(resp, "No such user");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_invalid_registration() {
        let state = state();
        let body = r#"{"nickname":"","password":"pw"}"#;

        let (status, _, resp) = send(&state, post_json("/registration", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp, "Problem with registration");

        let (status, _, resp) = send(&state, post_json("/auth", body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(resp, "No such user");
    }

    #[tokio::test]
    async fn test_invalid_body() {
        let state = state();

        for path in ["/auth", "/registration"] {
            for body in ["", "{", r#"{"nickname":"alice"}"#, "[1,2,3]"] {
                let (status, _, resp) = send(&state, post_json(path, body)).await;
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(resp, "Invalid body.");
            }
        }

        assert!(state.store.users().get("alice").is_none());
    }

    #[tokio::test]
    async fn test_account() {
        let state = state();
        let token = register_and_login(&state, "alice").await;

        let (status, headers, body) = send(&state, get("/account", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_TYPE], "application/json");

        let user: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(user["nickname"], "alice");
        assert_eq!(user["role"], "USER");
        assert!(user.get("password").is_none());

        let bearer = format!("Bearer {}", token);
        let (status, _, _) = send(&state, get("/account", Some(&bearer))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_account_invalid_token() {
        let state = state();

        for token in [None, Some(""), Some("abc"), Some("a.b.c")] {
            let (status, _, body) = send(&state, get("/account", token)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, "Token is expired");
        }

        // Signed with another secret.
        let other = state_with(|config| config.authorization.secret = "other".to_owned());
        let token = other.auth.create_token("alice").unwrap();
        let (status, _, body) = send(&state, get("/account", Some(token.token()))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Token is expired");
    }

    #[tokio::test]
    async fn test_account_unknown_user() {
        let state = state();
        let token = state.auth.create_token("bob").unwrap();

        let (status, _, body) = send(&state, get("/account", Some(token.token()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Not found.");
    }

    #[tokio::test]
    async fn test_create_tournament() {
        let state = state();
        let token = register_and_login(&state, "alice").await;
        let body = r#"{"name":"Summer Cup","max_entrants":8}"#;

        let req = hyper::Request::builder()
            .method(Method::POST)
            .uri("/createtournament")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, "invalid")
            .body(Body::from(body))
            .unwrap();
        let (status, _, resp) = send(&state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp, "Token is invalid");
        assert!(state.store.tournaments().list().is_empty());

        // Token is checked before the body.
        let (status, _, resp) = send(&state, post_json("/createtournament", "{")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp, "Token is invalid");

        let req = hyper::Request::builder()
            .method(Method::POST)
            .uri("/createtournament")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, &token)
            .body(Body::from(body))
            .unwrap();
        let (status, _, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let tournaments = state.store.tournaments().list();
        assert_eq!(tournaments.len(), 1);
        assert_eq!(tournaments[0].name, "Summer Cup");
        assert_eq!(tournaments[0].owner, "alice");
        assert_eq!(tournaments[0].max_entrants, Some(8));

        // Duplicate name.
        let req = hyper::Request::builder()
            .method(Method::POST)
            .uri("/createtournament")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, &token)
            .body(Body::from(body))
            .unwrap();
        let (status, _, resp) = send(&state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp, "Problem with tournament creation");
    }

    #[tokio::test]
    async fn test_exact_routes() {
        let state = state();

        for path in ["/auth/registration", "/", "/authx", "/account/1", "/Auth"] {
            let (status, _, body) = send(&state, get(path, None)).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", path);
            assert_eq!(body, "Not found.");
        }

        let (status, _, _) = send(&state, post_json("/auth/registration", "{}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let state = state();

        let (status, headers, _) = send(&state, get("/auth", None)).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(headers[ALLOW], "POST");

        let (status, headers, _) = send(&state, post_json("/account", "{}")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(headers[ALLOW], "GET");
    }

    #[tokio::test]
    async fn test_users_only_profile() {
        let state = state_with(|config| {
            config.http.cors = false;
            config.http.login_failure = LoginFailure::Forbidden;
            config.http.routes = Routes(vec![Route::Auth, Route::Registration, Route::Account]);
        });

        let (status, headers, body) = send(
            &state,
            post_json("/auth", r#"{"nickname":"alice","password":"pw"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, "No such user");
        assert!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

        let token = register_and_login(&state, "alice").await;
        let req = hyper::Request::builder()
            .method(Method::POST)
            .uri("/createtournament")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, &token)
            .body(Body::from(r#"{"name":"Summer Cup"}"#))
            .unwrap();
        let (status, _, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_prefix() {
        let state = state_with(|config| config.http.prefix = "/api".to_owned());
        let body = r#"{"nickname":"alice","password":"pw"}"#;

        let (status, _, _) = send(&state, post_json("/api/registration", body)).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (status, _, _) = send(&state, post_json("/api/auth/", body)).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        for path in ["/auth", "/apiauth", "/api"] {
            let (status, _, _) = send(&state, post_json(path, body)).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", path);
        }
    }

    #[tokio::test]
    async fn test_body_limit() {
        let state = state_with(|config| config.http.max_body_size = 16);
        let body = r#"{"nickname":"alice","password":"pw"}"#;

        let req = hyper::Request::builder()
            .method(Method::POST)
            .uri("/registration")
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();
        let (status, _, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        // Without a length header the limit applies while reading.
        let (status, _, _) = send(&state, post_json("/registration", body)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        assert!(state.store.users().get("alice").is_none());
    }

    #[tokio::test]
    async fn test_body_timeout() {
        let state = state_with(|config| config.http.body_timeout = 0);

        // The sender stays alive, so the body never completes.
        let (_sender, body) = Body::channel();
        let req = hyper::Request::builder()
            .method(Method::POST)
            .uri("/registration")
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap();

        let (status, _, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_invalid_content_length() {
        let state = state();

        let req = hyper::Request::builder()
            .method(Method::POST)
            .uri("/registration")
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, "abc")
            .body(Body::from(r#"{"nickname":"alice","password":"pw"}"#))
            .unwrap();

        let (status, _, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(state.store.users().get("alice").is_none());
    }

    #[tokio::test]
    async fn test_create_tournament_invalid_body() {
        let state = state();
        let token = register_and_login(&state, "alice").await;

        for body in ["{", "", r#"{"description":"no name"}"#] {
            let req = hyper::Request::builder()
                .method(Method::POST)
                .uri("/createtournament")
                .header(CONTENT_TYPE, "application/json")
                .header(AUTHORIZATION, &token)
                .body(Body::from(body))
                .unwrap();

            let (status, _, resp) = send(&state, req).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(resp, "Invalid body.");
        }

        assert!(state.store.tournaments().list().is_empty());
    }

    #[test]
    fn test_request_uri() {
        let mut uri = RequestUri::new("/auth");
        assert_eq!(uri.take_str(), Some("auth"));
        assert_eq!(uri.take_str(), None);

        let mut uri = RequestUri::new("/auth/registration");
        assert_eq!(uri.take_str(), Some("auth"));
        assert_eq!(uri.take_str(), Some("registration"));
        assert_eq!(uri.take_str(), None);

        let mut uri = RequestUri::new("/account/");
        assert_eq!(uri.take_str(), Some("account"));
        assert_eq!(uri.take_str(), None);

        let mut uri = RequestUri::new("/");
        assert_eq!(uri.take_str(), None);
    }
}
