use hyper::header::{HeaderValue, AUTHORIZATION};
use hyper::StatusCode;
use tourney_api::auth::LoginData;
use tourney_api::users::RegistrationData;

use crate::http::{Request, Response, Result};
use crate::StatusCodeError;

pub async fn auth(mut req: Request) -> Result {
    let data: LoginData = req.json().await?;

    match req.state().users().auth(&data)? {
        Some(session) => {
            let value = HeaderValue::from_str(session.token.token())
                .map_err(|_| StatusCodeError::internal_server_error())?;

            Ok(Response::accepted()
                .header(AUTHORIZATION, value)
                .json(&session.role))
        }
        None => {
            let status = req.state().config.http.login_failure.status();
            Err(StatusCodeError::new(status, "No such user").into())
        }
    }
}

pub async fn registration(mut req: Request) -> Result {
    let data: RegistrationData = req.json().await?;

    if req.state().users().register(&data) {
        Ok(Response::accepted())
    } else {
        Err(StatusCodeError::new(StatusCode::BAD_REQUEST, "Problem with registration").into())
    }
}

pub async fn account(req: Request) -> Result {
    let token = match req.token() {
        Ok(token) => token,
        Err(err) => {
            log::debug!("Rejecting account lookup: {}", err);
            return Err(StatusCodeError::bad_request()
                .message("Token is expired")
                .into());
        }
    };

    let user = req.state().users().find_user(&token.claims().sub)?;

    Ok(Response::ok().json(&user))
}
