use hyper::StatusCode;
use tourney_api::tournaments::TournamentCreation;

use crate::http::{Request, Response, Result};
use crate::StatusCodeError;

pub async fn create(mut req: Request) -> Result {
    // An invalid token ends the request before the body is looked at.
    let token = match req.token() {
        Ok(token) => token,
        Err(err) => {
            log::debug!("Rejecting tournament creation: {}", err);
            return Err(StatusCodeError::bad_request()
                .message("Token is invalid")
                .into());
        }
    };

    let payload: TournamentCreation = req.json().await?;

    if req.state().tournaments().create(&payload, &token.claims().sub) {
        Ok(Response::accepted())
    } else {
        Err(StatusCodeError::new(
            StatusCode::BAD_REQUEST,
            "Problem with tournament creation",
        )
        .into())
    }
}
