use warp::{reject::Rejection, Filter};

use crate::database::error::ApiError;

use super::jwt::{verify_jwt_session, SessionData};

/// Requires a valid session cookie; the request proceeds without the
/// session payload.
pub fn with_auth() -> impl Filter<Extract = ((),), Error = Rejection> + Copy {
    warp::cookie::<String>("session").and_then(|session: String| async move {
        match verify_jwt_session(session) {
            Ok(_) => Ok(()),
            Err(e) => Err(e.reject()),
        }
    })
}

/// Requires a valid session cookie and extracts the caller's identity.
pub fn with_session() -> impl Filter<Extract = (SessionData,), Error = Rejection> + Copy {
    warp::cookie::<String>("session").and_then(|session: String| async move {
        match verify_jwt_session(session) {
            Ok(data) => Ok(SessionData::from(data)),
            Err(e) => Err(e.reject()),
        }
    })
}

/// Anonymous-safe extraction: a missing or invalid cookie yields `None`
/// so read-side flags can default to false instead of rejecting.
pub fn with_possible_session(
) -> impl Filter<Extract = (Option<SessionData>,), Error = std::convert::Infallible> + Copy {
    warp::filters::cookie::optional::<String>("session").map(|session: Option<String>| {
        session
            .and_then(|cookie| verify_jwt_session(cookie).ok())
            .map(SessionData::from)
    })
}
