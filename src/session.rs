use std::sync::Arc;

use ::time::Duration;
use cookie::{Cookie, SameSite};
use warp::{Filter, Rejection};

use crate::board::{Board, Issued};
use crate::user::CurrentUser;

pub const COOKIE_NAME: &str = "authToken";

/// What the session cookie of a request resolved to.
#[derive(Debug, Clone)]
pub struct Session {
    token: Option<String>,
    user: Option<CurrentUser>,
}

impl Session {
    pub fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    /// The presented token, if it belongs to a live session.
    pub fn authed(&self) -> Option<(&CurrentUser, &str)> {
        Some((self.user.as_ref()?, self.token.as_deref()?))
    }
}

/// Resolves the session cookie before any handler runs. Never rejects:
/// anything short of a live token is an anonymous session.
pub fn resolve(board: Arc<Board>) -> impl Filter<Extract = (Session,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>(COOKIE_NAME)
        .and(warp::any().map(move || Arc::clone(&board)))
        .and_then(|token: Option<String>, board: Arc<Board>| async move {
            let user = board.authenticate(token.as_deref()).await;

            Ok::<_, Rejection>(Session { token, user })
        })
}

pub fn cookie(issued: &Issued, lifetime: u64, secure: bool) -> String {
    let max_age = Duration::seconds(i64::try_from(lifetime).unwrap_or(i64::MAX));

    Cookie::build((COOKIE_NAME, issued.token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
        .to_string()
}

pub fn removal_cookie(secure: bool) -> String {
    let mut cookie = Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build();

    cookie.make_removal();
    cookie.to_string()
}
