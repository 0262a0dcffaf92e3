use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error, warn};
use serde::{de::DeserializeOwned, Deserialize};
use warp::http::{header::SET_COOKIE, Uri};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::auth::{Credentials, CredentialsForm};
use crate::board::{self, Board};
use crate::session::{self, Session};
use crate::view;

const FORM_LIMIT: u64 = 16 * 1024;

#[derive(Debug, Clone)]
pub struct Options {
    pub secure: bool,
    pub public_dir: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageForm {
    message: Option<String>,
}

// Bodies that aren't urlencoded read as an empty form, so the handlers
// answer them like any other missing field.
fn form<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Default + Send,
{
    let empty = warp::any().map(|| {
        debug!("unreadable form body, treating as empty");
        T::default()
    });

    warp::body::content_length_limit(FORM_LIMIT).and(warp::body::form().or(empty).unify())
}

pub fn routes(
    board: Arc<Board>,
    opts: Options,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let session = session::resolve(Arc::clone(&board));
    let board = warp::any().map(move || Arc::clone(&board));
    let secure = {
        let secure = opts.secure;
        warp::any().map(move || secure)
    };

    let home = warp::path::end()
        .and(warp::get())
        .and(session.clone())
        .and(board.clone())
        .and_then(home);

    let register = {
        let page = warp::path!("register")
            .and(warp::get())
            .and(session.clone())
            .map(|session: Session| form_page(&session, view::register));

        let submit = warp::path!("register")
            .and(warp::post())
            .and(form::<CredentialsForm>())
            .and(board.clone())
            .and(secure.clone())
            .and_then(register);

        page.or(submit)
    };

    let login = {
        let page = warp::path!("login")
            .and(warp::get())
            .and(session.clone())
            .map(|session: Session| form_page(&session, view::login));

        let submit = warp::path!("login")
            .and(warp::post())
            .and(form::<CredentialsForm>())
            .and(board.clone())
            .and(secure.clone())
            .and_then(login);

        page.or(submit)
    };

    let logout = warp::path!("logout")
        .and(warp::get())
        .and(session.clone())
        .and(board.clone())
        .and(secure)
        .and_then(logout);

    let message = warp::path!("message")
        .and(warp::post())
        .and(form::<MessageForm>())
        .and(session)
        .and(board)
        .and_then(post_message);

    let public = warp::path("public").and(warp::fs::dir(opts.public_dir));

    home.or(register)
        .or(login)
        .or(logout)
        .or(message)
        .or(public)
        .with(warp::log("msgboard"))
}

fn redirect_home() -> Response {
    warp::redirect::see_other(Uri::from_static("/")).into_response()
}

fn redirect_home_with_cookie(cookie: String) -> Response {
    warp::reply::with_header(
        warp::redirect::see_other(Uri::from_static("/")),
        SET_COOKIE,
        cookie,
    )
    .into_response()
}

fn form_page(session: &Session, render: fn(Option<&str>) -> String) -> Response {
    if session.user().is_some() {
        return redirect_home();
    }
    warp::reply::html(render(None)).into_response()
}

fn form_error(render: fn(Option<&str>) -> String, e: board::Error) -> Response {
    warp::reply::html(render(Some(&e.to_string()))).into_response()
}

async fn home(session: Session, board: Arc<Board>) -> Result<Response, Rejection> {
    let page = match board.messages().await {
        Ok(messages) => view::home(&messages, session.user(), None),
        Err(e) => {
            error!("home: couldn't list messages");
            view::home(&[], session.user(), Some(&e.to_string()))
        }
    };

    Ok(warp::reply::html(page).into_response())
}

async fn register(
    form: CredentialsForm,
    board: Arc<Board>,
    secure: bool,
) -> Result<Response, Rejection> {
    let creds = match Credentials::from_form(form) {
        Ok(creds) => creds,
        Err(e) => return Ok(form_error(view::register, e)),
    };

    Ok(match board.register(creds).await {
        Ok(issued) => redirect_home_with_cookie(session::cookie(
            &issued,
            board.session_lifetime(),
            secure,
        )),
        Err(e) => form_error(view::register, e),
    })
}

async fn login(
    form: CredentialsForm,
    board: Arc<Board>,
    secure: bool,
) -> Result<Response, Rejection> {
    let creds = match Credentials::from_form(form) {
        Ok(creds) => creds,
        Err(e) => return Ok(form_error(view::login, e)),
    };

    Ok(match board.login(creds).await {
        Ok(issued) => redirect_home_with_cookie(session::cookie(
            &issued,
            board.session_lifetime(),
            secure,
        )),
        Err(e) => form_error(view::login, e),
    })
}

async fn logout(session: Session, board: Arc<Board>, secure: bool) -> Result<Response, Rejection> {
    let Some((user, token)) = session.authed() else {
        return Ok(redirect_home());
    };

    if let Err(e) = board.logout(user, token).await {
        warn!("{} logout: {e}", user.username);
    }

    Ok(redirect_home_with_cookie(session::removal_cookie(secure)))
}

async fn post_message(
    form: MessageForm,
    session: Session,
    board: Arc<Board>,
) -> Result<Response, Rejection> {
    let author = session.user().map(|user| user.id);
    let message = form.message.unwrap_or_default();

    if let Err(e) = board.post_message(author, &message).await {
        error!("couldn't post message: {e}");
    }

    Ok(redirect_home())
}
