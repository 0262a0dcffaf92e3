use std::{fmt, result};

use log::{debug, error, info, trace, warn};

use crate::auth::{self, AuthToken, Credentials};
use crate::backend::{Backend, FindError, InsertError};
use crate::message::Message;
use crate::user::{CurrentUser, UserId};
use crate::time::Timestamp;

pub struct Board {
    backend: Backend,
    session_lifetime: u64,
}

/// A token handed out by register/login, to be set as the session cookie.
#[derive(Debug)]
pub struct Issued {
    pub token: AuthToken,
    pub expires: Timestamp,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    Internal,
    InvalidParameters,
    UsernameTaken,
    // unknown user and wrong password are deliberately indistinguishable
    IncorrectCredentials,
}

pub type Result<T> = result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Internal => "Something went wrong",
            Self::InvalidParameters => "Invalid parameters",
            Self::UsernameTaken => "Username taken",
            Self::IncorrectCredentials => "Username or password is incorrect",
        })
    }
}

fn now() -> Result<Timestamp> {
    Timestamp::now().map_err(|()| Error::Internal)
}

impl Board {
    /// `session_lifetime`: seconds an issued token stays valid
    pub fn new(backend: Backend, session_lifetime: u64) -> Self {
        Self {
            backend,
            session_lifetime,
        }
    }

    pub fn session_lifetime(&self) -> u64 {
        self.session_lifetime
    }

    fn issue(&self) -> Result<Issued> {
        Ok(Issued {
            token: AuthToken::new(),
            expires: now()?.after_secs(self.session_lifetime),
        })
    }

    pub async fn register(&self, creds: Credentials) -> Result<Issued> {
        let username = creds.user();
        let pwhash = auth::hash_password(creds.pass()).await?;
        let issued = self.issue()?;

        let id = self
            .backend
            .create_user(username, &pwhash, &issued.token.to_string(), issued.expires)
            .await
            .map_err(|e| match e {
                InsertError::Conflict => {
                    info!("{username} register: username taken");
                    Error::UsernameTaken
                }
                InsertError::Internal => {
                    error!("{username} register: couldn't create user");
                    Error::Internal
                }
            })?;

        info!("{username} registered (id {id}), session expires {}", issued.expires);
        Ok(issued)
    }

    pub async fn login(&self, creds: Credentials) -> Result<Issued> {
        let username = creds.user();

        let user = self.backend.find_user(username).await.map_err(|e| match e {
            FindError::NotFound => {
                info!("{username} login: no such user");
                Error::IncorrectCredentials
            }
            FindError::Internal => {
                error!("{username} login: couldn't look up user");
                Error::Internal
            }
        })?;

        if !auth::verify_password(creds.pass(), &user.password_hash).await {
            info!("{username} login: wrong password");
            return Err(Error::IncorrectCredentials);
        }

        let issued = self.issue()?;

        if let Ok(purged) = self.backend.delete_expired_tokens(now()?).await {
            if purged > 0 {
                debug!("purged {purged} expired tokens");
            }
        }

        self.backend
            .insert_token(&issued.token.to_string(), user.id, issued.expires)
            .await
            .map_err(|_| {
                error!("{username} login: couldn't store token");
                Error::Internal
            })?;

        info!("{username} login: new session, expires {}", issued.expires);
        Ok(issued)
    }

    /// Resolves a session cookie to its user. Misses and store failures
    /// alike degrade to anonymous (`None`).
    pub async fn authenticate(&self, token: Option<&str>) -> Option<CurrentUser> {
        let token = token?;
        let now = now().ok()?;

        let user_id = match self.backend.find_token(token, now).await {
            Ok(id) => id,
            Err(FindError::NotFound) => {
                trace!("unknown or expired session token");
                return None;
            }
            Err(FindError::Internal) => {
                warn!("couldn't resolve session token, treating as anonymous");
                return None;
            }
        };

        match self.backend.find_user_by_id(user_id).await {
            Ok(user) => {
                trace!("session belongs to {}", user.username);
                Some(user)
            }
            Err(e) => {
                warn!("session token for missing user {user_id}: {e:?}");
                None
            }
        }
    }

    pub async fn logout(&self, user: &CurrentUser, token: &str) -> Result<()> {
        let username = &user.username;

        let removed = self
            .backend
            .delete_token(token)
            .await
            .map_err(|()| Error::Internal)?;

        if removed {
            info!("{username} logout");
        } else {
            warn!("{username} logout: token already gone");
        }
        Ok(())
    }

    /// Empty messages are dropped, anonymous ones (`author == None`) are kept.
    pub async fn post_message(&self, author: Option<UserId>, message: &str) -> Result<()> {
        if message.is_empty() {
            debug!("ignoring empty message");
            return Ok(());
        }

        self.backend
            .insert_message(message, author)
            .await
            .map_err(|()| Error::Internal)?;

        match author {
            Some(id) => info!("user {id} posted a message"),
            None => info!("anonymous message posted"),
        }
        Ok(())
    }

    pub async fn messages(&self) -> Result<Vec<Message>> {
        let messages = self
            .backend
            .messages()
            .await
            .map_err(|()| Error::Internal)?;

        trace!("listing {} messages", messages.len());
        Ok(messages)
    }
}
