use std::fmt;

use argon2::{
    password_hash::{self, rand_core::OsRng, SaltString},
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
};
use log::{error, warn};
use serde::Deserialize;
use uuid::Uuid;

use crate::board::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthToken(Uuid);

impl AuthToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for AuthToken {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// A username/password form, as posted to `/register` and `/login`.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

pub struct Credentials {
    user: String,
    pass: String,
}

impl Credentials {
    pub fn from_form(form: CredentialsForm) -> Result<Self, Error> {
        match (form.username, form.password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                Ok(Self { user, pass })
            }
            _ => Err(Error::InvalidParameters),
        }
    }

    pub fn user(&self) -> &str { &self.user }
    pub fn pass(&self) -> &str { &self.pass }
}

// Argon2id v1.3 cost: 19 MiB, 2 passes, 1 lane
const M_COST_KIB: u32 = 19 * 1024;
const T_COST: u32 = 2;
const P_COST: u32 = 1;

fn hasher() -> Result<Argon2<'static>, argon2::Error> {
    let params = Params::new(M_COST_KIB, T_COST, P_COST, None)?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

// argon2 is deliberately slow, keep it off the async workers
pub async fn hash_password(pass: &str) -> Result<String, Error> {
    let pass = pass.to_owned();

    tokio::task::spawn_blocking(move || -> Result<String, password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = hasher()?.hash_password(pass.as_bytes(), &salt)?;
        Ok(hash.to_string())
    })
    .await
    .map_err(|e| {
        error!("password hashing task failed: {e}");
        Error::Internal
    })?
    .map_err(|e| {
        error!("couldn't hash password: {e}");
        Error::Internal
    })
}

pub async fn verify_password(pass: &str, hash: &str) -> bool {
    let pass = pass.to_owned();
    let hash = hash.to_owned();

    let verified = tokio::task::spawn_blocking(move || {
        let parsed = match PasswordHash::new(&hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("stored password hash is unparsable: {e}");
                return false;
            }
        };

        match hasher() {
            Ok(argon) => argon.verify_password(pass.as_bytes(), &parsed).is_ok(),
            Err(e) => {
                error!("bad argon2 parameters: {e}");
                false
            }
        }
    })
    .await;

    verified.unwrap_or_else(|e| {
        error!("password verification task failed: {e}");
        false
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn form(username: Option<&str>, password: Option<&str>) -> CredentialsForm {
        CredentialsForm {
            username: username.map(Into::into),
            password: password.map(Into::into),
        }
    }

    #[test]
    fn credentials_need_both_fields() {
        assert!(Credentials::from_form(form(Some("alice"), Some("pw1"))).is_ok());

        for bad in [
            form(None, Some("pw1")),
            form(Some("alice"), None),
            form(Some(""), Some("pw1")),
            form(Some("alice"), Some("")),
            form(None, None),
        ] {
            assert!(matches!(
                Credentials::from_form(bad),
                Err(Error::InvalidParameters)
            ));
        }
    }

    #[test]
    fn tokens_are_uuids() {
        let token = AuthToken::new().to_string();
        let parsed = Uuid::try_parse(&token).unwrap();

        assert_eq!(token.len(), 36);
        assert_eq!(parsed.get_version_num(), 4);
        assert_ne!(AuthToken::new(), AuthToken::new());
    }

    #[tokio::test]
    async fn hash_and_verify() {
        let hash = hash_password("pw1").await.unwrap();

        assert_ne!(hash, "pw1");
        assert!(verify_password("pw1", &hash).await);
        assert!(!verify_password("wrong", &hash).await);

        // salted
        assert_ne!(hash, hash_password("pw1").await.unwrap());
    }

    #[tokio::test]
    async fn hashes_record_fixed_cost() {
        let hash = hash_password("pw1").await.unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();

        assert_eq!(parsed.algorithm.as_str(), "argon2id");
        assert_eq!(parsed.version, Some(0x13));
        assert_eq!(Params::try_from(&parsed).unwrap().m_cost(), M_COST_KIB);
        assert!(hash.contains(&format!("m={M_COST_KIB},t={T_COST},p={P_COST}")));
    }

    #[tokio::test]
    async fn garbage_hash_never_verifies() {
        assert!(!verify_password("pw1", "not a phc string").await);
        assert!(!verify_password("", "").await);
    }
}
