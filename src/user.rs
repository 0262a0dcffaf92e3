use sqlx::FromRow;

pub type UserId = i64;

#[derive(Debug, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[sqlx(rename = "passwordHash")]
    pub password_hash: String,
}

/// The user a request's session cookie resolved to.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
}
