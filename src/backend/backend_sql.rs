use std::future::Future;
use std::path::{Path, PathBuf};

use sqlx::error::DatabaseError;
use sqlx::{
    migrate::MigrateDatabase, query, query_as, query_scalar, Pool, Sqlite, SqlitePool,
    Transaction,
};

use log::{debug, error, info};

use crate::backend::{FindError, InsertError};
use crate::message::Message;
use crate::user::{CurrentUser, User, UserId};
use crate::time::Timestamp;

type Result<T> = std::result::Result<T, ()>;

pub struct Backend(pub Pool<Sqlite>);

fn into_sql(path: &Path) -> PathBuf {
    path.join("board.sqlite")
}

impl Backend {
    pub async fn new(data_dir: &Path) -> std::result::Result<Self, sqlx::Error> {
        let db_path = into_sql(data_dir);
        let url = format!("sqlite://{}", db_path.display());

        if !Sqlite::database_exists(&url).await? {
            Sqlite::create_database(&url).await?;
            info!("created {}", db_path.display());
        }
        info!("using {}", db_path.display());

        let pool = SqlitePool::connect(&url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self(pool))
    }
}

impl Backend {
    async fn transact<'t, T, R, E, F>(&self, transaction: T) -> std::result::Result<R, E>
    where
        T: FnOnce(Transaction<'t, Sqlite>) -> F,
        F: Future<Output = std::result::Result<(Transaction<'t, Sqlite>, R), E>>,
        E: From<sqlx::Error>,
    {
        let tx = self.0.begin().await.map_err(|e| {
            error!("error beginning transaction: {:?}", e);
            E::from(e)
        })?;

        // an early return drops `tx`, rolling it back
        let (tx, r) = transaction(tx).await?;

        tx.commit().await.map_err(|e| {
            error!("error committing transaction: {:?}", e);
            E::from(e)
        })?;

        Ok(r)
    }
}

fn is_unique_violation(e: &dyn DatabaseError) -> bool {
    // SQLITE_CONSTRAINT_UNIQUE, SQLITE_CONSTRAINT_PRIMARYKEY
    matches!(e.code().as_deref(), Some("2067" | "1555"))
        || e.message().starts_with("UNIQUE constraint failed")
}

impl From<sqlx::Error> for InsertError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db_err) if is_unique_violation(&**db_err) => Self::Conflict,
            _ => Self::Internal,
        }
    }
}

fn insert_error(what: &str, e: sqlx::Error) -> InsertError {
    match e {
        sqlx::Error::Database(ref db_err) if is_unique_violation(&**db_err) => {
            debug!("{what} already exists: {db_err}");
            InsertError::Conflict
        }
        e => {
            error!("error inserting {what}: {e:?}");
            InsertError::Internal
        }
    }
}

fn find_error(what: &str, e: sqlx::Error) -> FindError {
    if matches!(e, sqlx::Error::RowNotFound) {
        FindError::NotFound
    } else {
        error!("couldn't find {what}: {e:?}");
        FindError::Internal
    }
}

impl Backend {
    pub async fn find_user(&self, username: &str) -> std::result::Result<User, FindError> {
        query_as::<_, User>(
            "
            SELECT id, username, passwordHash
            FROM Users
            WHERE username = ?
            ",
        )
        .bind(username)
        .fetch_one(&self.0)
        .await
        .map_err(|e| find_error("user by name", e))
    }

    pub async fn find_user_by_id(&self, id: UserId) -> std::result::Result<CurrentUser, FindError> {
        query_as::<_, CurrentUser>(
            "
            SELECT id, username
            FROM Users
            WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_one(&self.0)
        .await
        .map_err(|e| find_error("user by id", e))
    }

    /// Inserts the user and their first token together; neither exists unless both do.
    pub async fn create_user(
        &self,
        username: &str,
        pwhash: &str,
        token: &str,
        expires: Timestamp,
    ) -> std::result::Result<UserId, InsertError> {
        self.transact(|mut tx| async move {
            let id = query(
                "
                INSERT INTO Users
                (username, passwordHash)
                VALUES
                (?, ?)
                ",
            )
            .bind(username)
            .bind(pwhash)
            .execute(&mut *tx)
            .await
            .map_err(|e| insert_error("user", e))?
            .last_insert_rowid();

            query(
                "
                INSERT INTO AuthTokens
                (token, userId, expires)
                VALUES
                (?, ?, ?)
                ",
            )
            .bind(token)
            .bind(id)
            .bind(expires)
            .execute(&mut *tx)
            .await
            .map_err(|e| insert_error("initial token", e))?;

            Ok::<_, InsertError>((tx, id))
        })
        .await
    }
}

impl Backend {
    /// Only unexpired tokens are found.
    pub async fn find_token(
        &self,
        token: &str,
        now: Timestamp,
    ) -> std::result::Result<UserId, FindError> {
        query_scalar::<_, UserId>(
            "
            SELECT userId
            FROM AuthTokens
            WHERE token = ?
                AND expires > ?
            ",
        )
        .bind(token)
        .bind(now)
        .fetch_one(&self.0)
        .await
        .map_err(|e| find_error("token", e))
    }

    pub async fn insert_token(
        &self,
        token: &str,
        user: UserId,
        expires: Timestamp,
    ) -> std::result::Result<(), InsertError> {
        query(
            "
            INSERT INTO AuthTokens
            (token, userId, expires)
            VALUES
            (?, ?, ?)
            ",
        )
        .bind(token)
        .bind(user)
        .bind(expires)
        .execute(&self.0)
        .await
        .map(|_| ())
        .map_err(|e| insert_error("token", e))
    }

    /// Returns whether a token was removed.
    pub async fn delete_token(&self, token: &str) -> Result<bool> {
        query("DELETE FROM AuthTokens WHERE token = ?")
            .bind(token)
            .execute(&self.0)
            .await
            .map(|done| done.rows_affected() > 0)
            .map_err(|e| {
                error!("error deleting token: {e:?}");
            })
    }

    pub async fn delete_expired_tokens(&self, now: Timestamp) -> Result<u64> {
        query("DELETE FROM AuthTokens WHERE expires <= ?")
            .bind(now)
            .execute(&self.0)
            .await
            .map(|done| done.rows_affected())
            .map_err(|e| {
                error!("error purging expired tokens: {e:?}");
            })
    }
}

impl Backend {
    pub async fn insert_message(&self, message: &str, author: Option<UserId>) -> Result<()> {
        query(
            "
            INSERT INTO Messages
            (message, authorId)
            VALUES
            (?, ?) -- NULL author: anonymous
            ",
        )
        .bind(message)
        .bind(author)
        .execute(&self.0)
        .await
        .map(|_| ())
        .map_err(|e| {
            error!("error inserting message: {e:?}");
        })
    }

    pub async fn messages(&self) -> Result<Vec<Message>> {
        query_as::<_, Message>(
            "
            SELECT Messages.id AS id, Messages.message AS message, Users.username AS author
            FROM Messages
            LEFT JOIN Users
                ON Messages.authorId = Users.id
            ORDER BY Messages.id
            ",
        )
        .fetch_all(&self.0)
        .await
        .map_err(|e| {
            error!("error selecting messages: {e:?}");
        })
    }
}
