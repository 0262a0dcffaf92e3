use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Message {
    pub id: i64,
    pub message: String,
    // None when posted anonymously
    pub author: Option<String>,
}
