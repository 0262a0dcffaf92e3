#[derive(Debug)]
pub enum FindError {
    NotFound,
    Internal,
}

#[derive(Debug)]
pub enum InsertError {
    Conflict,
    Internal,
}

mod backend_sql;
pub use backend_sql::*;
