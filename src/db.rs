use crate::db::error::DbError;

pub mod error;
pub mod repo;

pub type DbResult<T> = Result<T, DbError>;
