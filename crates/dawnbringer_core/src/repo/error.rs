use crate::db::DbError;
use crate::model::account::{AccountId, AccountValidationError};
use crate::model::child::{ChildId, ChildValidationError, RelationKind};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for account and child persistence operations.
#[derive(Debug)]
pub enum RepoError {
    InvalidAccount(AccountValidationError),
    InvalidChild(ChildValidationError),
    Db(DbError),
    AccountNotFound(AccountId),
    ChildNotFound {
        relation: RelationKind,
        id: ChildId,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAccount(err) => write!(f, "{err}"),
            Self::InvalidChild(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::AccountNotFound(id) => write!(f, "account not found: {id}"),
            Self::ChildNotFound { relation, id } => write!(f, "{relation} not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "account repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "account repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "account repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidAccount(err) => Some(err),
            Self::InvalidChild(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AccountValidationError> for RepoError {
    fn from(value: AccountValidationError) -> Self {
        Self::InvalidAccount(value)
    }
}

impl From<ChildValidationError> for RepoError {
    fn from(value: ChildValidationError) -> Self {
        Self::InvalidChild(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
