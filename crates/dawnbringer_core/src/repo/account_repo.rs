//! Account repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `accounts` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Hard deletion cascades to child tables through foreign keys.

use crate::model::account::{Account, AccountId, AccountStatus, NewAccount};
use crate::repo::schema::ensure_table_ready;
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const ACCOUNT_SELECT_SQL: &str = "SELECT
    id,
    account_uuid,
    first_name,
    middle_name,
    last_name,
    account_status,
    is_deleted,
    parent_id,
    created_at,
    updated_at
FROM accounts";

const ACCOUNT_COLUMNS: &[&str] = &[
    "id",
    "account_uuid",
    "first_name",
    "middle_name",
    "last_name",
    "account_status",
    "is_deleted",
    "parent_id",
    "created_at",
    "updated_at",
];

/// Query options for listing accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountListQuery {
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for account CRUD operations.
pub trait AccountRepository {
    fn create_account(&self, account: &NewAccount) -> RepoResult<Account>;
    /// Persists scalar fields of an existing account. `parent_id`,
    /// `account_uuid` and `created_at` are not rewritten.
    fn update_account(&self, account: &Account) -> RepoResult<Account>;
    fn get_account(&self, id: AccountId, include_deleted: bool) -> RepoResult<Option<Account>>;
    fn list_accounts(&self, query: &AccountListQuery) -> RepoResult<Vec<Account>>;
    fn soft_delete_account(&self, id: AccountId) -> RepoResult<()>;
    fn delete_account(&self, id: AccountId) -> RepoResult<()>;
}

/// SQLite-backed account repository.
pub struct SqliteAccountRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAccountRepository<'conn> {
    /// Constructs a repository from a migrated connection or transaction.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "accounts", ACCOUNT_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl AccountRepository for SqliteAccountRepository<'_> {
    fn create_account(&self, account: &NewAccount) -> RepoResult<Account> {
        account.validate()?;

        self.conn.execute(
            "INSERT INTO accounts (
                account_uuid,
                first_name,
                middle_name,
                last_name,
                account_status,
                is_deleted,
                parent_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6);",
            params![
                Uuid::new_v4().to_string(),
                account.first_name.trim(),
                account.middle_name.as_deref(),
                account.last_name.trim(),
                account.account_status.as_str(),
                account.parent_id,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        load_required_account(self.conn, id)
    }

    fn update_account(&self, account: &Account) -> RepoResult<Account> {
        account.validate()?;

        let changed = self.conn.execute(
            "UPDATE accounts
             SET
                first_name = ?2,
                middle_name = ?3,
                last_name = ?4,
                account_status = ?5,
                is_deleted = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                account.id,
                account.first_name.trim(),
                account.middle_name.as_deref(),
                account.last_name.trim(),
                account.account_status.as_str(),
                bool_to_int(account.is_deleted),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::AccountNotFound(account.id));
        }

        load_required_account(self.conn, account.id)
    }

    fn get_account(&self, id: AccountId, include_deleted: bool) -> RepoResult<Option<Account>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ACCOUNT_SELECT_SQL}
             WHERE id = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id, bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_account_row(row)?));
        }

        Ok(None)
    }

    fn list_accounts(&self, query: &AccountListQuery) -> RepoResult<Vec<Account>> {
        let mut sql = format!("{ACCOUNT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut accounts = Vec::new();

        while let Some(row) = rows.next()? {
            accounts.push(parse_account_row(row)?);
        }

        Ok(accounts)
    }

    fn soft_delete_account(&self, id: AccountId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE accounts
             SET
                is_deleted = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [id],
        )?;

        if changed == 0 {
            return Err(RepoError::AccountNotFound(id));
        }

        Ok(())
    }

    fn delete_account(&self, id: AccountId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM accounts WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Err(RepoError::AccountNotFound(id));
        }

        Ok(())
    }
}

fn load_required_account(conn: &Connection, id: AccountId) -> RepoResult<Account> {
    let mut stmt = conn.prepare(&format!("{ACCOUNT_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return parse_account_row(row);
    }
    Err(RepoError::AccountNotFound(id))
}

fn parse_account_row(row: &Row<'_>) -> RepoResult<Account> {
    let uuid_text: String = row.get("account_uuid")?;
    let account_uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{uuid_text}` in accounts.account_uuid"
        ))
    })?;

    let status_text: String = row.get("account_status")?;
    let account_status = AccountStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid account status `{status_text}` in accounts.account_status"
        ))
    })?;

    let is_deleted = match row.get::<_, i64>("is_deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_deleted value `{other}` in accounts.is_deleted"
            )));
        }
    };

    let account = Account {
        id: row.get("id")?,
        account_uuid,
        first_name: row.get("first_name")?,
        middle_name: row.get("middle_name")?,
        last_name: row.get("last_name")?,
        account_status,
        is_deleted,
        parent_id: row.get("parent_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    account.validate()?;
    Ok(account)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
