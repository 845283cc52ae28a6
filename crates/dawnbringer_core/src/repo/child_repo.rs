//! Child relation persistence contracts and generic SQLite implementation.
//!
//! # Responsibility
//! - Define the per-relation store contract consumed by reconciliation.
//! - Map each child field schema onto its table with one generic repository.
//!
//! # Invariants
//! - Every query filters by both child `id` and owning `account_id`; a child
//!   of another account is indistinguishable from a missing one.
//! - `create` and `save` validate fields before touching SQL.

use crate::model::account::AccountId;
use crate::model::child::{
    AddressInfo, AvatarInfo, Child, ChildFields, ChildId, ContactInfo, Gender, PersonalInfo,
};
use crate::repo::schema::ensure_table_ready;
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::marker::PhantomData;

/// Persistence contract for one child relation of an account.
pub trait ChildStore<F: ChildFields> {
    /// Loads a child only when it belongs to `account_id`.
    fn find_by_id_and_parent(
        &self,
        id: ChildId,
        account_id: AccountId,
    ) -> RepoResult<Option<Child<F>>>;
    /// Lists every child of `account_id` ordered by id.
    fn find_all_by_parent(&self, account_id: AccountId) -> RepoResult<Vec<Child<F>>>;
    fn create(&self, account_id: AccountId, fields: &F) -> RepoResult<Child<F>>;
    fn save(&self, child: &Child<F>) -> RepoResult<Child<F>>;
    fn delete(&self, child: &Child<F>) -> RepoResult<()>;
}

/// Table mapping of one child field schema.
pub trait ChildTable: ChildFields {
    const TABLE: &'static str;
    /// Field columns in bind order, excluding `id` and `account_id`.
    const COLUMNS: &'static [&'static str];

    /// Field values in `COLUMNS` order.
    fn to_values(&self) -> Vec<Value>;
    fn from_row(row: &Row<'_>) -> RepoResult<Self>;
}

/// SQLite-backed store for child relation `F`.
pub struct SqliteChildRepository<'conn, F> {
    conn: &'conn Connection,
    _fields: PhantomData<F>,
}

impl<'conn, F: ChildTable> SqliteChildRepository<'conn, F> {
    /// Constructs a repository from a migrated connection or transaction.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let mut columns = vec!["id", "account_id"];
        columns.extend_from_slice(F::COLUMNS);
        ensure_table_ready(conn, F::TABLE, &columns)?;
        Ok(Self {
            conn,
            _fields: PhantomData,
        })
    }

    fn select_sql() -> String {
        format!(
            "SELECT id, account_id, {} FROM {}",
            F::COLUMNS.join(", "),
            F::TABLE
        )
    }
}

impl<F: ChildTable> ChildStore<F> for SqliteChildRepository<'_, F> {
    fn find_by_id_and_parent(
        &self,
        id: ChildId,
        account_id: AccountId,
    ) -> RepoResult<Option<Child<F>>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE id = ?1 AND account_id = ?2;",
            Self::select_sql()
        ))?;
        let mut rows = stmt.query(params![id, account_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_child_row(row)?));
        }
        Ok(None)
    }

    fn find_all_by_parent(&self, account_id: AccountId) -> RepoResult<Vec<Child<F>>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE account_id = ?1 ORDER BY id ASC;",
            Self::select_sql()
        ))?;
        let mut rows = stmt.query([account_id])?;
        let mut children = Vec::new();
        while let Some(row) = rows.next()? {
            children.push(parse_child_row(row)?);
        }
        Ok(children)
    }

    fn create(&self, account_id: AccountId, fields: &F) -> RepoResult<Child<F>> {
        fields.validate()?;

        let placeholders = (2..=F::COLUMNS.len() + 1)
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut values = vec![Value::Integer(account_id)];
        values.extend(fields.to_values());

        self.conn.execute(
            &format!(
                "INSERT INTO {} (account_id, {}) VALUES (?1, {placeholders});",
                F::TABLE,
                F::COLUMNS.join(", ")
            ),
            params_from_iter(values),
        )?;

        Ok(Child {
            id: self.conn.last_insert_rowid(),
            account_id,
            fields: fields.clone(),
        })
    }

    fn save(&self, child: &Child<F>) -> RepoResult<Child<F>> {
        child.fields.validate()?;

        let assignments = F::COLUMNS
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let id_index = F::COLUMNS.len() + 1;
        let mut values = child.fields.to_values();
        values.push(Value::Integer(child.id));
        values.push(Value::Integer(child.account_id));

        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET {assignments} WHERE id = ?{id_index} AND account_id = ?{};",
                F::TABLE,
                id_index + 1
            ),
            params_from_iter(values),
        )?;

        if changed == 0 {
            return Err(RepoError::ChildNotFound {
                relation: F::RELATION,
                id: child.id,
            });
        }

        Ok(child.clone())
    }

    fn delete(&self, child: &Child<F>) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "DELETE FROM {} WHERE id = ?1 AND account_id = ?2;",
                F::TABLE
            ),
            params![child.id, child.account_id],
        )?;

        if changed == 0 {
            return Err(RepoError::ChildNotFound {
                relation: F::RELATION,
                id: child.id,
            });
        }

        Ok(())
    }
}

fn parse_child_row<F: ChildTable>(row: &Row<'_>) -> RepoResult<Child<F>> {
    let fields = F::from_row(row)?;
    fields.validate()?;
    Ok(Child {
        id: row.get("id")?,
        account_id: row.get("account_id")?,
        fields,
    })
}

impl ChildTable for PersonalInfo {
    const TABLE: &'static str = "personal_info";
    const COLUMNS: &'static [&'static str] = &["birthdate", "gender"];

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.birthdate.clone()),
            Value::Text(self.gender.as_str().to_string()),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let gender_text: String = row.get("gender")?;
        let gender = Gender::parse(&gender_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid gender `{gender_text}` in personal_info.gender"
            ))
        })?;
        Ok(Self {
            birthdate: row.get("birthdate")?,
            gender,
        })
    }
}

impl ChildTable for ContactInfo {
    const TABLE: &'static str = "contact_info";
    const COLUMNS: &'static [&'static str] = &["contact_number"];

    fn to_values(&self) -> Vec<Value> {
        vec![Value::Text(self.contact_number.clone())]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            contact_number: row.get("contact_number")?,
        })
    }
}

impl ChildTable for AddressInfo {
    const TABLE: &'static str = "address_info";
    const COLUMNS: &'static [&'static str] = &["street", "city", "state"];

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.street.clone()),
            Value::Text(self.city.clone()),
            Value::Text(self.state.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            street: row.get("street")?,
            city: row.get("city")?,
            state: row.get("state")?,
        })
    }
}

impl ChildTable for AvatarInfo {
    const TABLE: &'static str = "avatar_info";
    const COLUMNS: &'static [&'static str] = &["file_name", "file_attachment"];

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.file_name.clone()),
            Value::Text(self.file_attachment.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            file_name: row.get("file_name")?,
            file_attachment: row.get("file_attachment")?,
        })
    }
}
