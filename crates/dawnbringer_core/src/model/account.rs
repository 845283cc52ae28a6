//! Account domain model.
//!
//! # Invariants
//! - `id` is assigned by storage and never reused.
//! - `account_uuid` is the stable public identifier exposed as `account_id`.
//! - An account is never its own parent.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Storage row id of an account.
pub type AccountId = i64;

/// Lifecycle state of an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

impl AccountStatus {
    /// Stable string stored in `accounts.account_status`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }
}

/// Validation failures for account scalar fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountValidationError {
    BlankFirstName,
    BlankLastName,
    SelfParent(AccountId),
}

impl Display for AccountValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankFirstName => write!(f, "first_name must not be blank"),
            Self::BlankLastName => write!(f, "last_name must not be blank"),
            Self::SelfParent(id) => write!(f, "account {id} cannot be its own parent"),
        }
    }
}

impl Error for AccountValidationError {}

/// Persisted account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: AccountId,
    #[serde(rename = "account_id")]
    pub account_uuid: Uuid,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub account_status: AccountStatus,
    pub is_deleted: bool,
    #[serde(rename = "parent")]
    pub parent_id: Option<AccountId>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Account {
    /// First, middle and last name joined by single spaces.
    pub fn full_name(&self) -> String {
        join_name(&self.first_name, self.middle_name.as_deref(), &self.last_name)
    }

    /// Display name used by list and avatar views.
    pub fn account_name(&self) -> String {
        self.full_name()
    }

    /// Human-facing account number derived from the row id.
    pub fn account_number(&self) -> String {
        format_account_number(self.id)
    }

    pub fn validate(&self) -> Result<(), AccountValidationError> {
        validate_names(&self.first_name, &self.last_name)?;
        if self.parent_id == Some(self.id) {
            return Err(AccountValidationError::SelfParent(self.id));
        }
        Ok(())
    }
}

/// Account fields supplied at creation time, before an id exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub account_status: AccountStatus,
    pub parent_id: Option<AccountId>,
}

impl NewAccount {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            middle_name: None,
            last_name: last_name.into(),
            account_status: AccountStatus::default(),
            parent_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), AccountValidationError> {
        validate_names(&self.first_name, &self.last_name)
    }
}

/// Formats `ACC-` followed by the id zero-padded to eight digits.
pub fn format_account_number(id: AccountId) -> String {
    format!("ACC-{id:08}")
}

/// Trims a middle name and maps blank input to `None`.
pub fn normalize_middle_name(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn validate_names(first_name: &str, last_name: &str) -> Result<(), AccountValidationError> {
    if first_name.trim().is_empty() {
        return Err(AccountValidationError::BlankFirstName);
    }
    if last_name.trim().is_empty() {
        return Err(AccountValidationError::BlankLastName);
    }
    Ok(())
}

fn join_name(first: &str, middle: Option<&str>, last: &str) -> String {
    [Some(first), middle, Some(last)]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
