//! Request payloads for account create/update use-cases.
//!
//! # Invariants
//! - Unknown JSON fields are ignored at this layer.
//! - A relation key that is missing or `null` in an update payload is
//!   `RelationPayload::Absent`; an empty list is `Present(vec![])`.

use crate::model::account::{AccountId, AccountStatus};
use crate::model::child::{
    AddressInfoPatch, AvatarInfoPatch, ChildId, ContactInfoPatch, PersonalInfoPatch,
};
use serde::{Deserialize, Deserializer};

/// One incoming child entry of an update payload.
///
/// `id` present means "update the persisted child with this id"; absent
/// means "create a new child".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChildEntry<P> {
    #[serde(default)]
    pub id: Option<ChildId>,
    #[serde(flatten)]
    pub fields: P,
}

impl<P> ChildEntry<P> {
    pub fn new(fields: P) -> Self {
        Self { id: None, fields }
    }

    pub fn existing(id: ChildId, fields: P) -> Self {
        Self {
            id: Some(id),
            fields,
        }
    }
}

/// Incoming payload for one child relation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RelationPayload<P> {
    /// Relation not supplied. Persisted children stay untouched.
    #[default]
    Absent,
    /// Relation supplied. Persisted children are synchronized to exactly
    /// these entries; an empty list removes every child.
    Present(Vec<ChildEntry<P>>),
}

impl<P> RelationPayload<P> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn entries(&self) -> Option<&[ChildEntry<P>]> {
        match self {
            Self::Absent => None,
            Self::Present(entries) => Some(entries),
        }
    }
}

impl<P> From<Option<Vec<ChildEntry<P>>>> for RelationPayload<P> {
    fn from(value: Option<Vec<ChildEntry<P>>>) -> Self {
        match value {
            Some(entries) => Self::Present(entries),
            None => Self::Absent,
        }
    }
}

impl<P> From<Vec<ChildEntry<P>>> for RelationPayload<P> {
    fn from(value: Vec<ChildEntry<P>>) -> Self {
        Self::Present(value)
    }
}

impl<'de, P> Deserialize<'de> for RelationPayload<P>
where
    P: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<Vec<ChildEntry<P>>>::deserialize(deserializer).map(Self::from)
    }
}

/// Create payload: account fields plus initial children of every relation.
///
/// Children are inserted as-is; any `id` keys in child entries are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AccountCreateRequest {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    #[serde(default)]
    pub account_status: AccountStatus,
    #[serde(default, alias = "parent")]
    pub parent_id: Option<AccountId>,
    #[serde(default)]
    pub personal_info: Vec<PersonalInfoPatch>,
    #[serde(default)]
    pub contact_info: Vec<ContactInfoPatch>,
    #[serde(default)]
    pub address_info: Vec<AddressInfoPatch>,
    #[serde(default)]
    pub avatar_info: Vec<AvatarInfoPatch>,
}

/// Update payload: every scalar is optional ("keep existing when absent")
/// and every relation is tri-state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AccountUpdateRequest {
    pub first_name: Option<String>,
    /// A blank value clears the middle name.
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub account_status: Option<AccountStatus>,
    pub is_deleted: Option<bool>,
    pub personal_info: RelationPayload<PersonalInfoPatch>,
    pub contact_info: RelationPayload<ContactInfoPatch>,
    pub address_info: RelationPayload<AddressInfoPatch>,
    pub avatar_info: RelationPayload<AvatarInfoPatch>,
}
