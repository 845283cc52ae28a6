//! Read models returned by account use-cases.

use crate::model::account::{Account, AccountId, AccountStatus};
use crate::model::child::{AddressInfo, AvatarInfo, Child, ContactInfo, PersonalInfo};
use serde::Serialize;
use uuid::Uuid;

/// Address child with its derived single-line form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressInfoView {
    #[serde(flatten)]
    pub address: Child<AddressInfo>,
    pub full_address: String,
}

impl From<Child<AddressInfo>> for AddressInfoView {
    fn from(address: Child<AddressInfo>) -> Self {
        let full_address = address.fields.full_address();
        Self {
            address,
            full_address,
        }
    }
}

/// Full account detail with every child relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountProfile {
    #[serde(flatten)]
    pub account: Account,
    pub full_name: String,
    pub account_number: String,
    /// Full name of the parent account, when one is set and still exists.
    pub parent_name: Option<String>,
    pub personal_info: Vec<Child<PersonalInfo>>,
    pub contact_info: Vec<Child<ContactInfo>>,
    pub address_info: Vec<AddressInfoView>,
    pub avatar_info: Vec<Child<AvatarInfo>>,
}

/// Row of the account listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountListItem {
    #[serde(skip_serializing)]
    pub id: AccountId,
    pub account_id: Uuid,
    pub account_name: String,
    pub account_number: String,
    pub parent_account_name: Option<String>,
    pub parent_account_number: Option<String>,
    pub account_status: AccountStatus,
    /// Creation time in epoch milliseconds.
    pub created: i64,
}

impl AccountListItem {
    pub fn new(account: &Account, parent: Option<&Account>) -> Self {
        Self {
            id: account.id,
            account_id: account.account_uuid,
            account_name: account.account_name(),
            account_number: account.account_number(),
            parent_account_name: parent.map(Account::account_name),
            parent_account_number: parent.map(Account::account_number),
            account_status: account.account_status,
            created: account.created_at,
        }
    }
}

/// Avatar-only projection of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountAvatar {
    pub account_id: Uuid,
    pub account_name: String,
    pub account_number: String,
    pub avatar_info: Vec<String>,
}

impl AccountAvatar {
    pub fn new(account: &Account, avatars: &[Child<AvatarInfo>]) -> Self {
        Self {
            account_id: account.account_uuid,
            account_name: account.account_name(),
            account_number: account.account_number(),
            avatar_info: avatars
                .iter()
                .map(|avatar| avatar.fields.file_attachment.clone())
                .collect(),
        }
    }
}
