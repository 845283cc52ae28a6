//! Child relations owned by an account.
//!
//! # Responsibility
//! - Define the four child field schemas and their partial-update patches.
//! - Provide the per-relation merge and validation rules used by
//!   reconciliation.
//!
//! # Invariants
//! - `Child::account_id` is fixed at creation and never rewritten.
//! - `merge` keeps the existing value for every field the patch omits.
//! - Persisted field values always pass `validate`.

use crate::model::account::AccountId;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

static BIRTHDATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").expect("valid birthdate regex")
});
static CONTACT_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 \-]{5,19}$").expect("valid contact number regex"));

/// Storage row id of a child record.
pub type ChildId = i64;

/// The four child relations of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    PersonalInfo,
    ContactInfo,
    AddressInfo,
    AvatarInfo,
}

impl RelationKind {
    /// Relation name as it appears in payloads and log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PersonalInfo => "personal_info",
            Self::ContactInfo => "contact_info",
            Self::AddressInfo => "address_info",
            Self::AvatarInfo => "avatar_info",
        }
    }
}

impl Display for RelationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failures for child field values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildValidationError {
    /// A required field was not supplied when creating a child.
    MissingField {
        relation: RelationKind,
        field: &'static str,
    },
    /// A text field is empty after trimming.
    BlankField {
        relation: RelationKind,
        field: &'static str,
    },
    /// Birthdate is not an ISO `YYYY-MM-DD` date.
    InvalidBirthdate(String),
    /// Contact number contains characters other than digits, spaces, dashes
    /// and a leading `+`, or has the wrong length.
    InvalidContactNumber(String),
}

impl Display for ChildValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { relation, field } => {
                write!(f, "{relation}.{field} is required")
            }
            Self::BlankField { relation, field } => {
                write!(f, "{relation}.{field} must not be blank")
            }
            Self::InvalidBirthdate(value) => {
                write!(f, "invalid birthdate `{value}`, expected YYYY-MM-DD")
            }
            Self::InvalidContactNumber(value) => write!(f, "invalid contact number `{value}`"),
        }
    }
}

impl Error for ChildValidationError {}

/// Field schema of one child relation.
///
/// Implementations define how a relation is built from a create payload,
/// how an update payload is merged into persisted values, and which values
/// are acceptable.
pub trait ChildFields: Clone + Debug + PartialEq {
    /// Partial field set carried by create and update payloads.
    type Patch: Clone + Debug + Default;

    const RELATION: RelationKind;

    /// Builds a complete field set from a create payload.
    ///
    /// Fails with `MissingField` when a required field is absent.
    fn from_patch(patch: &Self::Patch) -> Result<Self, ChildValidationError>;

    /// Overwrites each field the patch carries and keeps the others.
    fn merge(&mut self, patch: &Self::Patch);

    fn validate(&self) -> Result<(), ChildValidationError>;
}

/// Persisted child record of relation `F`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Child<F> {
    pub id: ChildId,
    #[serde(skip_serializing)]
    pub account_id: AccountId,
    #[serde(flatten)]
    pub fields: F,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonalInfo {
    /// ISO `YYYY-MM-DD`.
    pub birthdate: String,
    pub gender: Gender,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalInfoPatch {
    pub birthdate: Option<String>,
    pub gender: Option<Gender>,
}

impl ChildFields for PersonalInfo {
    type Patch = PersonalInfoPatch;

    const RELATION: RelationKind = RelationKind::PersonalInfo;

    fn from_patch(patch: &Self::Patch) -> Result<Self, ChildValidationError> {
        Ok(Self {
            birthdate: required(Self::RELATION, "birthdate", patch.birthdate.as_ref())?,
            gender: patch.gender.ok_or(ChildValidationError::MissingField {
                relation: Self::RELATION,
                field: "gender",
            })?,
        })
    }

    fn merge(&mut self, patch: &Self::Patch) {
        if let Some(birthdate) = &patch.birthdate {
            self.birthdate = birthdate.trim().to_string();
        }
        if let Some(gender) = patch.gender {
            self.gender = gender;
        }
    }

    fn validate(&self) -> Result<(), ChildValidationError> {
        // Regex pins zero-padded digits; chrono rejects days the month lacks.
        if !BIRTHDATE_RE.is_match(&self.birthdate)
            || NaiveDate::parse_from_str(&self.birthdate, "%Y-%m-%d").is_err()
        {
            return Err(ChildValidationError::InvalidBirthdate(
                self.birthdate.clone(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactInfo {
    pub contact_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactInfoPatch {
    pub contact_number: Option<String>,
}

impl ChildFields for ContactInfo {
    type Patch = ContactInfoPatch;

    const RELATION: RelationKind = RelationKind::ContactInfo;

    fn from_patch(patch: &Self::Patch) -> Result<Self, ChildValidationError> {
        Ok(Self {
            contact_number: required(
                Self::RELATION,
                "contact_number",
                patch.contact_number.as_ref(),
            )?,
        })
    }

    fn merge(&mut self, patch: &Self::Patch) {
        if let Some(contact_number) = &patch.contact_number {
            self.contact_number = contact_number.trim().to_string();
        }
    }

    fn validate(&self) -> Result<(), ChildValidationError> {
        if !CONTACT_NUMBER_RE.is_match(&self.contact_number) {
            return Err(ChildValidationError::InvalidContactNumber(
                self.contact_number.clone(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressInfo {
    pub street: String,
    pub city: String,
    pub state: String,
}

impl AddressInfo {
    /// `street, city, state`.
    pub fn full_address(&self) -> String {
        format!("{}, {}, {}", self.street, self.city, self.state)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressInfoPatch {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl ChildFields for AddressInfo {
    type Patch = AddressInfoPatch;

    const RELATION: RelationKind = RelationKind::AddressInfo;

    fn from_patch(patch: &Self::Patch) -> Result<Self, ChildValidationError> {
        Ok(Self {
            street: required(Self::RELATION, "street", patch.street.as_ref())?,
            city: required(Self::RELATION, "city", patch.city.as_ref())?,
            state: required(Self::RELATION, "state", patch.state.as_ref())?,
        })
    }

    fn merge(&mut self, patch: &Self::Patch) {
        merge_text(&mut self.street, patch.street.as_ref());
        merge_text(&mut self.city, patch.city.as_ref());
        merge_text(&mut self.state, patch.state.as_ref());
    }

    fn validate(&self) -> Result<(), ChildValidationError> {
        not_blank(Self::RELATION, "street", &self.street)?;
        not_blank(Self::RELATION, "city", &self.city)?;
        not_blank(Self::RELATION, "state", &self.state)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvatarInfo {
    pub file_name: String,
    /// Storage path or URL of the uploaded file. The bytes live outside this
    /// database.
    pub file_attachment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarInfoPatch {
    pub file_name: Option<String>,
    pub file_attachment: Option<String>,
}

impl ChildFields for AvatarInfo {
    type Patch = AvatarInfoPatch;

    const RELATION: RelationKind = RelationKind::AvatarInfo;

    fn from_patch(patch: &Self::Patch) -> Result<Self, ChildValidationError> {
        Ok(Self {
            file_name: required(Self::RELATION, "file_name", patch.file_name.as_ref())?,
            file_attachment: required(
                Self::RELATION,
                "file_attachment",
                patch.file_attachment.as_ref(),
            )?,
        })
    }

    fn merge(&mut self, patch: &Self::Patch) {
        merge_text(&mut self.file_name, patch.file_name.as_ref());
        merge_text(&mut self.file_attachment, patch.file_attachment.as_ref());
    }

    fn validate(&self) -> Result<(), ChildValidationError> {
        not_blank(Self::RELATION, "file_name", &self.file_name)?;
        not_blank(Self::RELATION, "file_attachment", &self.file_attachment)
    }
}

fn required(
    relation: RelationKind,
    field: &'static str,
    value: Option<&String>,
) -> Result<String, ChildValidationError> {
    value
        .map(|value| value.trim().to_string())
        .ok_or(ChildValidationError::MissingField { relation, field })
}

fn merge_text(target: &mut String, value: Option<&String>) {
    if let Some(value) = value {
        *target = value.trim().to_string();
    }
}

fn not_blank(
    relation: RelationKind,
    field: &'static str,
    value: &str,
) -> Result<(), ChildValidationError> {
    if value.trim().is_empty() {
        return Err(ChildValidationError::BlankField { relation, field });
    }
    Ok(())
}
