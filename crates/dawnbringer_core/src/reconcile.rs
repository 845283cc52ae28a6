//! Nested child-collection reconciliation.
//!
//! # Responsibility
//! - Synchronize the persisted children of one relation of one account to an
//!   incoming update payload: update by id, create without id, delete the
//!   rest.
//!
//! # Invariants
//! - `RelationPayload::Absent` performs no reads and no writes.
//! - Ids are matched only against children of the given account. An id that
//!   is unknown, or that belongs to another account, is skipped: nothing is
//!   created for it and it does not protect any child from deletion.
//! - After a successful call, the persisted id set of the relation equals
//!   the returned `kept` set.
//! - Errors propagate unchanged and leave partial writes to the caller's
//!   transaction to roll back.

use crate::model::account::Account;
use crate::model::child::{ChildFields, ChildId, RelationKind};
use crate::model::payload::RelationPayload;
use crate::repo::child_repo::ChildStore;
use crate::repo::RepoResult;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeSet;

/// What one reconciliation pass changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub relation: RelationKind,
    /// Ids that survive: updated plus newly created children.
    pub kept: BTreeSet<ChildId>,
    pub created: Vec<ChildId>,
    pub updated: Vec<ChildId>,
    pub deleted: Vec<ChildId>,
    /// Incoming ids that matched no child of the account.
    pub skipped: Vec<ChildId>,
}

impl ReconcileReport {
    fn new(relation: RelationKind) -> Self {
        Self {
            relation,
            kept: BTreeSet::new(),
            created: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Result of reconciling one relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Payload was absent; the relation was not touched.
    Untouched,
    Synced(ReconcileReport),
}

impl ReconcileOutcome {
    pub fn kept(&self) -> Option<&BTreeSet<ChildId>> {
        match self {
            Self::Untouched => None,
            Self::Synced(report) => Some(&report.kept),
        }
    }

    pub fn report(&self) -> Option<&ReconcileReport> {
        match self {
            Self::Untouched => None,
            Self::Synced(report) => Some(report),
        }
    }
}

/// Reconciles the `F` children of `account` against `payload`.
///
/// Entries are processed in order. An entry with an id updates the matching
/// child of `account` field by field (absent fields keep their value); an
/// entry without id creates a child. Children whose id is not kept are then
/// deleted. Run this inside the transaction that owns the whole account
/// update.
pub fn reconcile<F, S>(
    store: &S,
    account: &Account,
    payload: &RelationPayload<F::Patch>,
) -> RepoResult<ReconcileOutcome>
where
    F: ChildFields,
    S: ChildStore<F> + ?Sized,
{
    let Some(entries) = payload.entries() else {
        debug!(
            "event=reconcile module=reconcile status=skip relation={} account_id={} reason=absent_payload",
            F::RELATION,
            account.id
        );
        return Ok(ReconcileOutcome::Untouched);
    };

    let mut report = ReconcileReport::new(F::RELATION);

    for entry in entries {
        match entry.id {
            Some(id) => match store.find_by_id_and_parent(id, account.id)? {
                Some(mut child) => {
                    child.fields.merge(&entry.fields);
                    let saved = store.save(&child)?;
                    report.kept.insert(saved.id);
                    report.updated.push(saved.id);
                }
                None => {
                    warn!(
                        "event=reconcile_skip module=reconcile status=skip relation={} account_id={} child_id={} reason=unknown_id",
                        F::RELATION,
                        account.id,
                        id
                    );
                    report.skipped.push(id);
                }
            },
            None => {
                let fields = F::from_patch(&entry.fields)?;
                let created = store.create(account.id, &fields)?;
                report.kept.insert(created.id);
                report.created.push(created.id);
            }
        }
    }

    for child in store.find_all_by_parent(account.id)? {
        if !report.kept.contains(&child.id) {
            store.delete(&child)?;
            report.deleted.push(child.id);
        }
    }

    info!(
        "event=reconcile module=reconcile status=ok relation={} account_id={} created={} updated={} deleted={} skipped={}",
        F::RELATION,
        account.id,
        report.created.len(),
        report.updated.len(),
        report.deleted.len(),
        report.skipped.len()
    );

    Ok(ReconcileOutcome::Synced(report))
}
