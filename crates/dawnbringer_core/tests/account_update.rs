use dawnbringer_core::db::open_db_in_memory;
use dawnbringer_core::{
    AccountCreateRequest, AccountService, AccountServiceError, AccountUpdateRequest,
    AddressInfoPatch, ChildEntry, ChildId, ChildValidationError, ContactInfoPatch, Gender,
    PersonalInfoPatch, ReconcileOutcome, RelationKind, RelationPayload,
};
use std::collections::BTreeSet;

fn contact(number: &str) -> ContactInfoPatch {
    ContactInfoPatch {
        contact_number: Some(number.to_string()),
    }
}

fn create_request(first_name: &str, contacts: &[&str]) -> AccountCreateRequest {
    AccountCreateRequest {
        first_name: first_name.to_string(),
        last_name: "Hopper".to_string(),
        contact_info: contacts.iter().map(|number| contact(number)).collect(),
        ..AccountCreateRequest::default()
    }
}

fn contact_ids(service: &AccountService<'_>, account_id: i64) -> Vec<ChildId> {
    service
        .get_account_profile(account_id)
        .unwrap()
        .unwrap()
        .contact_info
        .iter()
        .map(|child| child.id)
        .collect()
}

#[test]
fn update_keeps_listed_children_creates_new_and_deletes_the_rest() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = AccountService::try_new(&mut conn).unwrap();
    let profile = service
        .create_account(&create_request("Grace", &["5550001", "5550002", "5550003"]))
        .unwrap();
    let ids: Vec<ChildId> = profile.contact_info.iter().map(|c| c.id).collect();
    assert_eq!(ids.len(), 3);

    let request = AccountUpdateRequest {
        contact_info: RelationPayload::Present(vec![
            ChildEntry::existing(ids[0], contact("5550101")),
            ChildEntry::existing(ids[2], ContactInfoPatch::default()),
            ChildEntry::new(contact("5550404")),
        ]),
        ..AccountUpdateRequest::default()
    };
    let result = service.update_account(profile.account.id, &request).unwrap();

    let report = result.contact_info.report().unwrap();
    assert_eq!(report.relation, RelationKind::ContactInfo);
    assert_eq!(report.updated, vec![ids[0], ids[2]]);
    assert_eq!(report.deleted, vec![ids[1]]);
    assert_eq!(report.created.len(), 1);
    assert!(report.skipped.is_empty());

    let persisted: BTreeSet<ChildId> = result.profile.contact_info.iter().map(|c| c.id).collect();
    assert_eq!(&persisted, result.contact_info.kept().unwrap());
    assert!(!persisted.contains(&ids[1]));

    let numbers: Vec<&str> = result
        .profile
        .contact_info
        .iter()
        .map(|c| c.fields.contact_number.as_str())
        .collect();
    assert!(numbers.contains(&"5550101"));
    assert!(numbers.contains(&"5550003"));
    assert!(numbers.contains(&"5550404"));
}

#[test]
fn unknown_child_id_is_skipped_without_creating_anything() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = AccountService::try_new(&mut conn).unwrap();
    let profile = service
        .create_account(&create_request("Grace", &["5550001"]))
        .unwrap();

    let request = AccountUpdateRequest {
        contact_info: RelationPayload::Present(vec![ChildEntry::existing(
            999,
            contact("5550999"),
        )]),
        ..AccountUpdateRequest::default()
    };
    let result = service.update_account(profile.account.id, &request).unwrap();

    let report = result.contact_info.report().unwrap();
    assert_eq!(report.skipped, vec![999]);
    assert!(report.created.is_empty());
    assert!(result.profile.contact_info.is_empty());
}

#[test]
fn child_id_of_another_account_is_ignored_and_left_intact() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = AccountService::try_new(&mut conn).unwrap();
    let target = service
        .create_account(&create_request("Grace", &["5550001"]))
        .unwrap();
    let other = service
        .create_account(&create_request("Alan", &["5550777"]))
        .unwrap();
    let foreign_id = other.contact_info[0].id;

    let request = AccountUpdateRequest {
        contact_info: RelationPayload::Present(vec![ChildEntry::existing(
            foreign_id,
            contact("5550000"),
        )]),
        ..AccountUpdateRequest::default()
    };
    let result = service.update_account(target.account.id, &request).unwrap();

    assert_eq!(result.contact_info.report().unwrap().skipped, vec![foreign_id]);
    assert!(result.profile.contact_info.is_empty());

    let other_after = service
        .get_account_profile(other.account.id)
        .unwrap()
        .unwrap();
    assert_eq!(other_after.contact_info, other.contact_info);
}

#[test]
fn absent_relation_leaves_children_untouched() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = AccountService::try_new(&mut conn).unwrap();
    let profile = service
        .create_account(&create_request("Grace", &["5550001", "5550002"]))
        .unwrap();
    let before = contact_ids(&service, profile.account.id);

    let request = AccountUpdateRequest {
        first_name: Some("Gracie".to_string()),
        ..AccountUpdateRequest::default()
    };
    let result = service.update_account(profile.account.id, &request).unwrap();

    assert_eq!(result.contact_info, ReconcileOutcome::Untouched);
    assert_eq!(result.personal_info, ReconcileOutcome::Untouched);
    assert_eq!(result.profile.account.first_name, "Gracie");
    assert_eq!(contact_ids(&service, profile.account.id), before);
}

#[test]
fn empty_relation_list_deletes_every_child() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = AccountService::try_new(&mut conn).unwrap();
    let profile = service
        .create_account(&create_request("Grace", &["5550001", "5550002"]))
        .unwrap();

    let request = AccountUpdateRequest {
        contact_info: RelationPayload::Present(Vec::new()),
        ..AccountUpdateRequest::default()
    };
    let result = service.update_account(profile.account.id, &request).unwrap();

    assert_eq!(result.contact_info.report().unwrap().deleted.len(), 2);
    assert!(contact_ids(&service, profile.account.id).is_empty());
}

#[test]
fn repeating_an_id_only_update_changes_nothing() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = AccountService::try_new(&mut conn).unwrap();
    let profile = service
        .create_account(&create_request("Grace", &["5550001", "5550002"]))
        .unwrap();
    let ids = contact_ids(&service, profile.account.id);

    let request = AccountUpdateRequest {
        contact_info: RelationPayload::Present(vec![
            ChildEntry::existing(ids[0], contact("5550011")),
            ChildEntry::existing(ids[1], contact("5550022")),
        ]),
        ..AccountUpdateRequest::default()
    };
    let first = service.update_account(profile.account.id, &request).unwrap();
    let second = service.update_account(profile.account.id, &request).unwrap();

    assert_eq!(first.profile.contact_info, second.profile.contact_info);
    assert!(second.contact_info.report().unwrap().created.is_empty());
    assert!(second.contact_info.report().unwrap().deleted.is_empty());
}

#[test]
fn failed_reconciliation_rolls_back_the_whole_update() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = AccountService::try_new(&mut conn).unwrap();
    let profile = service
        .create_account(&create_request("Grace", &["5550001"]))
        .unwrap();
    let before = service
        .get_account_profile(profile.account.id)
        .unwrap()
        .unwrap();

    let request = AccountUpdateRequest {
        first_name: Some("Changed".to_string()),
        personal_info: RelationPayload::Present(vec![ChildEntry::new(PersonalInfoPatch {
            birthdate: Some("1906-12-09".to_string()),
            gender: Some(Gender::Female),
        })]),
        contact_info: RelationPayload::Present(Vec::new()),
        address_info: RelationPayload::Present(vec![ChildEntry::new(AddressInfoPatch {
            street: None,
            city: Some("Arlington".to_string()),
            state: Some("VA".to_string()),
        })]),
        ..AccountUpdateRequest::default()
    };
    let err = service
        .update_account(profile.account.id, &request)
        .unwrap_err();

    assert!(matches!(
        err,
        AccountServiceError::InvalidChild(ChildValidationError::MissingField {
            relation: RelationKind::AddressInfo,
            field: "street",
        })
    ));
    assert!(err.is_validation());

    let after = service
        .get_account_profile(profile.account.id)
        .unwrap()
        .unwrap();
    assert_eq!(after, before);
    assert!(after.personal_info.is_empty());
    assert_eq!(after.contact_info.len(), 1);
}

#[test]
fn invalid_scalar_update_is_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = AccountService::try_new(&mut conn).unwrap();
    let profile = service
        .create_account(&create_request("Grace", &[]))
        .unwrap();

    let request = AccountUpdateRequest {
        last_name: Some("   ".to_string()),
        ..AccountUpdateRequest::default()
    };
    let err = service
        .update_account(profile.account.id, &request)
        .unwrap_err();
    assert!(matches!(err, AccountServiceError::InvalidAccount(_)));
}

#[test]
fn update_of_missing_account_returns_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = AccountService::try_new(&mut conn).unwrap();

    let err = service
        .update_account(4040, &AccountUpdateRequest::default())
        .unwrap_err();
    assert!(matches!(err, AccountServiceError::AccountNotFound(4040)));
}

#[test]
fn update_payload_from_json_honors_null_and_empty_lists() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = AccountService::try_new(&mut conn).unwrap();
    let profile = service
        .create_account(&AccountCreateRequest {
            address_info: vec![AddressInfoPatch {
                street: Some("1 Navy Way".to_string()),
                city: Some("Arlington".to_string()),
                state: Some("VA".to_string()),
            }],
            ..create_request("Grace", &["5550001"])
        })
        .unwrap();

    let request: AccountUpdateRequest = serde_json::from_value(serde_json::json!({
        "contact_info": null,
        "address_info": [],
    }))
    .unwrap();
    let result = service.update_account(profile.account.id, &request).unwrap();

    assert_eq!(result.contact_info, ReconcileOutcome::Untouched);
    assert_eq!(result.profile.contact_info.len(), 1);
    assert!(result.profile.address_info.is_empty());
}

#[test]
fn partial_address_update_keeps_untouched_columns() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = AccountService::try_new(&mut conn).unwrap();
    let profile = service
        .create_account(&AccountCreateRequest {
            address_info: vec![AddressInfoPatch {
                street: Some("1 Navy Way".to_string()),
                city: Some("Arlington".to_string()),
                state: Some("VA".to_string()),
            }],
            ..create_request("Grace", &[])
        })
        .unwrap();
    let address_id = profile.address_info[0].address.id;

    let request = AccountUpdateRequest {
        address_info: RelationPayload::Present(vec![ChildEntry::existing(
            address_id,
            AddressInfoPatch {
                city: Some("Annapolis".to_string()),
                ..AddressInfoPatch::default()
            },
        )]),
        ..AccountUpdateRequest::default()
    };
    let result = service.update_account(profile.account.id, &request).unwrap();

    assert_eq!(result.profile.address_info.len(), 1);
    let address = &result.profile.address_info[0];
    assert_eq!(address.address.id, address_id);
    assert_eq!(address.address.fields.street, "1 Navy Way");
    assert_eq!(address.address.fields.city, "Annapolis");
    assert_eq!(address.address.fields.state, "VA");
    assert_eq!(address.full_address, "1 Navy Way, Annapolis, VA");
}

#[test]
fn impossible_birthdate_is_rejected_on_create_and_on_merge() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = AccountService::try_new(&mut conn).unwrap();

    let err = service
        .create_account(&AccountCreateRequest {
            personal_info: vec![PersonalInfoPatch {
                birthdate: Some("2021-02-31".to_string()),
                gender: Some(Gender::Female),
            }],
            ..create_request("Grace", &[])
        })
        .unwrap_err();
    assert!(matches!(
        err,
        AccountServiceError::InvalidChild(ChildValidationError::InvalidBirthdate(_))
    ));

    let profile = service
        .create_account(&AccountCreateRequest {
            personal_info: vec![PersonalInfoPatch {
                birthdate: Some("1906-12-09".to_string()),
                gender: Some(Gender::Female),
            }],
            ..create_request("Grace", &[])
        })
        .unwrap();
    let personal_id = profile.personal_info[0].id;

    let request = AccountUpdateRequest {
        personal_info: RelationPayload::Present(vec![ChildEntry::existing(
            personal_id,
            PersonalInfoPatch {
                birthdate: Some("2023-04-31".to_string()),
                gender: None,
            },
        )]),
        ..AccountUpdateRequest::default()
    };
    let err = service
        .update_account(profile.account.id, &request)
        .unwrap_err();
    assert!(matches!(
        err,
        AccountServiceError::InvalidChild(ChildValidationError::InvalidBirthdate(_))
    ));

    let after = service
        .get_account_profile(profile.account.id)
        .unwrap()
        .unwrap();
    assert_eq!(after.personal_info[0].fields.birthdate, "1906-12-09");
}
