//! Member administration and removal scenarios.

mod common;

use common::{ADMIN_PIN, setup};
use kitty_auth::ActorCredentials;
use kitty_core::error::KittyError;
use kitty_core::models::audit::AuditAction;
use kitty_core::models::member::{
    CreateMember, RelatedRecordCategory, RelatedRecords, Role, UpdateMember,
};
use kitty_core::models::money_move::{MoneyMoveKind, NewMoneyMove};
use kitty_core::models::product::CreateProduct;
use kitty_core::repository::Pagination;
use kitty_fund::RemovalOutcome;

#[tokio::test]
async fn member_with_history_needs_force_and_is_deactivated() {
    let fund = setup().await;
    let member = fund.add("bea", Role::Member, "1111").await;

    let coffee = fund
        .products
        .create_product(
            &fund.admin,
            CreateProduct {
                name: "Coffee".into(),
                price: 80,
            },
        )
        .await
        .unwrap();
    for _ in 0..3 {
        fund.consumptions
            .book(&fund.admin, member.actor_id, coffee.id, 1)
            .await
            .unwrap();
    }
    fund.moves
        .create_by_operator(
            &fund.admin,
            NewMoneyMove {
                kind: MoneyMoveKind::Deposit,
                member_id: member.actor_id,
                amount: 1000,
                note: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(
        fund.lifecycle.inspect(member.actor_id).await.unwrap(),
        RelatedRecords {
            consumptions: 3,
            money_moves: 1,
            audit_entries: 0,
        }
    );

    let err = fund
        .lifecycle
        .remove_member(&fund.admin, member.actor_id, false)
        .await
        .unwrap_err();
    match err {
        KittyError::RelatedRecordsConflict { categories } => assert_eq!(
            categories,
            vec![
                RelatedRecordCategory::Consumptions,
                RelatedRecordCategory::MoneyMoves
            ]
        ),
        other => panic!("expected RelatedRecordsConflict, got {other:?}"),
    }
    assert!(fund.members.get(member.actor_id).await.unwrap().is_active);

    let outcome = fund
        .lifecycle
        .remove_member(&fund.admin, member.actor_id, true)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RemovalOutcome::Deactivated {
            related: vec![
                RelatedRecordCategory::Consumptions,
                RelatedRecordCategory::MoneyMoves
            ]
        }
    );

    let stored = fund.members.get(member.actor_id).await.unwrap();
    assert!(!stored.is_active);
    assert!(stored.removed_at.is_some());

    let active = fund.members.list(true, Pagination::default()).await.unwrap();
    assert!(active.items.iter().all(|m| m.id != member.actor_id));
    let everyone = fund.members.list(false, Pagination::default()).await.unwrap();
    assert!(everyone.items.iter().any(|m| m.id == member.actor_id));

    assert_eq!(fund.audit_count(member.actor_id, AuditAction::Deactivate).await, 1);

    // History stays intact.
    assert_eq!(
        fund.consumptions
            .recent_for_member(member.actor_id, 10)
            .await
            .unwrap()
            .len(),
        3
    );

    // A second forced removal of the inactive member changes nothing.
    fund.lifecycle
        .remove_member(&fund.admin, member.actor_id, true)
        .await
        .unwrap();
    assert_eq!(fund.audit_count(member.actor_id, AuditAction::Deactivate).await, 1);
}

#[tokio::test]
async fn member_without_history_is_deleted() {
    let fund = setup().await;
    let member = fund.add("fresh", Role::Member, "1111").await;

    let outcome = fund
        .lifecycle
        .remove_member(&fund.admin, member.actor_id, false)
        .await
        .unwrap();
    assert_eq!(outcome, RemovalOutcome::Removed);

    let err = fund.members.get(member.actor_id).await.unwrap_err();
    assert!(matches!(err, KittyError::NotFound { .. }), "got {err:?}");

    let deletes = fund.audit_for(member.actor_id).await;
    let delete = deletes
        .iter()
        .find(|e| e.action == AuditAction::Delete)
        .expect("delete entry");
    assert_eq!(delete.actor_id, fund.admin.actor_id);
    assert_eq!(delete.metadata["display_name"], "fresh");
    assert_eq!(delete.metadata["hard_delete"], true);
}

#[tokio::test]
async fn member_who_only_acted_counts_as_having_history() {
    let fund = setup().await;
    let member = fund.add("pin-changer", Role::Member, "1111").await;
    fund.members.change_own_pin(&member, "2222").await.unwrap();

    let err = fund
        .lifecycle
        .remove_member(&fund.admin, member.actor_id, false)
        .await
        .unwrap_err();
    match err {
        KittyError::RelatedRecordsConflict { categories } => {
            assert_eq!(categories, vec![RelatedRecordCategory::AuditEntries])
        }
        other => panic!("expected RelatedRecordsConflict, got {other:?}"),
    }
}

#[tokio::test]
async fn last_administrator_is_protected() {
    let fund = setup().await;

    for force in [false, true] {
        let err = fund
            .lifecycle
            .remove_member(&fund.admin, fund.admin.actor_id, force)
            .await
            .unwrap_err();
        assert!(
            matches!(err, KittyError::LastAdministratorProtection),
            "force={force}: got {err:?}"
        );
    }
    assert!(fund.members.get(fund.admin.actor_id).await.unwrap().is_active);

    // With a second administrator the first may go.
    let second = fund.add("root2", Role::Administrator, "5555").await;
    let outcome = fund
        .lifecycle
        .remove_member(&second, fund.admin.actor_id, true)
        .await
        .unwrap();
    assert!(matches!(outcome, RemovalOutcome::Deactivated { .. }));

    let err = fund
        .lifecycle
        .remove_member(&second, second.actor_id, true)
        .await
        .unwrap_err();
    assert!(matches!(err, KittyError::LastAdministratorProtection));
}

#[tokio::test]
async fn only_administrators_remove_members() {
    let fund = setup().await;
    let treasurer = fund.add("t", Role::Treasurer, "2222").await;
    let member = fund.add("m", Role::Member, "1111").await;

    let err = fund
        .lifecycle
        .remove_member(&treasurer, member.actor_id, false)
        .await
        .unwrap_err();
    assert!(matches!(err, KittyError::RoleNotPermitted { .. }), "got {err:?}");
    assert!(fund.members.get(member.actor_id).await.is_ok());
}

#[tokio::test]
async fn force_removed_member_cannot_be_reactivated() {
    let fund = setup().await;
    let member = fund.add("gone", Role::Member, "1111").await;
    fund.members.change_own_pin(&member, "3333").await.unwrap();
    fund.lifecycle
        .remove_member(&fund.admin, member.actor_id, true)
        .await
        .unwrap();

    let err = fund
        .members
        .update_member(
            &fund.admin,
            member.actor_id,
            UpdateMember {
                is_active: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, KittyError::Validation { .. }), "got {err:?}");

    let err = fund
        .members
        .change_own_pin(&ActorCredentials::new(member.actor_id, "3333"), "4444")
        .await
        .unwrap_err();
    assert!(matches!(err, KittyError::ActorInactive), "got {err:?}");
}

#[tokio::test]
async fn plain_deactivation_can_be_undone() {
    let fund = setup().await;
    let member = fund.add("pause", Role::Member, "1111").await;
    let off = UpdateMember {
        is_active: Some(false),
        ..Default::default()
    };
    let on = UpdateMember {
        is_active: Some(true),
        ..Default::default()
    };
    fund.members
        .update_member(&fund.admin, member.actor_id, off)
        .await
        .unwrap();
    let back = fund
        .members
        .update_member(&fund.admin, member.actor_id, on)
        .await
        .unwrap();
    assert!(back.is_active);
    assert_eq!(fund.audit_count(member.actor_id, AuditAction::Update).await, 2);
}

#[tokio::test]
async fn last_administrator_cannot_be_demoted_or_deactivated() {
    let fund = setup().await;
    for input in [
        UpdateMember {
            role: Some(Role::Treasurer),
            ..Default::default()
        },
        UpdateMember {
            is_active: Some(false),
            ..Default::default()
        },
    ] {
        let err = fund
            .members
            .update_member(&fund.admin, fund.admin.actor_id, input)
            .await
            .unwrap_err();
        assert!(matches!(err, KittyError::LastAdministratorProtection), "got {err:?}");
    }

    let renamed = fund
        .members
        .update_member(
            &fund.admin,
            fund.admin.actor_id,
            UpdateMember {
                display_name: Some("  chief ".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.display_name, "chief");
    assert_eq!(renamed.role, Role::Administrator);
}

#[tokio::test]
async fn display_names_are_unique() {
    let fund = setup().await;
    fund.add("kim", Role::Member, "1111").await;

    let err = fund
        .members
        .create_member(
            &fund.admin,
            CreateMember {
                display_name: " kim ".into(),
                role: Role::Treasurer,
                pin: "2222".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, KittyError::AlreadyExists { .. }), "got {err:?}");

    let found = fund.members.get_by_display_name("kim").await.unwrap();
    assert_eq!(found.role, Role::Member);
}

#[tokio::test]
async fn bootstrap_is_refused_once_an_administrator_exists() {
    let fund = setup().await;
    let err = fund
        .members
        .bootstrap_administrator("usurper", "9999")
        .await
        .unwrap_err();
    assert!(matches!(err, KittyError::Validation { .. }), "got {err:?}");
}

#[tokio::test]
async fn pins_can_be_reset_changed_and_recovered() {
    let fund = setup().await;
    let member = fund.add("pat", Role::Member, "1111").await;

    fund.members
        .set_pin(&fund.admin, member.actor_id, "2222")
        .await
        .unwrap();
    assert!(!fund.members.check_pin(member.actor_id, "1111").await.unwrap());
    assert!(fund.members.check_pin(member.actor_id, "2222").await.unwrap());

    let current = ActorCredentials::new(member.actor_id, "2222");
    fund.members.change_own_pin(&current, "3333").await.unwrap();
    assert!(fund.members.check_pin(member.actor_id, "3333").await.unwrap());

    let err = fund
        .members
        .change_own_pin(&current, "4444")
        .await
        .unwrap_err();
    assert!(matches!(err, KittyError::SecretMismatch), "got {err:?}");

    let err = fund
        .members
        .set_pin(&fund.admin, member.actor_id, "12")
        .await
        .unwrap_err();
    assert!(matches!(err, KittyError::Validation { .. }), "got {err:?}");

    fund.members
        .recover_pin(fund.admin.actor_id, "7777")
        .await
        .unwrap();
    assert!(!fund.members.check_pin(fund.admin.actor_id, ADMIN_PIN).await.unwrap());

    assert_eq!(fund.audit_count(member.actor_id, AuditAction::SetPin).await, 1);
    assert_eq!(fund.audit_count(member.actor_id, AuditAction::ChangePin).await, 1);
    assert_eq!(fund.audit_count(fund.admin.actor_id, AuditAction::SetPin).await, 1);
}
