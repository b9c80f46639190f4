//! Balances derived from the stored ledger.

mod common;

use common::{Fund, setup};
use kitty_auth::ActorCredentials;
use kitty_core::error::KittyError;
use kitty_core::models::member::{Role, UpdateMember};
use kitty_core::models::money_move::{MoneyMoveKind, NewMoneyMove};
use kitty_core::models::product::CreateProduct;
use uuid::Uuid;

async fn confirmed(
    fund: &Fund,
    confirmer: &ActorCredentials,
    kind: MoneyMoveKind,
    member: Uuid,
    amount: i64,
) {
    let mv = fund
        .moves
        .create_by_operator(
            &fund.admin,
            NewMoneyMove {
                kind,
                member_id: member,
                amount,
                note: None,
            },
        )
        .await
        .unwrap();
    fund.moves.confirm(confirmer, mv.id).await.unwrap();
}

#[tokio::test]
async fn balance_combines_moves_and_consumptions() {
    let fund = setup().await;
    let treasurer = fund.add("t", Role::Treasurer, "2222").await;
    let ann = fund.add("ann", Role::Member, "1111").await;

    confirmed(&fund, &treasurer, MoneyMoveKind::Deposit, ann.actor_id, 2000).await;
    confirmed(&fund, &treasurer, MoneyMoveKind::Payout, ann.actor_id, 300).await;

    // Pending and rejected moves never count.
    let pending = fund
        .moves
        .create_by_self(
            &ann,
            NewMoneyMove {
                kind: MoneyMoveKind::Deposit,
                member_id: ann.actor_id,
                amount: 5000,
                note: None,
            },
        )
        .await
        .unwrap();
    let rejected = fund
        .moves
        .create_by_self(
            &ann,
            NewMoneyMove {
                kind: MoneyMoveKind::Deposit,
                member_id: ann.actor_id,
                amount: 7000,
                note: None,
            },
        )
        .await
        .unwrap();
    fund.moves.reject(&treasurer, rejected.id).await.unwrap();

    let beer = fund
        .products
        .create_product(
            &fund.admin,
            CreateProduct {
                name: "Beer".into(),
                price: 150,
            },
        )
        .await
        .unwrap();
    fund.consumptions
        .book(&ann, ann.actor_id, beer.id, 2)
        .await
        .unwrap();

    assert_eq!(fund.balances.balance(ann.actor_id).await.unwrap(), 1400);

    fund.moves.confirm(&treasurer, pending.id).await.unwrap();
    assert_eq!(fund.balances.balance(ann.actor_id).await.unwrap(), 6400);
}

#[tokio::test]
async fn unknown_member_has_no_balance() {
    let fund = setup().await;
    let err = fund.balances.balance(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, KittyError::NotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn all_balances_cover_active_members_by_name() {
    let fund = setup().await;
    let treasurer = fund.add("treasurer", Role::Treasurer, "2222").await;
    let zed = fund.add("zed", Role::Member, "1111").await;
    let bob = fund.add("bob", Role::Member, "1111").await;
    let idle = fund.add("idle", Role::Member, "1111").await;

    confirmed(&fund, &treasurer, MoneyMoveKind::Deposit, zed.actor_id, 1500).await;
    confirmed(&fund, &treasurer, MoneyMoveKind::Deposit, bob.actor_id, 999).await;

    fund.members
        .update_member(
            &fund.admin,
            idle.actor_id,
            UpdateMember {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let all = fund.balances.all_balances().await.unwrap();
    let names: Vec<&str> = all.iter().map(|b| b.display_name.as_str()).collect();
    assert_eq!(names, vec!["admin", "bob", "treasurer", "zed"]);
    let zed_row = all.iter().find(|b| b.member_id == zed.actor_id).unwrap();
    assert_eq!(zed_row.balance, 1500);

    // Default threshold is 1000: strictly below it is "low".
    let low: Vec<String> = fund
        .balances
        .below_threshold(None)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.display_name)
        .collect();
    assert_eq!(low, vec!["admin", "bob", "treasurer"]);

    let healthy: Vec<String> = fund
        .balances
        .at_or_above_threshold(Some(999))
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.display_name)
        .collect();
    assert_eq!(healthy, vec!["bob", "zed"]);
}
