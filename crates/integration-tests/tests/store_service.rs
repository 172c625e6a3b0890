//! Store and inventory semantics end to end.

use domains::{DomainError, EventType, ItemType};
use integration_tests::{harness, seed_catalog};
use uuid::Uuid;

#[tokio::test]
async fn purchase_debits_and_repurchase_is_rejected() {
    let h = harness().await;
    seed_catalog(&*h.kv).await;
    let user = Uuid::new_v4();
    h.ledger.credit(user, 100, EventType::Bonus, Some("bonus"), None).await.unwrap();

    let receipt = h.storefront.purchase(user, "halo_cinder").await.unwrap();
    assert_eq!(receipt.balance, 40);
    assert_eq!(receipt.inventory, vec!["halo_cinder".to_string()]);

    let err = h.storefront.purchase(user, "halo_cinder").await.unwrap_err();
    assert!(matches!(err, DomainError::AlreadyOwned(_)));
    assert_eq!(h.ledger.balance(user).await.unwrap(), 40);

    // The charge shows up in the audit trail as a purchase event.
    let events = h.ledger.history(user).await.unwrap();
    let purchase = events.last().unwrap();
    assert_eq!(purchase.event_type, EventType::Purchase);
    assert_eq!(purchase.delta, -60);
    assert_eq!(purchase.balance_after, 40);
}

#[tokio::test]
async fn purchase_without_funds_changes_nothing() {
    let h = harness().await;
    seed_catalog(&*h.kv).await;
    let user = Uuid::new_v4();
    h.ledger.credit(user, 10, EventType::Bonus, None, None).await.unwrap();

    let err = h.storefront.purchase(user, "halo_cinder").await.unwrap_err();
    assert!(matches!(err, DomainError::InsufficientFunds(60)));
    assert_eq!(h.ledger.balance(user).await.unwrap(), 10);
    let account = h.accounts.load_account(user, None).await.unwrap();
    assert!(account.inventory.is_empty());
}

#[tokio::test]
async fn equip_and_unequip_drive_the_decoration_slots() {
    let h = harness().await;
    seed_catalog(&*h.kv).await;
    let user = Uuid::new_v4();
    h.ledger.credit(user, 200, EventType::Bonus, None, None).await.unwrap();
    h.storefront.purchase(user, "halo_cinder").await.unwrap();
    h.storefront.purchase(user, "trail_embers").await.unwrap();

    let outcome = h.storefront.equip(user, "halo_cinder").await.unwrap();
    assert_eq!(outcome.slot, ItemType::AvatarDecoration);
    let outcome = h.storefront.equip(user, "trail_embers").await.unwrap();
    assert_eq!(outcome.slot, ItemType::MessageDecoration);

    let account = h.accounts.load_account(user, None).await.unwrap();
    assert_eq!(account.avatar_decoration.as_deref(), Some("halo-cinder"));
    assert_eq!(account.message_decoration.as_deref(), Some("trail-embers"));

    h.storefront.equip(user, "unequip-avatar").await.unwrap();
    let account = h.accounts.load_account(user, None).await.unwrap();
    assert!(account.avatar_decoration.is_none());
    assert_eq!(account.message_decoration.as_deref(), Some("trail-embers"));
}

#[tokio::test]
async fn redeem_charges_and_logs_a_redeem_event() {
    let h = harness().await;
    seed_catalog(&*h.kv).await;
    let user = Uuid::new_v4();
    h.ledger.credit(user, 150, EventType::Bonus, None, None).await.unwrap();

    let receipt = h.storefront.redeem(user, "tts_message").await.unwrap();
    assert_eq!(receipt.balance, 50);

    let events = h.ledger.history(user).await.unwrap();
    let redeem = events.last().unwrap();
    assert_eq!(redeem.event_type, EventType::Redeem);
    assert_eq!(redeem.delta, -100);
}

#[tokio::test]
async fn unknown_items_fail_before_any_money_moves() {
    let h = harness().await;
    seed_catalog(&*h.kv).await;
    let user = Uuid::new_v4();
    h.ledger.credit(user, 1_000, EventType::Bonus, None, None).await.unwrap();

    assert!(matches!(
        h.storefront.purchase(user, "ghost_item").await.unwrap_err(),
        DomainError::NotFound("store item", _)
    ));
    assert!(matches!(
        h.storefront.redeem(user, "ghost_redeem").await.unwrap_err(),
        DomainError::NotFound("redeem", _)
    ));
    assert_eq!(h.ledger.balance(user).await.unwrap(), 1_000);
}
