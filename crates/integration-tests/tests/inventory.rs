//! Item and account administration.

#![allow(clippy::unwrap_used)]

use zona_gamer_core::{ItemKind, Platform};
use zona_gamer_integration_tests::TestContext;

#[tokio::test]
async fn test_delete_item_removes_accounts_and_parent() {
    let ctx = TestContext::new();
    let id = ctx
        .seed_item(ItemKind::Combo, Platform::Ps5, "Assassin's Creed!", 30)
        .await
        .unwrap();
    assert_eq!(id.as_str(), "assassins_creed_combo");

    for email in ["a@zonagamer.com", "b@zonagamer.com", "c@zonagamer.com"] {
        ctx.seed_account(ItemKind::Combo, Platform::Ps5, &id, email, &["1", "2"], Vec::new())
            .await
            .unwrap();
    }
    assert_eq!(ctx.store.len(), 4);

    ctx.state
        .inventory(ItemKind::Combo)
        .delete_item(Platform::Ps5, &id)
        .await
        .unwrap();

    assert!(ctx.store.is_empty());
    assert!(ctx
        .state
        .catalog(ItemKind::Combo)
        .load(Platform::Ps5, true)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_account_counts_reach_catalog() {
    let ctx = TestContext::new();
    let id = ctx
        .seed_item(ItemKind::Game, Platform::Ps4, "Fifa 25", 20)
        .await
        .unwrap();
    ctx.seed_account(ItemKind::Game, Platform::Ps4, &id, "a@zonagamer.com", &[], Vec::new())
        .await
        .unwrap();
    ctx.seed_account(ItemKind::Game, Platform::Ps4, &id, "b@zonagamer.com", &[], Vec::new())
        .await
        .unwrap();

    let items = ctx
        .state
        .catalog(ItemKind::Game)
        .load(Platform::Ps4, false)
        .await
        .unwrap();
    let item = items.first().unwrap();

    assert_eq!(item.total_correos, 2);
    assert_eq!(item.correos, vec!["a@zonagamer.com", "b@zonagamer.com"]);
}
