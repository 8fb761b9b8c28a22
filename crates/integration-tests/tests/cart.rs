//! Cart pricing and persistence.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use zona_gamer_core::{AccountTier, Currency, ItemKind, Platform};
use zona_gamer_integration_tests::TestContext;

#[tokio::test]
async fn test_catalog_item_in_cart() {
    let ctx = TestContext::new();
    ctx.seed_item(ItemKind::Game, Platform::Ps5, "Fifa 25", 10)
        .await
        .unwrap();
    let mut item = ctx
        .state
        .catalog(ItemKind::Game)
        .load(Platform::Ps5, false)
        .await
        .unwrap()
        .first()
        .cloned()
        .unwrap();
    item.descuento = Some(Decimal::new(20, 0));

    let cart = ctx.state.cart();
    cart.add_to_cart(item.clone(), 1, Some(AccountTier::PrincipalPs5));
    cart.add_to_cart(item.clone(), 2, Some(AccountTier::PrincipalPs5));
    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.total_price(Currency::USD), Decimal::new(24, 0));

    cart.add_to_cart(item, 1, Some(AccountTier::SecundariaPs5));
    assert_eq!(cart.items().len(), 2);
    assert_eq!(cart.total_items(), 4);
}

#[tokio::test]
async fn test_cart_and_currency_survive_restart() {
    let ctx = TestContext::new();
    ctx.seed_item(ItemKind::Game, Platform::Ps4, "Gta V", 15)
        .await
        .unwrap();
    let item = ctx
        .state
        .catalog(ItemKind::Game)
        .load(Platform::Ps4, false)
        .await
        .unwrap()
        .first()
        .cloned()
        .unwrap();
    ctx.state
        .cart()
        .add_to_cart(item, 2, Some(AccountTier::PrincipalPs4));
    ctx.state.currency().change(Currency::COP);

    let restarted = TestContext::with_storage(ctx.storage.clone());

    assert_eq!(restarted.state.cart().item_quantity("gta_v"), 2);
    assert_eq!(restarted.state.currency().selected(), Currency::COP);
}
