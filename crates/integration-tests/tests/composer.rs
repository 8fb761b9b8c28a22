//! Message generation end to end: codes consumed, report recorded.

#![allow(clippy::unwrap_used)]

use zona_gamer_core::{ItemId, ItemKind, MessagePlatform, Platform, UserRole};
use zona_gamer_integration_tests::TestContext;
use zona_gamer_storefront::models::{AppUser, CustomerInfo, ReportFilters};
use zona_gamer_storefront::services::whatsapp::MessageRequest;

async fn request(ctx: &TestContext, id: &ItemId, email: &str) -> MessageRequest {
    let account = ctx
        .state
        .inventory(ItemKind::Game)
        .get_account(Platform::Ps5, id, email)
        .await
        .unwrap()
        .unwrap();
    MessageRequest {
        kind: ItemKind::Game,
        platform: Platform::Ps5,
        item_id: id.clone(),
        item_name: "Gran Turismo 7".into(),
        account,
        version: None,
        cliente: CustomerInfo {
            cliente_nombre: Some("María".into()),
            cliente_telefono: Some("0991234567".into()),
            tipo_cuenta: None,
        },
    }
}

async fn signed_in_admin(ctx: &TestContext) -> AppUser {
    let user = ctx
        .state
        .auth()
        .sign_in("admin@zonagamer.com", "secreto123")
        .await
        .unwrap();
    ctx.state
        .roles()
        .create_user_with_role(
            &user.uid,
            "admin@zonagamer.com",
            UserRole::Admin,
            &user.uid,
            Some("Admin"),
        )
        .await
        .unwrap();
    ctx.state.roles().load(Some(&user)).await.unwrap()
}

#[tokio::test]
async fn test_generation_consumes_codes_and_logs_report() {
    let ctx = TestContext::new();
    let actor = signed_in_admin(&ctx).await;
    let id = ctx
        .seed_item(ItemKind::Game, Platform::Ps5, "Gran Turismo 7", 30)
        .await
        .unwrap();
    ctx.seed_account(
        ItemKind::Game,
        Platform::Ps5,
        &id,
        "gt7@zonagamer.com",
        &["1001", "1002", "1003", "1004"],
        Vec::new(),
    )
    .await
    .unwrap();

    let message = ctx
        .state
        .composer()
        .generate_and_consume(request(&ctx, &id, "gt7@zonagamer.com").await, &actor)
        .await
        .unwrap();
    assert_eq!(message.version, MessagePlatform::Ps5);
    assert!(message.mensaje_completo.contains("CODIGO DE Verificacion: 1001"));

    let left = request(&ctx, &id, "gt7@zonagamer.com").await.account;
    assert_eq!(left.codigos_generados, vec!["1003", "1004"]);

    ctx.state.tasks().wait_idle().await;
    ctx.state
        .reports()
        .list(&ReportFilters::default(), None)
        .await
        .unwrap();
    let stats = ctx.state.reports().stats();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.por_plataforma.get("PS5"), Some(&1));

    let report = ctx.state.reports().reports().first().cloned().unwrap();
    assert_eq!(report.cliente_nombre.as_deref(), Some("María"));
    assert_eq!(report.correo_utilizado, "gt7@zonagamer.com");
}

#[tokio::test]
async fn test_one_code_left_refuses() {
    let ctx = TestContext::new();
    let actor = signed_in_admin(&ctx).await;
    let id = ctx
        .seed_item(ItemKind::Game, Platform::Ps5, "Gran Turismo 7", 30)
        .await
        .unwrap();
    ctx.seed_account(
        ItemKind::Game,
        Platform::Ps5,
        &id,
        "gt7@zonagamer.com",
        &["1001"],
        Vec::new(),
    )
    .await
    .unwrap();

    let message = ctx
        .state
        .composer()
        .generate_and_consume(request(&ctx, &id, "gt7@zonagamer.com").await, &actor)
        .await;

    assert!(message.is_none());
    assert!(ctx.state.composer().error().is_some());
    let left = request(&ctx, &id, "gt7@zonagamer.com").await.account;
    assert_eq!(left.codigos_generados, vec!["1001"]);
    assert_eq!(ctx.state.tasks().pending(), 0);
}
