//! Stripe webhook events applied to stored orders.
//!
//! Requires `DATABASE_URL`; each test gets its own migrated database.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;

use sqlx::PgPool;

use shop_core::{OrderId, PaymentMethod, PaymentStatus, UserId};
use shop_integration_tests::seed;
use shop_storefront::db::OrderRepository;
use shop_storefront::db::orders::PaymentUpdate;
use shop_storefront::models::Order;
use shop_storefront::services::checkout::{OrderRequest, place_order};
use shop_storefront::services::payments::apply_webhook_event;
use shop_storefront::stripe::{PaymentIntent, WebhookEvent};

/// A card order for 1299.00 owned by a fresh user.
async fn card_order(pool: &PgPool) -> (UserId, OrderId) {
    let user = seed::user(pool, "meera").await;
    let kettle = seed::product(pool, "Kettle", "1299.00").await;
    seed::cart(pool, user, &[(kettle, 1)]).await;

    let order = place_order(
        pool,
        user,
        &OrderRequest {
            shipping_address: "4 Park Street, Kolkata".to_string(),
            payment_method: PaymentMethod::Stripe,
        },
    )
    .await
    .unwrap();

    (user, order.id)
}

fn intent(id: &str, order_id: OrderId, amount: i64) -> PaymentIntent {
    PaymentIntent {
        id: id.to_string(),
        amount: Some(amount),
        client_secret: None,
        status: None,
        metadata: HashMap::from([("order_id".to_string(), order_id.to_string())]),
    }
}

async fn reload(pool: &PgPool, user: UserId, order_id: OrderId) -> Order {
    OrderRepository::new(pool)
        .get_for_user(user, order_id)
        .await
        .unwrap()
        .unwrap()
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_success_marks_paid_and_replay_is_idempotent(pool: PgPool) {
    let (user, order_id) = card_order(&pool).await;
    OrderRepository::new(&pool)
        .set_payment_intent(order_id, "pi_1")
        .await
        .unwrap();

    let event = WebhookEvent::PaymentSucceeded(intent("pi_1", order_id, 129_900));
    let first = apply_webhook_event(&pool, &event).await.unwrap();
    let replay = apply_webhook_event(&pool, &event).await.unwrap();

    assert_eq!(first, Some(PaymentUpdate::Applied));
    assert_eq!(replay, Some(PaymentUpdate::Unchanged));

    let order = reload(&pool, user, order_id).await;
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.stripe_payment_intent.as_deref(), Some("pi_1"));
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_failure_never_overwrites_paid(pool: PgPool) {
    let (user, order_id) = card_order(&pool).await;
    OrderRepository::new(&pool)
        .set_payment_intent(order_id, "pi_1")
        .await
        .unwrap();

    let paid = WebhookEvent::PaymentSucceeded(intent("pi_1", order_id, 129_900));
    apply_webhook_event(&pool, &paid).await.unwrap();

    let failed = WebhookEvent::PaymentFailed(intent("pi_1", order_id, 129_900));
    let update = apply_webhook_event(&pool, &failed).await.unwrap();

    assert_eq!(update, Some(PaymentUpdate::Unchanged));
    assert_eq!(reload(&pool, user, order_id).await.payment_status, PaymentStatus::Paid);
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_failure_of_stored_intent_marks_failed(pool: PgPool) {
    let (user, order_id) = card_order(&pool).await;
    OrderRepository::new(&pool)
        .set_payment_intent(order_id, "pi_1")
        .await
        .unwrap();

    let failed = WebhookEvent::PaymentFailed(intent("pi_1", order_id, 129_900));
    let update = apply_webhook_event(&pool, &failed).await.unwrap();

    assert_eq!(update, Some(PaymentUpdate::Applied));
    assert_eq!(reload(&pool, user, order_id).await.payment_status, PaymentStatus::Failed);
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_unknown_order_is_a_no_op(pool: PgPool) {
    let (user, order_id) = card_order(&pool).await;
    let missing = OrderId::new(order_id.as_i32() + 1000);

    let event = WebhookEvent::PaymentSucceeded(intent("pi_9", missing, 129_900));
    let update = apply_webhook_event(&pool, &event).await.unwrap();

    assert_eq!(update, Some(PaymentUpdate::NotFound));
    assert_eq!(reload(&pool, user, order_id).await.payment_status, PaymentStatus::Pending);
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_events_without_an_order_are_ignored(pool: PgPool) {
    let (user, order_id) = card_order(&pool).await;

    let mut orphan = intent("pi_1", order_id, 129_900);
    orphan.metadata.clear();
    let untracked = WebhookEvent::Other("charge.refunded".to_string());

    let orphan_update = apply_webhook_event(&pool, &WebhookEvent::PaymentSucceeded(orphan))
        .await
        .unwrap();
    let untracked_update = apply_webhook_event(&pool, &untracked).await.unwrap();

    assert_eq!(orphan_update, None);
    assert_eq!(untracked_update, None);
    assert_eq!(reload(&pool, user, order_id).await.payment_status, PaymentStatus::Pending);
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_earlier_intent_paying_the_total_marks_paid(pool: PgPool) {
    let (user, order_id) = card_order(&pool).await;
    let orders = OrderRepository::new(&pool);
    orders.set_payment_intent(order_id, "pi_1").await.unwrap();
    orders.set_payment_intent(order_id, "pi_2").await.unwrap();

    let first = WebhookEvent::PaymentSucceeded(intent("pi_1", order_id, 129_900));
    assert_eq!(
        apply_webhook_event(&pool, &first).await.unwrap(),
        Some(PaymentUpdate::Applied)
    );

    let order = reload(&pool, user, order_id).await;
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.stripe_payment_intent.as_deref(), Some("pi_1"));

    let second = WebhookEvent::PaymentSucceeded(intent("pi_2", order_id, 129_900));
    assert_eq!(
        apply_webhook_event(&pool, &second).await.unwrap(),
        Some(PaymentUpdate::Unchanged)
    );
    assert_eq!(
        reload(&pool, user, order_id).await.stripe_payment_intent.as_deref(),
        Some("pi_1")
    );
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_stale_intent_for_another_amount_is_ignored(pool: PgPool) {
    let (user, order_id) = card_order(&pool).await;
    OrderRepository::new(&pool)
        .set_payment_intent(order_id, "pi_2")
        .await
        .unwrap();

    let stale = WebhookEvent::PaymentSucceeded(intent("pi_1", order_id, 50_000));
    let update = apply_webhook_event(&pool, &stale).await.unwrap();

    assert_eq!(update, Some(PaymentUpdate::Unchanged));
    let order = reload(&pool, user, order_id).await;
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.stripe_payment_intent.as_deref(), Some("pi_2"));
}
