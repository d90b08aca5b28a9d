//! Checkout against a real database.
//!
//! Requires `DATABASE_URL`; each test gets its own migrated database.

#![allow(clippy::unwrap_used)]

use sqlx::PgPool;

use shop_core::{Money, OrderStatus, PaymentMethod, PaymentStatus, UserId};
use shop_integration_tests::seed;
use shop_storefront::db::OrderRepository;
use shop_storefront::services::checkout::{CheckoutError, OrderRequest, place_order};

fn request(payment_method: PaymentMethod) -> OrderRequest {
    OrderRequest {
        shipping_address: "12 MG Road, Bengaluru".to_string(),
        payment_method,
    }
}

fn money(s: &str) -> Money {
    s.parse().unwrap()
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_place_order_snapshots_prices_and_empties_cart(pool: PgPool) {
    let user = seed::user(&pool, "asha").await;
    let kettle = seed::product(&pool, "Kettle", "1299.00").await;
    let mug = seed::product(&pool, "Mug", "249.50").await;
    let cart = seed::cart(&pool, user, &[(kettle, 1), (mug, 2)]).await;

    let order = place_order(&pool, user, &request(PaymentMethod::CashOnDelivery))
        .await
        .unwrap();

    assert_eq!(order.total_amount, money("1798.00"));
    assert_eq!(order.order_status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.payment_method, PaymentMethod::CashOnDelivery);
    assert_eq!(order.shipping_address, "12 MG Road, Bengaluru");
    assert_eq!(order.items.len(), 2);

    let mug_line = order.items.iter().find(|i| i.product.id == mug).unwrap();
    assert_eq!(mug_line.quantity, 2);
    assert_eq!(mug_line.unit_price, money("249.50"));

    assert_eq!(seed::cart_lines(&pool, cart).await, 0);
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_later_price_change_leaves_order_untouched(pool: PgPool) {
    let user = seed::user(&pool, "bilal").await;
    let lamp = seed::product(&pool, "Lamp", "800.00").await;
    seed::cart(&pool, user, &[(lamp, 3)]).await;

    let order = place_order(&pool, user, &request(PaymentMethod::Stripe))
        .await
        .unwrap();

    seed::set_price(&pool, lamp, "950.00").await;

    let stored = OrderRepository::new(&pool)
        .get_for_user(user, order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.total_amount, money("2400.00"));
    assert_eq!(stored.items[0].unit_price, money("800.00"));
    assert_eq!(stored.items[0].product.price, money("950.00"));
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_empty_cart_is_rejected(pool: PgPool) {
    let user = seed::user(&pool, "chen").await;
    seed::cart(&pool, user, &[]).await;

    let err = place_order(&pool, user, &request(PaymentMethod::CashOnDelivery))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(seed::count(&pool, r#""order""#).await, 0);
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_missing_cart_is_rejected(pool: PgPool) {
    let user = seed::user(&pool, "dara").await;

    let err = place_order(&pool, user, &request(PaymentMethod::CashOnDelivery))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::NoCart));
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_oversized_total_writes_nothing(pool: PgPool) {
    let user = seed::user(&pool, "esha").await;
    let yacht = seed::product(&pool, "Yacht", "9999999999.99").await;
    let cart = seed::cart(&pool, user, &[(yacht, 2)]).await;

    let err = place_order(&pool, user, &request(PaymentMethod::Stripe))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::TotalTooLarge));
    assert_eq!(seed::count(&pool, r#""order""#).await, 0);
    assert_eq!(seed::cart_lines(&pool, cart).await, 1);
}

#[sqlx::test(migrations = "../storefront/migrations")]
async fn test_orders_are_scoped_to_their_user(pool: PgPool) {
    let owner = seed::user(&pool, "farah").await;
    let other: UserId = seed::user(&pool, "gopal").await;
    let pen = seed::product(&pool, "Pen", "20.00").await;
    seed::cart(&pool, owner, &[(pen, 1)]).await;

    let order = place_order(&pool, owner, &request(PaymentMethod::CashOnDelivery))
        .await
        .unwrap();

    let orders = OrderRepository::new(&pool);
    assert!(orders.get_for_user(other, order.id).await.unwrap().is_none());
    assert_eq!(orders.list_for_user(owner).await.unwrap().len(), 1);
}
