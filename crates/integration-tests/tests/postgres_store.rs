//! `PgOrderStore` against a real database.
//!
//! These tests require a running `PostgreSQL` database whose URL is in
//! `TEST_DATABASE_URL`. Migrations are applied on connect.
//!
//! Run with: cargo test -p simply-orders-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use simply_orders_core::{Email, ExternalCustomerId, ExternalOrderId, ExternalProductId, OrderStatus};
use simply_orders_sync::db::{OrderStore, PgOrderStore};
use simply_orders_sync::models::{
    Address, ItemsSync, LoginProfile, NewOrderItem, NormalizedOrder, OrderUpsert, Tracking,
    UserUpsert,
};

static NEXT_ID: AtomicI64 = AtomicI64::new(0);

/// Platform ids unique to this test run, each leaving room for 10 siblings.
fn unique_id() -> i64 {
    Utc::now().timestamp_micros() * 1_000 + NEXT_ID.fetch_add(10, Ordering::SeqCst)
}

async fn store() -> PgOrderStore {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let pool = PgPool::connect(&url).await.unwrap();
    sqlx::migrate!("../sync/migrations").run(&pool).await.unwrap();
    PgOrderStore::new(pool)
}

fn order(external_id: i64, email: &str) -> OrderUpsert {
    OrderUpsert {
        external_order_id: ExternalOrderId::new(external_id),
        order_number: external_id.to_string(),
        customer_id: None,
        customer_email: email.to_owned(),
        status: OrderStatus::Processing,
        total: Decimal::new(25900, 2),
        currency: "AUD".to_owned(),
        date_created: Some(Utc.with_ymd_and_hms(2024, 5, 2, 0, 15, 0).unwrap()),
        shipping_address: Address::default(),
        billing_address: Address::default(),
        payment_method: Some("Credit Card".to_owned()),
        customer_note: None,
        tracking: Tracking::default(),
        is_historical: false,
    }
}

fn item(name: &str) -> NewOrderItem {
    NewOrderItem {
        external_product_id: ExternalProductId::new(88),
        product_name: name.to_owned(),
        sku: None,
        quantity: 2,
        unit_price: Decimal::new(12950, 2),
        total_price: Decimal::new(25900, 2),
        product_image: None,
    }
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_save_order_is_idempotent() {
    let store = store().await;
    let id = unique_id();
    let email = format!("pg-{id}@example.com");
    let normalized = NormalizedOrder {
        customer: None,
        order: order(id, &email),
        items: Some(vec![item("Outdoor 4K Camera")]),
    };

    let first = store.save_order(&normalized).await.unwrap();
    let second = store.save_order(&normalized).await.unwrap();

    assert_eq!(first.order.id, second.order.id);
    assert_eq!(second.items, ItemsSync::Replaced(1));

    let orders = store
        .orders_for_email(&Email::parse(&email).unwrap())
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].items.len(), 1);
    assert_eq!(orders[0].order.total, Decimal::new(25900, 2));
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_historical_flag_and_tracking_are_sticky() {
    let store = store().await;
    let id = unique_id();
    let email = format!("pg-{id}@example.com");

    let mut historical = order(id, &email);
    historical.is_historical = true;
    historical.tracking = Tracking {
        tracking_number: Some("RC998".to_owned()),
        carrier: Some("RegionalCourierX".to_owned()),
        tracking_url: Some("https://www.google.com/search?q=track+RegionalCourierX+RC998".to_owned()),
    };
    store.upsert_order(&historical).await.unwrap();

    let updated = store.upsert_order(&order(id, &email)).await.unwrap();

    assert!(updated.is_historical);
    assert_eq!(updated.tracking.tracking_number.as_deref(), Some("RC998"));
    assert!(
        store
            .has_historical_orders(&Email::parse(&email).unwrap())
            .await
            .unwrap()
    );
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_historical_batch_links_users() {
    let store = store().await;
    let id = unique_id();
    let email = format!("pg-{id}@example.com");
    let customer = UserUpsert {
        external_customer_id: ExternalCustomerId::from_platform(id),
        email: Email::parse(&email).unwrap(),
        first_name: Some("Alex".to_owned()),
        last_name: None,
        phone: None,
    };

    let batch: Vec<NormalizedOrder> = (0..3)
        .map(|n| {
            let mut upsert = order(id + n, &email);
            upsert.is_historical = true;
            NormalizedOrder {
                customer: Some(customer.clone()),
                order: upsert,
                items: Some(vec![item("Mount")]),
            }
        })
        .collect();

    let saved = store.save_historical_batch(&batch).await.unwrap();
    assert_eq!(saved.len(), 3);

    let user = store
        .find_user_by_email(&customer.email)
        .await
        .unwrap()
        .unwrap();
    let orders = store.orders_for_user(user.id).await.unwrap();
    assert_eq!(orders.len(), 3);
    assert!(orders.iter().all(|o| o.items.len() == 1));
}

fn customer(external_id: i64, email: &str) -> UserUpsert {
    UserUpsert {
        external_customer_id: ExternalCustomerId::from_platform(external_id),
        email: Email::parse(email).unwrap(),
        first_name: None,
        last_name: None,
        phone: None,
    }
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_email_match_keeps_existing_customer_id() {
    let store = store().await;
    let id = unique_id();
    let email = format!("pg-{id}@example.com");
    let existing = store.upsert_user(&customer(id, &email)).await.unwrap();

    let matched = store.upsert_user(&customer(id + 1, &email)).await.unwrap();

    assert_eq!(matched.id, existing.id);
    assert_eq!(matched.external_customer_id, existing.external_customer_id);
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_customer_conflict_only_drops_user_link() {
    let store = store().await;
    let id = unique_id();
    let shared = format!("pg-{id}-shared@example.com");
    store.upsert_user(&customer(id, &shared)).await.unwrap();
    store
        .upsert_user(&customer(id + 1, &format!("pg-{id}-mine@example.com")))
        .await
        .unwrap();

    let live = store
        .save_order(&NormalizedOrder {
            customer: Some(customer(id + 1, &shared)),
            order: order(id, &shared),
            items: None,
        })
        .await
        .unwrap();
    assert_eq!(live.order.customer_id, None);

    let mut historical = order(id + 2, &shared);
    historical.is_historical = true;
    let saved = store
        .save_historical_batch(&[NormalizedOrder {
            customer: Some(customer(id + 1, &shared)),
            order: historical,
            items: Some(vec![item("Mount")]),
        }])
        .await
        .unwrap();
    assert_eq!(saved[0].order.customer_id, None);
    assert_eq!(saved[0].items, ItemsSync::Replaced(1));
    assert!(
        store
            .has_historical_orders(&Email::parse(&shared).unwrap())
            .await
            .unwrap()
    );
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_record_login_upserts_by_email() {
    let store = store().await;
    let id = unique_id();
    let email = Email::parse(&format!("pg-{id}@example.com")).unwrap();
    let signup = LoginProfile {
        first_name: Some("Jo".to_owned()),
        ..LoginProfile::default()
    };

    let created = store.record_login(&email, &signup).await.unwrap();
    let again = store
        .record_login(&email, &LoginProfile::default())
        .await
        .unwrap();

    assert_eq!(created.id, again.id);
    assert_eq!(again.first_name.as_deref(), Some("Jo"));
    assert!(again.last_login.is_some());
}
