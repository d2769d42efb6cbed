//! Shared fixtures for the database-backed tests
#![allow(dead_code)]

use std::str::FromStr;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{UserRole, WalletOwner};
use sqlx::PgPool;
use uuid::Uuid;

use agro_market_backend::services::WalletService;

pub const LOCK_TIMEOUT_MS: u64 = 5000;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn tomorrow() -> NaiveDate {
    (Utc::now() + Duration::days(1)).date_naive()
}

pub async fn insert_user(pool: &PgPool, role: UserRole, name: &str) -> Uuid {
    sqlx::query_scalar("INSERT INTO users (role, display_name) VALUES ($1, $2) RETURNING id")
        .bind(role)
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Farmer profile with an open wallet; returns `(user_id, farmer_id)`
pub async fn insert_farmer(pool: &PgPool, farm_name: &str) -> (Uuid, Uuid) {
    let user_id = insert_user(pool, UserRole::Farmer, farm_name).await;
    let farmer_id: Uuid =
        sqlx::query_scalar("INSERT INTO farmers (user_id, farm_name) VALUES ($1, $2) RETURNING id")
            .bind(user_id)
            .bind(farm_name)
            .fetch_one(pool)
            .await
            .unwrap();
    WalletService::new(pool.clone())
        .open_wallet(WalletOwner::Farmer(farmer_id))
        .await
        .unwrap();
    (user_id, farmer_id)
}

/// Vendor profile with an open wallet; returns `(user_id, vendor_id)`
pub async fn insert_vendor(pool: &PgPool, shop_name: &str) -> (Uuid, Uuid) {
    let user_id = insert_user(pool, UserRole::Vendor, shop_name).await;
    let vendor_id: Uuid =
        sqlx::query_scalar("INSERT INTO vendors (user_id, shop_name) VALUES ($1, $2) RETURNING id")
            .bind(user_id)
            .bind(shop_name)
            .fetch_one(pool)
            .await
            .unwrap();
    WalletService::new(pool.clone())
        .open_wallet(WalletOwner::Vendor(vendor_id))
        .await
        .unwrap();
    (user_id, vendor_id)
}

pub async fn insert_stock_lot(
    pool: &PgPool,
    farmer_id: Uuid,
    quantity: Decimal,
    base_price: Decimal,
    expiry_date: NaiveDate,
) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO stock_lots (farmer_id, name, total_quantity, available_quantity, base_price, expiry_date)
        VALUES ($1, 'Tomatoes', $2, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(farmer_id)
    .bind(quantity)
    .bind(base_price)
    .bind(expiry_date)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn set_commission(pool: &PgPool, rate_percent: Decimal) {
    sqlx::query(
        r#"
        INSERT INTO commission_config (singleton, rate_percent) VALUES (TRUE, $1)
        ON CONFLICT (singleton) DO UPDATE SET rate_percent = EXCLUDED.rate_percent
        "#,
    )
    .bind(rate_percent)
    .execute(pool)
    .await
    .unwrap();
}

/// Pending, unpaid order with one line per `(reservation_id, quantity, unit_price)`
pub async fn insert_order(
    pool: &PgPool,
    customer_id: Uuid,
    lines: &[(Uuid, Decimal, Decimal)],
) -> Uuid {
    let order_id: Uuid = sqlx::query_scalar(
        "INSERT INTO orders (order_number, customer_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(format!("ORD-{}", &Uuid::new_v4().simple().to_string()[..8]))
    .bind(customer_id)
    .fetch_one(pool)
    .await
    .unwrap();

    for (reservation_id, quantity, unit_price) in lines {
        sqlx::query(
            "INSERT INTO order_lines (order_id, reservation_id, quantity, unit_price) VALUES ($1, $2, $3, $4)",
        )
        .bind(order_id)
        .bind(reservation_id)
        .bind(quantity)
        .bind(unit_price)
        .execute(pool)
        .await
        .unwrap();
    }
    order_id
}

/// Mark an order delivered and paid without going through the lifecycle service
pub async fn force_delivered_and_paid(pool: &PgPool, order_id: Uuid) {
    sqlx::query(
        "UPDATE orders SET status = 'delivered', payment_status = 'paid', delivered_at = NOW() WHERE id = $1",
    )
    .bind(order_id)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn balance(pool: &PgPool, owner: WalletOwner) -> Decimal {
    WalletService::new(pool.clone())
        .get_wallet(owner)
        .await
        .unwrap()
        .balance
}
