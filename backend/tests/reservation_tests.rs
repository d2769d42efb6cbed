//! Inventory reservation tests
//!
//! - Stock lots are never oversold, sequentially or concurrently
//! - Failed selections leave the lot unchanged
//! - Quantities finer than two decimal places are refused
//! - Notification or audit failures never undo a committed reservation
//! - Delivery progression and customer visibility

mod common;

use chrono::{Duration, NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{DomainError, Reservation, StockLot, StockStatus};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use common::dec;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn lot(available: &str, base_price: &str) -> StockLot {
    let now = Utc::now();
    StockLot {
        id: Uuid::new_v4(),
        farmer_id: Uuid::new_v4(),
        name: "Carrots".to_string(),
        total_quantity: dec(available),
        available_quantity: dec(available),
        base_price: dec(base_price),
        status: StockStatus::Pending,
        expiry_date: today() + Duration::days(7),
        created_at: now,
        updated_at: now,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// 100kg lot: 40kg, then 60kg, then 1kg
    #[test]
    fn test_lot_drains_to_selected() {
        let mut lot = lot("100", "10");

        lot.reserve(dec("40"), dec("12"), today()).unwrap();
        assert_eq!(lot.available_quantity, dec("60"));
        assert_eq!(lot.status, StockStatus::Pending);

        lot.reserve(dec("60"), dec("12"), today()).unwrap();
        assert_eq!(lot.available_quantity, Decimal::ZERO);
        assert_eq!(lot.status, StockStatus::Selected);

        let err = lot.reserve(dec("1"), dec("12"), today()).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                requested: dec("1"),
                available: Decimal::ZERO,
            }
        );
    }

    #[test]
    fn test_resale_below_base_price() {
        let mut lot = lot("10", "20");
        let err = lot.reserve(dec("5"), dec("19.99"), today()).unwrap_err();
        assert!(matches!(err, DomainError::ResaleBelowCost { .. }));
        assert_eq!(lot.available_quantity, dec("10"));
    }

    #[test]
    fn test_expired_lot_is_unavailable() {
        let mut lot = lot("10", "5");
        lot.expiry_date = today() - Duration::days(1);
        assert!(!lot.is_available(today()));
        assert!(matches!(
            lot.reserve(dec("1"), dec("6"), today()),
            Err(DomainError::StockUnavailable(_))
        ));
    }

    #[test]
    fn test_reservation_visibility_follows_delivery() {
        let mut reservation =
            Reservation::new(Uuid::new_v4(), Uuid::new_v4(), dec("5"), dec("15"), Utc::now());
        assert!(!reservation.is_visible_to_customers);

        assert!(reservation
            .advance_delivery(StockStatus::Delivered, Utc::now())
            .is_err());

        reservation
            .advance_delivery(StockStatus::InTransit, Utc::now())
            .unwrap();
        assert!(!reservation.is_visible_to_customers);

        reservation
            .advance_delivery(StockStatus::Delivered, Utc::now())
            .unwrap();
        assert!(reservation.is_visible_to_customers);
        assert!(reservation.delivered_at.is_some());
    }

    /// Many threads compete for the same lot behind one lock
    #[test]
    fn test_concurrent_selection_never_oversells() {
        let shared_lot = Arc::new(Mutex::new(lot("50", "10")));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared_lot = Arc::clone(&shared_lot);
                std::thread::spawn(move || {
                    let mut guard = shared_lot.lock().unwrap();
                    guard.reserve(dec("7"), dec("11"), today()).is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        let lot = shared_lot.lock().unwrap();
        assert_eq!(successes, 7);
        assert_eq!(lot.available_quantity, dec("1"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Reserved quantities never exceed the lot size
        #[test]
        fn prop_no_oversell(
            total in 1i64..10_000,
            requests in prop::collection::vec(1i64..2_000, 1..30),
        ) {
            let mut lot = lot(&total.to_string(), "1");
            let mut reserved = Decimal::ZERO;

            for qty in requests {
                let qty = Decimal::from(qty);
                let before = lot.available_quantity;
                match lot.reserve(qty, dec("2"), today()) {
                    Ok(()) => reserved += qty,
                    Err(_) => prop_assert_eq!(lot.available_quantity, before),
                }
            }

            prop_assert!(lot.available_quantity >= Decimal::ZERO);
            prop_assert_eq!(reserved + lot.available_quantity, Decimal::from(total));
        }
    }
}

// ============================================================================
// Database Tests
// ============================================================================

mod db_tests {
    use super::*;
    use agro_market_backend::error::AppError;
    use agro_market_backend::services::reservation::ReserveInput;
    use agro_market_backend::services::ReservationService;
    use shared::{AuditAction, UserRole};
    use sqlx::PgPool;

    fn input(quantity: &str, resale_price: &str) -> ReserveInput {
        ReserveInput {
            quantity: dec(quantity),
            resale_price: dec(resale_price),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_sequential_reservations(pool: PgPool) {
        let (_, farmer_id) = common::insert_farmer(&pool, "Hill Farm").await;
        let (_, vendor_a) = common::insert_vendor(&pool, "Shop A").await;
        let (_, vendor_b) = common::insert_vendor(&pool, "Shop B").await;
        let (_, vendor_c) = common::insert_vendor(&pool, "Shop C").await;
        let lot_id =
            common::insert_stock_lot(&pool, farmer_id, dec("100"), dec("10"), common::tomorrow()).await;

        let service = ReservationService::new(pool.clone(), common::LOCK_TIMEOUT_MS);

        let first = service.reserve(vendor_a, lot_id, input("40", "12")).await.unwrap();
        assert_eq!(first.available_quantity, dec("40"));
        let lot = service.get_stock_lot(lot_id).await.unwrap();
        assert_eq!(lot.available_quantity, dec("60"));
        assert_eq!(lot.status, StockStatus::Pending);

        service.reserve(vendor_b, lot_id, input("60", "12")).await.unwrap();
        let lot = service.get_stock_lot(lot_id).await.unwrap();
        assert_eq!(lot.available_quantity, Decimal::ZERO);
        assert_eq!(lot.status, StockStatus::Selected);

        let err = service.reserve(vendor_c, lot_id, input("1", "12")).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::InsufficientStock { .. })
        ));

        let selections: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_log WHERE action = $1")
            .bind(AuditAction::VendorSelected)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(selections, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_concurrent_reservations_do_not_oversell(pool: PgPool) {
        let (_, farmer_id) = common::insert_farmer(&pool, "River Farm").await;
        let lot_id =
            common::insert_stock_lot(&pool, farmer_id, dec("10"), dec("5"), common::tomorrow()).await;

        let mut vendors = Vec::new();
        for i in 0..6 {
            let (_, vendor_id) = common::insert_vendor(&pool, &format!("Shop {}", i)).await;
            vendors.push(vendor_id);
        }

        let service = ReservationService::new(pool.clone(), common::LOCK_TIMEOUT_MS);
        let tasks: Vec<_> = vendors
            .into_iter()
            .map(|vendor_id| {
                let service = service.clone();
                tokio::spawn(async move { service.reserve(vendor_id, lot_id, input("3", "6")).await })
            })
            .collect();

        let mut successes = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => successes += 1,
                Err(AppError::Domain(DomainError::InsufficientStock { .. })) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        let lot = service.get_stock_lot(lot_id).await.unwrap();
        assert_eq!(successes, 3);
        assert_eq!(lot.available_quantity, dec("1"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_sub_hundredth_quantities_are_rejected(pool: PgPool) {
        let (_, farmer_id) = common::insert_farmer(&pool, "Valley Farm").await;
        let (_, vendor_id) = common::insert_vendor(&pool, "Market Stall").await;
        let lot_id =
            common::insert_stock_lot(&pool, farmer_id, dec("10.00"), dec("10"), common::tomorrow()).await;

        let service = ReservationService::new(pool.clone(), common::LOCK_TIMEOUT_MS);
        for _ in 0..20 {
            let err = service.reserve(vendor_id, lot_id, input("0.005", "12")).await.unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));
        }
        let err = service.reserve(vendor_id, lot_id, input("1", "12.005")).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        service.reserve(vendor_id, lot_id, input("2.50", "12")).await.unwrap();

        let lot = service.get_stock_lot(lot_id).await.unwrap();
        let reserved: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(reserved_quantity), 0) FROM reservations WHERE stock_lot_id = $1",
        )
        .bind(lot_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(lot.available_quantity, dec("7.50"));
        assert_eq!(reserved, dec("2.50"));
        assert_eq!(reserved + lot.available_quantity, lot.total_quantity);
    }

    /// Notification and audit writes happen after commit; their failure is logged only
    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_side_effect_failure_keeps_reservation(pool: PgPool) {
        let (_, farmer_id) = common::insert_farmer(&pool, "Ridge Farm").await;
        let (_, vendor_id) = common::insert_vendor(&pool, "Night Market").await;
        let lot_id =
            common::insert_stock_lot(&pool, farmer_id, dec("20"), dec("5"), common::tomorrow()).await;

        sqlx::query(
            r#"
            CREATE FUNCTION refuse_insert() RETURNS trigger AS $$
            BEGIN
                RAISE EXCEPTION 'writes to % are disabled', TG_TABLE_NAME;
            END;
            $$ LANGUAGE plpgsql
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        for table in ["notifications", "audit_log"] {
            sqlx::query(&format!(
                "CREATE TRIGGER refuse_{table} BEFORE INSERT ON {table} \
                 FOR EACH ROW EXECUTE FUNCTION refuse_insert()"
            ))
            .execute(&pool)
            .await
            .unwrap();
        }

        let service = ReservationService::new(pool.clone(), common::LOCK_TIMEOUT_MS);
        let reservation = service.reserve(vendor_id, lot_id, input("5", "8")).await.unwrap();

        let stored = service.get_reservation(reservation.id).await.unwrap();
        assert_eq!(stored.reserved_quantity, dec("5"));
        let lot = service.get_stock_lot(lot_id).await.unwrap();
        assert_eq!(lot.available_quantity, dec("15"));

        let side_effects: i64 = sqlx::query_scalar(
            "SELECT (SELECT COUNT(*) FROM notifications) + (SELECT COUNT(*) FROM audit_log)",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(side_effects, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_delivery_makes_reservation_visible(pool: PgPool) {
        let admin = common::insert_user(&pool, UserRole::Admin, "Admin").await;
        let (_, farmer_id) = common::insert_farmer(&pool, "Lake Farm").await;
        let (_, vendor_id) = common::insert_vendor(&pool, "Corner Shop").await;
        let lot_id =
            common::insert_stock_lot(&pool, farmer_id, dec("20"), dec("5"), common::tomorrow()).await;

        let service = ReservationService::new(pool.clone(), common::LOCK_TIMEOUT_MS);
        let reservation = service.reserve(vendor_id, lot_id, input("5", "8")).await.unwrap();

        service
            .update_delivery_status(admin, reservation.id, StockStatus::InTransit)
            .await
            .unwrap();
        let delivered = service
            .update_delivery_status(admin, reservation.id, StockStatus::Delivered)
            .await
            .unwrap();

        assert!(delivered.is_visible_to_customers);
        assert!(delivered.delivered_at.is_some());
    }
}
