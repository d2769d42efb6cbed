//! Order settlement tests
//!
//! - Settlement plans aggregate credits per wallet and balance to the order total
//! - Orders settle exactly once, including under concurrent triggers
//! - A missing commission rate defers settlement until a retry

mod common;

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    CommissionRate, DomainError, SettlementLine, SettlementOutcome, SettlementPlan, WalletOwner,
};
use uuid::Uuid;

use common::dec;

fn rate(percent: &str) -> CommissionRate {
    CommissionRate {
        rate_percent: dec(percent),
        updated_at: chrono::Utc::now(),
        updated_by: None,
    }
}

fn line(farmer_id: Uuid, vendor_id: Uuid, quantity: &str, unit_price: &str, base_price: &str) -> SettlementLine {
    SettlementLine {
        line_id: Uuid::new_v4(),
        reservation_id: Uuid::new_v4(),
        farmer_id,
        vendor_id,
        quantity: dec(quantity),
        unit_price: dec(unit_price),
        base_price: dec(base_price),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_plan_for_single_line() {
        let farmer = Uuid::new_v4();
        let vendor = Uuid::new_v4();
        let plan = SettlementPlan::build(&[line(farmer, vendor, "10", "100", "60")], Some(&rate("5")))
            .unwrap();

        let credit = |owner| plan.credits.iter().find(|c| c.owner == owner).map(|c| c.amount);
        assert_eq!(credit(WalletOwner::Farmer(farmer)), Some(dec("575.00")));
        assert_eq!(credit(WalletOwner::Vendor(vendor)), Some(dec("375.00")));
        assert_eq!(credit(WalletOwner::Admin), Some(dec("50.00")));
        assert_eq!(plan.credited_total(), dec("1000.00"));
    }

    #[test]
    fn test_plan_aggregates_per_wallet() {
        let farmer = Uuid::new_v4();
        let vendor = Uuid::new_v4();
        let lines = [
            line(farmer, vendor, "2", "50", "30"),
            line(farmer, vendor, "1", "80", "40"),
        ];
        let plan = SettlementPlan::build(&lines, Some(&rate("10"))).unwrap();

        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.credits.len(), 3);
        assert_eq!(plan.order_total(), dec("180.00"));
        assert_eq!(plan.credited_total(), plan.order_total());
    }

    #[test]
    fn test_credits_are_sorted_by_owner() {
        let plan = SettlementPlan::build(
            &[
                line(Uuid::new_v4(), Uuid::new_v4(), "1", "20", "10"),
                line(Uuid::new_v4(), Uuid::new_v4(), "1", "20", "10"),
            ],
            Some(&rate("5")),
        )
        .unwrap();

        let owners: Vec<_> = plan.credits.iter().map(|c| c.owner).collect();
        let mut sorted = owners.clone();
        sorted.sort();
        assert_eq!(owners, sorted);
        assert_eq!(owners.last(), Some(&WalletOwner::Admin));
    }

    #[test]
    fn test_plan_without_rate() {
        let result = SettlementPlan::build(
            &[line(Uuid::new_v4(), Uuid::new_v4(), "1", "20", "10")],
            None,
        );
        assert_eq!(result, Err(DomainError::NoCommissionConfigured));
    }

    #[test]
    fn test_zero_credits_are_skipped() {
        // Sold at cost with a 0% rate: the vendor and platform get nothing
        let plan = SettlementPlan::build(
            &[line(Uuid::new_v4(), Uuid::new_v4(), "3", "10", "10")],
            Some(&rate("0")),
        )
        .unwrap();
        assert_eq!(plan.credits.len(), 1);
        assert!(matches!(plan.credits[0].owner, WalletOwner::Farmer(_)));
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let json = serde_json::to_value(SettlementOutcome::Deferred).unwrap();
        assert_eq!(json["outcome"], "deferred");
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

        /// Credited total always equals the sum of line totals
        #[test]
        fn prop_plan_balances(
            lines in prop::collection::vec((1i64..100, 100i64..10_000, 0i64..5_000), 1..10),
            rate_bp in 0i64..=1000,
        ) {
            let farmers: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
            let vendors: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

            let lines: Vec<SettlementLine> = lines
                .into_iter()
                .enumerate()
                .map(|(i, (qty, base_cents, margin_cents))| SettlementLine {
                    line_id: Uuid::new_v4(),
                    reservation_id: Uuid::new_v4(),
                    farmer_id: farmers[i % 3],
                    vendor_id: vendors[(i + 1) % 3],
                    quantity: Decimal::from(qty),
                    unit_price: Decimal::new(base_cents + margin_cents, 2),
                    base_price: Decimal::new(base_cents, 2),
                })
                .collect();

            let rate = CommissionRate {
                rate_percent: Decimal::new(rate_bp, 2),
                updated_at: chrono::Utc::now(),
                updated_by: None,
            };

            if let Ok(plan) = SettlementPlan::build(&lines, Some(&rate)) {
                prop_assert_eq!(plan.credited_total(), plan.order_total());
                prop_assert!(plan.credits.iter().all(|c| c.amount > Decimal::ZERO));
            }
        }
    }
}

// ============================================================================
// Database Tests
// ============================================================================

mod db_tests {
    use super::*;
    use agro_market_backend::services::order::UpdateOrderStatusInput;
    use agro_market_backend::services::reservation::ReserveInput;
    use agro_market_backend::services::{OrderService, ReservationService, SettlementEngine};
    use shared::{AuditAction, OrderStatus, PaymentStatus, UserRole};
    use sqlx::PgPool;

    struct Fixture {
        admin: Uuid,
        farmer: Uuid,
        vendor: Uuid,
        order_id: Uuid,
    }

    /// One 10kg line sold at 100.00 with a 60.00 base price
    async fn delivered_order(pool: &PgPool) -> Fixture {
        let admin = common::insert_user(pool, UserRole::Admin, "Admin").await;
        let customer = common::insert_user(pool, UserRole::Customer, "Customer").await;
        let (_, farmer) = common::insert_farmer(pool, "Sunrise Farm").await;
        let (_, vendor) = common::insert_vendor(pool, "Fresh Mart").await;
        let lot_id = common::insert_stock_lot(pool, farmer, dec("50"), dec("60"), common::tomorrow()).await;

        let reservation = ReservationService::new(pool.clone(), common::LOCK_TIMEOUT_MS)
            .reserve(
                vendor,
                lot_id,
                ReserveInput {
                    quantity: dec("10"),
                    resale_price: dec("100"),
                },
            )
            .await
            .unwrap();

        let order_id =
            common::insert_order(pool, customer, &[(reservation.id, dec("10"), dec("100"))]).await;
        common::force_delivered_and_paid(pool, order_id).await;

        Fixture {
            admin,
            farmer,
            vendor,
            order_id,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_missing_rate_defers_then_retry_settles_once(pool: PgPool) {
        let f = delivered_order(&pool).await;
        let engine = SettlementEngine::new(pool.clone(), common::LOCK_TIMEOUT_MS);

        let outcome = engine.on_order_delivered(f.order_id).await.unwrap();
        assert_eq!(outcome, SettlementOutcome::Deferred);
        assert_eq!(common::balance(&pool, WalletOwner::Farmer(f.farmer)).await, Decimal::ZERO);

        common::set_commission(&pool, dec("5")).await;

        let outcome = engine.on_order_delivered(f.order_id).await.unwrap();
        assert!(outcome.is_settled());

        let again = engine.on_order_delivered(f.order_id).await.unwrap();
        assert!(matches!(again, SettlementOutcome::AlreadySettled { .. }));

        assert_eq!(common::balance(&pool, WalletOwner::Farmer(f.farmer)).await, dec("575.00"));
        assert_eq!(common::balance(&pool, WalletOwner::Vendor(f.vendor)).await, dec("375.00"));
        assert_eq!(common::balance(&pool, WalletOwner::Admin).await, dec("50.00"));

        let entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_log WHERE action = $1")
            .bind(AuditAction::WalletTransaction)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(entries, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_concurrent_triggers_credit_once(pool: PgPool) {
        common::set_commission(&pool, dec("5")).await;
        let f = delivered_order(&pool).await;
        let engine = SettlementEngine::new(pool.clone(), common::LOCK_TIMEOUT_MS);

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let engine = engine.clone();
                let order_id = f.order_id;
                tokio::spawn(async move { engine.on_order_delivered(order_id).await })
            })
            .collect();

        let mut outcomes = Vec::new();
        for task in tasks {
            outcomes.push(task.await.unwrap().unwrap());
        }

        let posted = outcomes
            .iter()
            .filter(|o| matches!(o, SettlementOutcome::Settled { .. }))
            .count();
        let skipped = outcomes
            .iter()
            .filter(|o| matches!(o, SettlementOutcome::AlreadySettled { .. }))
            .count();
        assert_eq!(posted, 1);
        assert_eq!(skipped, 4);

        let entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_log WHERE action = $1")
            .bind(AuditAction::WalletTransaction)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(entries, 1);
        assert_eq!(common::balance(&pool, WalletOwner::Farmer(f.farmer)).await, dec("575.00"));
        assert_eq!(common::balance(&pool, WalletOwner::Admin).await, dec("50.00"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_status_update_triggers_settlement(pool: PgPool) {
        common::set_commission(&pool, dec("5")).await;
        let f = delivered_order(&pool).await;
        sqlx::query("UPDATE orders SET status = 'shipped', payment_status = 'paid' WHERE id = $1")
            .bind(f.order_id)
            .execute(&pool)
            .await
            .unwrap();

        let service = OrderService::new(pool.clone(), common::LOCK_TIMEOUT_MS);
        let response = service
            .update_status(
                f.admin,
                f.order_id,
                UpdateOrderStatusInput {
                    status: Some(OrderStatus::Delivered),
                    payment_status: None,
                },
            )
            .await
            .unwrap();

        assert!(response.order.is_settled());
        assert!(response.settlement.map(|s| s.is_settled()).unwrap_or(false));

        // Replaying the same event changes nothing
        let replay = service
            .update_status(
                f.admin,
                f.order_id,
                UpdateOrderStatusInput {
                    status: Some(OrderStatus::Delivered),
                    payment_status: Some(PaymentStatus::Paid),
                },
            )
            .await
            .unwrap();
        assert!(replay.settlement.is_none());
        assert_eq!(common::balance(&pool, WalletOwner::Vendor(f.vendor)).await, dec("375.00"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_negative_share_leaves_order_unsettled(pool: PgPool) {
        common::set_commission(&pool, dec("5")).await;
        let f = delivered_order(&pool).await;
        // A line sold below the farmer's base price
        sqlx::query("UPDATE order_lines SET unit_price = 50 WHERE order_id = $1")
            .bind(f.order_id)
            .execute(&pool)
            .await
            .unwrap();

        let engine = SettlementEngine::new(pool.clone(), common::LOCK_TIMEOUT_MS);
        let err = engine.on_order_delivered(f.order_id).await.unwrap_err();
        assert!(matches!(
            err,
            agro_market_backend::error::AppError::Domain(DomainError::NegativeShare { .. })
        ));

        let order = OrderService::new(pool.clone(), common::LOCK_TIMEOUT_MS)
            .get_order(f.order_id)
            .await
            .unwrap();
        assert!(!order.order.is_settled());
        assert_eq!(common::balance(&pool, WalletOwner::Farmer(f.farmer)).await, Decimal::ZERO);
    }
}
