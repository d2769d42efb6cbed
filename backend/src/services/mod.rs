//! Business logic services for the Agro Marketplace settlement core

use rust_decimal::Decimal;
use sqlx::PgConnection;

use crate::error::AppResult;

pub mod audit;
pub mod commission;
pub mod notification;
pub mod order;
pub mod payout;
pub mod reservation;
pub mod settlement;
pub mod wallet;

pub use audit::AuditService;
pub use commission::CommissionService;
pub use notification::NotificationService;
pub use order::OrderService;
pub use payout::PayoutService;
pub use reservation::ReservationService;
pub use settlement::SettlementEngine;
pub use wallet::WalletService;

/// Bound row-lock waits for the rest of the current transaction
pub(crate) async fn set_lock_timeout(conn: &mut PgConnection, lock_timeout_ms: u64) -> AppResult<()> {
    sqlx::query("SELECT set_config('lock_timeout', $1, true)")
        .bind(format!("{}ms", lock_timeout_ms))
        .execute(conn)
        .await?;
    Ok(())
}

/// `validator` custom check for money and quantity inputs.
///
/// Values must be positive and fit the two-decimal columns they are stored in.
pub(crate) fn validate_amount(value: &Decimal) -> Result<(), validator::ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(validator::ValidationError::new("must_be_positive"));
    }
    if shared::ensure_money_scale(*value, "amount").is_err() {
        return Err(validator::ValidationError::new("too_many_decimal_places"));
    }
    Ok(())
}
