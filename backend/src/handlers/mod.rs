//! HTTP handlers

pub mod audit;
pub mod commission;
pub mod health;
pub mod notification;
pub mod order;
pub mod payout;
pub mod reservation;
pub mod wallet;

pub use audit::*;
pub use commission::*;
pub use health::*;
pub use notification::*;
pub use order::*;
pub use payout::*;
pub use reservation::*;
pub use wallet::*;
