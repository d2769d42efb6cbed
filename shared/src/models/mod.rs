//! Domain models for the Agro Marketplace settlement core

mod audit;
mod commission;
mod notification;
mod order;
mod payout;
mod settlement;
mod stock;
mod wallet;

pub use audit::*;
pub use commission::*;
pub use notification::*;
pub use order::*;
pub use payout::*;
pub use settlement::*;
pub use stock::*;
pub use wallet::*;
