//! Shared types and models for the Agro Marketplace settlement core
//!
//! This crate contains the pure domain rules (wallet invariants, stock
//! reservation, commission split, settlement planning) shared between the
//! backend and the browser (via WASM).

pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
