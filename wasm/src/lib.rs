//! WebAssembly module for the Agro Marketplace
//!
//! Lets vendor and admin screens preview what the backend will compute:
//! - Commission split of a sale line
//! - Whether a requested quantity fits a stock lot

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use shared::{fits_available, line_total, split, CommissionSplit};
use wasm_bindgen::prelude::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&"agro-market-wasm loaded".into());
}

/// Split preview returned to JavaScript
#[derive(Debug, Serialize)]
struct SplitPreview {
    #[serde(flatten)]
    split: CommissionSplit,
    check_total: Decimal,
}

fn parse_decimal(value: &str, field: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|e| format!("Invalid {}: {}", field, e))
}

fn split_preview_json(line_total: &str, base_cost: &str, rate_percent: &str) -> Result<String, String> {
    let line_total = parse_decimal(line_total, "line_total")?;
    let base_cost = parse_decimal(base_cost, "base_cost")?;
    let rate_percent = parse_decimal(rate_percent, "rate_percent")?;

    let split = split(line_total, base_cost, rate_percent).map_err(|e| e.to_string())?;
    let preview = SplitPreview {
        check_total: split.distributed(),
        split,
    };
    serde_json::to_string(&preview).map_err(|e| e.to_string())
}

/// Preview the farmer / vendor / platform split of a sale line as JSON
#[wasm_bindgen]
pub fn preview_split(line_total: &str, base_cost: &str, rate_percent: &str) -> Result<String, JsValue> {
    split_preview_json(line_total, base_cost, rate_percent).map_err(|e| JsValue::from_str(&e))
}

/// Line total of `quantity` units at `unit_price`, rounded to cents
#[wasm_bindgen]
pub fn preview_line_total(unit_price: &str, quantity: &str) -> Result<String, JsValue> {
    let unit_price = parse_decimal(unit_price, "unit_price").map_err(|e| JsValue::from_str(&e))?;
    let quantity = parse_decimal(quantity, "quantity").map_err(|e| JsValue::from_str(&e))?;
    Ok(line_total(unit_price, quantity).to_string())
}

/// Client-side check before a vendor submits a selection
#[wasm_bindgen]
pub fn validate_reservation(available: &str, requested: &str) -> bool {
    match (Decimal::from_str(available), Decimal::from_str(requested)) {
        (Ok(available), Ok(requested)) => fits_available(available, requested),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_split() {
        let json = split_preview_json("1000.00", "600.00", "5").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["farmer_share"], "575.00");
        assert_eq!(value["vendor_share"], "375.00");
        assert_eq!(value["admin_commission"], "50.00");
        assert_eq!(value["check_total"], "1000.00");
    }

    #[test]
    fn test_preview_split_rejects_bad_input() {
        assert!(split_preview_json("abc", "1", "5").is_err());
        assert!(split_preview_json("100", "120", "5").is_err());
        assert!(split_preview_json("100", "50", "150").is_err());
    }

    #[test]
    fn test_validate_reservation() {
        assert!(validate_reservation("10", "10"));
        assert!(!validate_reservation("10", "10.5"));
        assert!(!validate_reservation("10", "0"));
        assert!(!validate_reservation("ten", "1"));
    }

    #[test]
    fn test_preview_line_total() {
        assert_eq!(preview_line_total("33.335", "1").unwrap(), "33.34");
    }
}
