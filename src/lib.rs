//! Food Admin - client core for the food-ordering admin dashboard.
//!
//! The dashboard UI calls into this crate for everything that is not
//! rendering: paginated product/order lists with debounced search
//! ([`list_query`]), price and discount math for the product editor and the
//! order-details view ([`pricing`]), and catalog mutations against the admin
//! REST API ([`catalog`]).

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

pub mod api;
pub mod catalog;
pub mod config;
pub mod envelope;
pub mod error;
pub mod list_query;
pub mod logging;
pub mod models;
pub mod pagination;
pub mod pricing;

pub use api::AdminClient;
pub use config::AdminConfig;
pub use error::AdminError;
pub use list_query::{HttpListSource, ListPhase, ListQueryController, ListSource, ResponseOrdering};
pub use pagination::{PageRequest, PageResult};
pub use pricing::{DiscountEdit, GrandTotalFallback, OrderTotals, PricedLine};

// ---------------------------------------------------------------------------
// Lenient JSON field readers
//
// The admin API is inconsistent about types (ids and prices arrive as numbers
// or strings, flags as bools or 0/1). These readers take the first key that
// yields a usable value.
// ---------------------------------------------------------------------------

pub(crate) fn value_str(v: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = v.get(*key).and_then(|x| x.as_str()) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Ids may be numeric or string.
pub(crate) fn value_id(v: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match v.get(*key) {
            Some(Value::Number(n)) => return Some(n.to_string()),
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            _ => {}
        }
    }
    None
}

pub(crate) fn decimal_from_value(v: &Value) -> Option<Decimal> {
    let raw = match v {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}

pub(crate) fn value_decimal(v: &Value, keys: &[&str]) -> Option<Decimal> {
    keys.iter()
        .filter_map(|key| v.get(*key))
        .find_map(decimal_from_value)
}

pub(crate) fn u64_from_value(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

pub(crate) fn value_u64(v: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().filter_map(|key| v.get(*key)).find_map(u64_from_value)
}

pub(crate) fn value_bool(v: &Value, keys: &[&str]) -> Option<bool> {
    for key in keys {
        let parsed = match v.get(*key) {
            Some(Value::Bool(b)) => Some(*b),
            Some(Value::Number(n)) => n.as_i64().map(|i| i != 0),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Some(true),
                "0" | "false" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        };
        if parsed.is_some() {
            return parsed;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_decimal_accepts_numbers_and_strings() {
        let v = json!({ "price": "12.50", "sale_price": 9.99, "bad": "abc" });
        assert_eq!(value_decimal(&v, &["price"]), Some(Decimal::new(1250, 2)));
        assert_eq!(value_decimal(&v, &["sale_price"]), Some(Decimal::new(999, 2)));
        assert_eq!(value_decimal(&v, &["bad"]), None);
        assert_eq!(
            value_decimal(&v, &["missing", "price"]),
            Some(Decimal::new(1250, 2))
        );
    }

    #[test]
    fn test_value_u64_and_id() {
        let v = json!({ "current_page": "3", "total": 42, "id": 17, "slug": " pizza " });
        assert_eq!(value_u64(&v, &["current_page"]), Some(3));
        assert_eq!(value_u64(&v, &["total"]), Some(42));
        assert_eq!(value_id(&v, &["id"]), Some("17".into()));
        assert_eq!(value_id(&v, &["slug"]), Some("pizza".into()));
    }

    #[test]
    fn test_value_bool_variants() {
        let v = json!({ "a": true, "b": 0, "c": "1", "d": "maybe" });
        assert_eq!(value_bool(&v, &["a"]), Some(true));
        assert_eq!(value_bool(&v, &["b"]), Some(false));
        assert_eq!(value_bool(&v, &["c"]), Some(true));
        assert_eq!(value_bool(&v, &["d"]), None);
    }
}
