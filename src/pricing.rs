//! Price and discount reconciliation.
//!
//! Pure functions shared by the product editor and the order-details view.
//! Nothing here can fail: missing or invalid numbers are treated as absent
//! (and absent money as zero) so that a price is always renderable.
//!
//! Money is rounded to 2 decimal places, midpoint away from zero. Discount
//! percentages are rounded to whole percents the same way.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::{value_decimal, value_u64};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Keep only non-negative amounts.
fn non_negative(amount: Option<Decimal>) -> Option<Decimal> {
    amount.filter(|a| !a.is_sign_negative())
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// One priced product entry (an order line, or a product shown alone).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub unit_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub quantity: u32,
}

impl PricedLine {
    pub fn new(unit_price: Option<Decimal>, sale_price: Option<Decimal>, quantity: u32) -> Self {
        Self {
            unit_price: non_negative(unit_price),
            sale_price: non_negative(sale_price),
            quantity,
        }
    }

    /// Read a line from an API object: `unit_price` (falling back to `price`),
    /// `sale_price`, `quantity` (default 1).
    pub fn from_value(v: &Value) -> Self {
        let quantity = value_u64(v, &["quantity", "qty"])
            .map(|q| q.min(u32::MAX as u64) as u32)
            .unwrap_or(1);
        Self::new(
            value_decimal(v, &["unit_price", "unitPrice", "price"]),
            value_decimal(v, &["sale_price", "salePrice"]),
            quantity,
        )
    }
}

pub fn effective_unit_price(line: &PricedLine) -> Decimal {
    match line.sale_price {
        Some(sale) if sale > Decimal::ZERO => sale,
        _ => line.unit_price.unwrap_or(Decimal::ZERO),
    }
}

pub fn has_discount(line: &PricedLine) -> bool {
    match (line.sale_price, line.unit_price) {
        (Some(sale), Some(unit)) => sale > Decimal::ZERO && sale < unit,
        _ => false,
    }
}

pub fn line_total(line: &PricedLine) -> Decimal {
    round2(effective_unit_price(line) * Decimal::from(line.quantity))
}

/// Total at the undiscounted unit price (the struck-through figure).
pub fn original_line_total(line: &PricedLine) -> Decimal {
    round2(line.unit_price.unwrap_or(Decimal::ZERO) * Decimal::from(line.quantity))
}

pub fn line_savings(line: &PricedLine) -> Decimal {
    (original_line_total(line) - line_total(line)).max(Decimal::ZERO)
}

pub fn order_subtotal(lines: &[PricedLine]) -> Decimal {
    lines.iter().map(line_total).sum()
}

pub fn order_savings(lines: &[PricedLine]) -> Decimal {
    lines.iter().map(line_savings).sum()
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// What to do when the server did not send `total_amount`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrandTotalFallback {
    /// `subtotal - discount`, floored at zero.
    #[default]
    SubtractDiscount,
    SubtotalOnly,
}

impl FromStr for GrandTotalFallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "subtract-discount" => Ok(Self::SubtractDiscount),
            "subtotal-only" | "subtotal" => Ok(Self::SubtotalOnly),
            other => Err(format!(
                "unknown grand total fallback {other:?} (expected subtract-discount or subtotal-only)"
            )),
        }
    }
}

impl fmt::Display for GrandTotalFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubtractDiscount => f.write_str("subtract-discount"),
            Self::SubtotalOnly => f.write_str("subtotal-only"),
        }
    }
}

/// The pricing-relevant part of an order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PricedOrder {
    /// Authoritative total from the server, when sent.
    pub total_amount: Option<Decimal>,
    /// Extra order-level discount (coupon etc).
    pub discount: Option<Decimal>,
    pub lines: Vec<PricedLine>,
}

/// Server total when present, client computation otherwise.
pub fn order_grand_total(order: &PricedOrder, fallback: GrandTotalFallback) -> Decimal {
    if let Some(total) = non_negative(order.total_amount) {
        return total;
    }
    let subtotal = order_subtotal(&order.lines);
    match fallback {
        GrandTotalFallback::SubtotalOnly => subtotal,
        GrandTotalFallback::SubtractDiscount => {
            let discount = non_negative(order.discount).unwrap_or(Decimal::ZERO);
            (subtotal - discount).max(Decimal::ZERO)
        }
    }
}

/// Every figure the order-details view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub savings: Decimal,
    pub discount: Decimal,
    pub grand_total: Decimal,
    /// True when `grand_total` came from the server.
    pub server_total: bool,
}

impl OrderTotals {
    pub fn compute(order: &PricedOrder, fallback: GrandTotalFallback) -> Self {
        Self {
            subtotal: order_subtotal(&order.lines),
            savings: order_savings(&order.lines),
            discount: non_negative(order.discount).unwrap_or(Decimal::ZERO),
            grand_total: order_grand_total(order, fallback),
            server_total: non_negative(order.total_amount).is_some(),
        }
    }
}

// ---------------------------------------------------------------------------
// Discount <-> sale price
// ---------------------------------------------------------------------------

/// `price * (1 - percent/100)` rounded to cents, or `None` when either input
/// is not positive. Percentages above 100 are treated as 100.
pub fn derive_sale_price_from_discount(price: Decimal, discount_percent: Decimal) -> Option<Decimal> {
    if price <= Decimal::ZERO || discount_percent <= Decimal::ZERO {
        return None;
    }
    let percent = discount_percent.min(HUNDRED);
    Some(round2(price * (Decimal::ONE - percent / HUNDRED)))
}

/// Whole-percent discount implied by a sale price; 0 unless
/// `0 < sale < price`.
pub fn derive_discount_from_sale_price(price: Decimal, sale_price: Option<Decimal>) -> u32 {
    let Some(sale) = sale_price else {
        return 0;
    };
    if price <= Decimal::ZERO || sale <= Decimal::ZERO || sale >= price {
        return 0;
    }
    let percent = ((price - sale) / price * HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    percent.to_u32().unwrap_or(0)
}

/// Product-editor state for the price / discount / sale price trio.
///
/// While a discount percent is active the sale price is derived and the
/// editor shows the sale-price field read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscountEdit {
    price: Option<Decimal>,
    discount_percent: Decimal,
    sale_price: Option<Decimal>,
}

impl DiscountEdit {
    /// Seed the editor from an existing product.
    pub fn for_product(price: Option<Decimal>, sale_price: Option<Decimal>) -> Self {
        let price = non_negative(price);
        let sale_price = non_negative(sale_price);
        let discount = price
            .map(|p| derive_discount_from_sale_price(p, sale_price))
            .unwrap_or(0);
        Self {
            price,
            discount_percent: Decimal::from(discount),
            sale_price,
        }
    }

    pub fn price(&self) -> Option<Decimal> {
        self.price
    }

    pub fn discount_percent(&self) -> Decimal {
        self.discount_percent
    }

    pub fn sale_price(&self) -> Option<Decimal> {
        self.sale_price
    }

    pub fn sale_price_locked(&self) -> bool {
        self.discount_percent > Decimal::ZERO
    }

    pub fn set_price(&mut self, price: Option<Decimal>) {
        self.price = non_negative(price);
        if self.sale_price_locked() {
            if let Some(p) = self.price.filter(|p| *p > Decimal::ZERO) {
                self.sale_price = derive_sale_price_from_discount(p, self.discount_percent);
            }
        }
    }

    pub fn set_discount(&mut self, discount_percent: Decimal) {
        let percent = discount_percent.max(Decimal::ZERO).min(HUNDRED);
        self.discount_percent = percent;
        if percent.is_zero() {
            self.sale_price = None;
        } else if let Some(p) = self.price.filter(|p| *p > Decimal::ZERO) {
            self.sale_price = derive_sale_price_from_discount(p, percent);
        }
    }

    /// Direct sale-price edit. Back-derives the percent when the sale price
    /// undercuts the base price; clearing the sale price clears the percent.
    pub fn set_sale_price(&mut self, sale_price: Option<Decimal>) {
        self.sale_price = non_negative(sale_price);
        match (self.sale_price, self.price) {
            (Some(sale), Some(price)) if sale > Decimal::ZERO && sale < price => {
                self.discount_percent =
                    Decimal::from(derive_discount_from_sale_price(price, Some(sale)));
            }
            (Some(sale), _) if sale > Decimal::ZERO => {}
            _ => self.discount_percent = Decimal::ZERO,
        }
    }

    /// The line the edited product would produce at quantity 1.
    pub fn priced_line(&self) -> PricedLine {
        PricedLine::new(self.price, self.sale_price, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn d(units: i64) -> Decimal {
        Decimal::from(units)
    }

    fn cents(c: i64) -> Decimal {
        Decimal::new(c, 2)
    }

    fn line(unit: i64, sale: Option<i64>, qty: u32) -> PricedLine {
        PricedLine::new(Some(d(unit)), sale.map(d), qty)
    }

    #[test]
    fn test_discounted_line() {
        let l = line(100, Some(80), 2);
        assert_eq!(effective_unit_price(&l), d(80));
        assert!(has_discount(&l));
        assert_eq!(line_total(&l), d(160));
        assert_eq!(original_line_total(&l), d(200));
        assert_eq!(line_savings(&l), d(40));
    }

    #[test]
    fn test_line_without_sale_price() {
        let l = line(100, None, 1);
        assert_eq!(effective_unit_price(&l), d(100));
        assert!(!has_discount(&l));
        assert_eq!(line_savings(&l), Decimal::ZERO);
    }

    #[test]
    fn test_sale_price_above_unit_price_is_not_a_discount() {
        let l = line(50, Some(60), 1);
        assert!(!has_discount(&l));
        assert_eq!(effective_unit_price(&l), d(60));
        assert_eq!(line_savings(&l), Decimal::ZERO);
    }

    #[test]
    fn test_zero_sale_price_falls_back_to_unit_price() {
        let l = line(30, Some(0), 3);
        assert_eq!(effective_unit_price(&l), d(30));
        assert!(!has_discount(&l));
        assert_eq!(line_total(&l), d(90));
    }

    #[test]
    fn test_missing_prices_are_zero() {
        let l = PricedLine::new(None, None, 4);
        assert_eq!(effective_unit_price(&l), Decimal::ZERO);
        assert_eq!(line_total(&l), Decimal::ZERO);
        assert_eq!(original_line_total(&l), Decimal::ZERO);
    }

    #[test]
    fn test_from_value_is_lenient() {
        let l = PricedLine::from_value(&json!({
            "price": "12.50", "sale_price": "abc", "quantity": "2"
        }));
        assert_eq!(l.unit_price, Some(cents(1250)));
        assert_eq!(l.sale_price, None);
        assert_eq!(l.quantity, 2);

        let l = PricedLine::from_value(&json!({
            "unit_price": 9.99, "price": 100, "sale_price": -1
        }));
        assert_eq!(l.unit_price, Some(cents(999)));
        assert_eq!(l.sale_price, None);
        assert_eq!(l.quantity, 1);
    }

    #[test]
    fn test_order_subtotal_and_savings() {
        let lines = vec![line(100, Some(80), 2), line(15, None, 3), line(10, Some(7), 1)];
        assert_eq!(order_subtotal(&lines), d(160 + 45 + 7));
        assert_eq!(order_savings(&lines), d(40 + 3));
    }

    #[test]
    fn test_grand_total_prefers_server_total() {
        let order = PricedOrder {
            total_amount: Some(d(999)),
            discount: Some(d(5)),
            lines: vec![line(100, Some(80), 2)],
        };
        assert_eq!(
            order_grand_total(&order, GrandTotalFallback::SubtractDiscount),
            d(999)
        );
        let totals = OrderTotals::compute(&order, GrandTotalFallback::SubtractDiscount);
        assert!(totals.server_total);
        assert_eq!(totals.subtotal, d(160));
    }

    #[test]
    fn test_grand_total_fallback_policies() {
        let order = PricedOrder {
            total_amount: None,
            discount: Some(d(10)),
            lines: vec![line(100, Some(80), 2)],
        };
        assert_eq!(
            order_grand_total(&order, GrandTotalFallback::SubtractDiscount),
            d(150)
        );
        assert_eq!(
            order_grand_total(&order, GrandTotalFallback::SubtotalOnly),
            d(160)
        );

        let big_coupon = PricedOrder {
            discount: Some(d(500)),
            ..order
        };
        assert_eq!(
            order_grand_total(&big_coupon, GrandTotalFallback::SubtractDiscount),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_derive_sale_price_from_discount() {
        assert_eq!(derive_sale_price_from_discount(d(200), d(25)), Some(cents(15000)));
        assert_eq!(derive_sale_price_from_discount(d(200), Decimal::ZERO), None);
        assert_eq!(derive_sale_price_from_discount(Decimal::ZERO, d(10)), None);
        // 9.99 * 0.85 = 8.4915
        assert_eq!(derive_sale_price_from_discount(cents(999), d(15)), Some(cents(849)));
        // 0.25 * 0.5 = 0.125 rounds half up
        assert_eq!(derive_sale_price_from_discount(cents(25), d(50)), Some(cents(13)));
        assert_eq!(derive_sale_price_from_discount(d(20), d(150)), Some(Decimal::ZERO));
    }

    #[test]
    fn test_derive_discount_from_sale_price() {
        assert_eq!(derive_discount_from_sale_price(d(200), Some(d(150))), 25);
        assert_eq!(derive_discount_from_sale_price(d(200), None), 0);
        assert_eq!(derive_discount_from_sale_price(d(200), Some(d(200))), 0);
        assert_eq!(derive_discount_from_sale_price(d(200), Some(d(250))), 0);
        // 1/3 off -> 33.33% -> 33
        assert_eq!(derive_discount_from_sale_price(d(3), Some(d(2))), 33);
        // 12.5% -> 13
        assert_eq!(derive_discount_from_sale_price(d(8), Some(d(7))), 13);
    }

    #[test]
    fn test_zero_discount_leaves_line_undiscounted() {
        let sale = derive_sale_price_from_discount(d(40), Decimal::ZERO);
        let l = PricedLine::new(Some(d(40)), sale, 1);
        assert!(!has_discount(&l));
    }

    #[test]
    fn test_discount_edit_seeded_from_product() {
        let edit = DiscountEdit::for_product(Some(d(200)), Some(d(150)));
        assert_eq!(edit.discount_percent(), d(25));
        assert!(edit.sale_price_locked());

        let edit = DiscountEdit::for_product(Some(d(200)), None);
        assert_eq!(edit.discount_percent(), Decimal::ZERO);
        assert!(!edit.sale_price_locked());
    }

    #[test]
    fn test_discount_edit_flow() {
        let mut edit = DiscountEdit::default();
        edit.set_price(Some(d(200)));
        assert_eq!(edit.sale_price(), None);

        edit.set_discount(d(25));
        assert_eq!(edit.sale_price(), Some(d(150)));

        // price change keeps the percent and re-derives the sale price
        edit.set_price(Some(d(100)));
        assert_eq!(edit.sale_price(), Some(d(75)));
        assert!(has_discount(&edit.priced_line()));

        edit.set_discount(Decimal::ZERO);
        assert_eq!(edit.sale_price(), None);
        assert!(!edit.sale_price_locked());

        edit.set_sale_price(Some(d(60)));
        assert_eq!(edit.discount_percent(), d(40));

        // a sale price at or above the base price keeps the previous percent
        edit.set_sale_price(Some(d(120)));
        assert_eq!(edit.discount_percent(), d(40));
        assert_eq!(edit.sale_price(), Some(d(120)));

        // clearing the sale price unlocks it and a later price edit keeps it clear
        edit.set_sale_price(Some(d(90)));
        assert_eq!(edit.discount_percent(), d(10));
        edit.set_sale_price(None);
        assert_eq!(edit.discount_percent(), Decimal::ZERO);
        assert!(!edit.sale_price_locked());
        edit.set_price(Some(d(100)));
        assert_eq!(edit.sale_price(), None);

        edit.set_sale_price(Some(d(80)));
        edit.set_sale_price(Some(Decimal::ZERO));
        assert_eq!(edit.discount_percent(), Decimal::ZERO);
        assert!(!has_discount(&edit.priced_line()));
    }

    #[test]
    fn test_grand_total_fallback_parsing() {
        assert_eq!(
            "subtotal_only".parse::<GrandTotalFallback>(),
            Ok(GrandTotalFallback::SubtotalOnly)
        );
        assert!("whatever".parse::<GrandTotalFallback>().is_err());
        assert_eq!(GrandTotalFallback::SubtractDiscount.to_string(), "subtract-discount");
    }
}
