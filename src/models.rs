//! Admin dashboard entities as the API returns them.
//!
//! All types deserialize through `serde_json::Value` so that the API's loose
//! typing (numeric strings, 0/1 flags, JSON-encoded arrays) never turns a
//! whole page into a decode error.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::pricing::{self, DiscountEdit, GrandTotalFallback, OrderTotals, PricedLine, PricedOrder};
use crate::{value_bool, value_decimal, value_id, value_str, value_u64};

/// A string list stored either as a JSON array or as a JSON-encoded string.
/// Anything unparsable reads as empty.
fn string_list(v: &Value, key: &str) -> Vec<String> {
    let parsed = match v.get(key) {
        Some(Value::Array(items)) => Value::Array(items.clone()),
        Some(Value::String(s)) => serde_json::from_str::<Value>(s).unwrap_or(Value::Null),
        _ => Value::Null,
    };
    parsed
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category_id: Option<String>,
    #[serde(rename = "type")]
    pub product_type: String,
    pub price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub status: String,
    pub is_featured: bool,
    pub is_available: bool,
    pub featured_image: Option<String>,
    pub gallery_images: Vec<String>,
    pub ingredients: Vec<String>,
    pub spice_level: Option<String>,
    pub preparation_time: Option<u64>,
    pub average_rating: Decimal,
}

impl From<Value> for Product {
    fn from(v: Value) -> Self {
        Self {
            id: value_id(&v, &["id"]).unwrap_or_default(),
            name: value_str(&v, &["name"]).unwrap_or_default(),
            slug: value_str(&v, &["slug"]).unwrap_or_default(),
            description: value_str(&v, &["description"]).unwrap_or_default(),
            category_id: value_id(&v, &["category_id"]),
            product_type: value_str(&v, &["type"]).unwrap_or_default(),
            price: value_decimal(&v, &["price"]),
            sale_price: value_decimal(&v, &["sale_price"]),
            status: value_str(&v, &["status"]).unwrap_or_else(|| "active".to_string()),
            is_featured: value_bool(&v, &["is_featured"]).unwrap_or(false),
            is_available: value_bool(&v, &["is_available"]).unwrap_or(true),
            featured_image: value_str(&v, &["featured_image"]),
            gallery_images: string_list(&v, "gallery_images"),
            ingredients: string_list(&v, "ingredients"),
            spice_level: value_str(&v, &["spice_level"]),
            preparation_time: value_u64(&v, &["preparation_time"]),
            average_rating: value_decimal(&v, &["average_rating"]).unwrap_or(Decimal::ZERO),
        }
    }
}

impl Product {
    /// The product as a single-unit line, for list cards.
    pub fn priced_line(&self) -> PricedLine {
        PricedLine::new(self.price, self.sale_price, 1)
    }

    pub fn has_discount(&self) -> bool {
        pricing::has_discount(&self.priced_line())
    }

    pub fn display_price(&self) -> Decimal {
        pricing::effective_unit_price(&self.priced_line())
    }

    /// Editor state seeded from this product's prices.
    pub fn discount_edit(&self) -> DiscountEdit {
        DiscountEdit::for_product(self.price, self.sale_price)
    }

    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub status: String,
}

impl From<Value> for Category {
    fn from(v: Value) -> Self {
        Self {
            id: value_id(&v, &["id"]).unwrap_or_default(),
            name: value_str(&v, &["name"]).unwrap_or_else(|| "Untitled".to_string()),
            image: value_str(&v, &["image"]),
            status: value_str(&v, &["status"]).unwrap_or_else(|| "Active".to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::Preparing => "Preparing",
            Self::Ready => "Ready",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Other(s) => s,
        }
    }

    /// Delivered and cancelled orders take no further transitions.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl From<&str> for OrderStatus {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "preparing" => Self::Preparing,
            "ready" => Self::Ready,
            "delivered" => Self::Delivered,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Other(raw.trim().to_string()),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct OrderLine {
    pub product_id: Option<String>,
    pub name: String,
    pub unit_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub quantity: u32,
}

impl From<Value> for OrderLine {
    fn from(v: Value) -> Self {
        let priced = PricedLine::from_value(&v);
        Self {
            product_id: value_id(&v, &["product_id", "id"]),
            name: value_str(&v, &["name", "product_name", "title"])
                .unwrap_or_else(|| "Item".to_string()),
            unit_price: priced.unit_price,
            sale_price: priced.sale_price,
            quantity: priced.quantity,
        }
    }
}

impl OrderLine {
    pub fn priced_line(&self) -> PricedLine {
        PricedLine::new(self.unit_price, self.sale_price, self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Order {
    pub id: String,
    pub customer: String,
    pub status: OrderStatus,
    pub total_amount: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub lines: Vec<OrderLine>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub created_at: Option<String>,
}

impl From<Value> for Order {
    fn from(v: Value) -> Self {
        let lines = ["products", "items"]
            .iter()
            .find_map(|key| v.get(*key).and_then(Value::as_array))
            .map(|rows| rows.iter().cloned().map(OrderLine::from).collect())
            .unwrap_or_default();
        let customer = value_str(&v, &["customer_name", "customer"])
            .or_else(|| v.get("user").and_then(|u| value_str(u, &["name"])))
            .unwrap_or_default();
        Self {
            id: value_id(&v, &["id", "order_id"]).unwrap_or_default(),
            customer,
            status: value_str(&v, &["status"])
                .map(OrderStatus::from)
                .unwrap_or(OrderStatus::Pending),
            total_amount: value_decimal(&v, &["total_amount"]),
            discount: value_decimal(&v, &["discount", "discount_amount"]),
            lines,
            address: value_str(&v, &["address", "delivery_address"]),
            phone: value_str(&v, &["phone"]),
            created_at: value_str(&v, &["created_at", "date"]),
        }
    }
}

impl Order {
    pub fn priced_lines(&self) -> Vec<PricedLine> {
        self.lines.iter().map(OrderLine::priced_line).collect()
    }

    pub fn priced_order(&self) -> PricedOrder {
        PricedOrder {
            total_amount: self.total_amount,
            discount: self.discount,
            lines: self.priced_lines(),
        }
    }

    pub fn totals(&self, fallback: GrandTotalFallback) -> OrderTotals {
        OrderTotals::compute(&self.priced_order(), fallback)
    }

    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| l.quantity as u64).sum()
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: String,
    pub orders: u64,
    pub total_spent: Decimal,
}

impl From<Value> for User {
    fn from(v: Value) -> Self {
        Self {
            id: value_id(&v, &["id"]).unwrap_or_default(),
            name: value_str(&v, &["name"]).unwrap_or_default(),
            email: value_str(&v, &["email"]),
            phone: value_str(&v, &["phone"]),
            status: value_str(&v, &["status"]).unwrap_or_else(|| "Active".to_string()),
            orders: value_u64(&v, &["orders", "orders_count"]).unwrap_or(0),
            total_spent: value_decimal(&v, &["totalSpent", "total_spent"]).unwrap_or(Decimal::ZERO),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_from_loose_json() {
        let product: Product = serde_json::from_value(json!({
            "id": 12,
            "name": "Margherita",
            "slug": "margherita",
            "category_id": "3",
            "type": "recommendedForYouSection",
            "price": "200.00",
            "sale_price": 150,
            "is_featured": 1,
            "is_available": "0",
            "ingredients": "[\"tomato\", \"basil\", \"\"]",
            "gallery_images": ["a.jpg", "b.jpg"],
            "preparation_time": "20",
            "average_rating": 4.5
        }))
        .expect("product decodes");

        assert_eq!(product.id, "12");
        assert_eq!(product.category_id.as_deref(), Some("3"));
        assert!(product.is_featured);
        assert!(!product.is_available);
        assert!(product.is_active());
        assert_eq!(product.ingredients, vec!["tomato", "basil"]);
        assert_eq!(product.gallery_images.len(), 2);
        assert_eq!(product.preparation_time, Some(20));
        assert!(product.has_discount());
        assert_eq!(product.display_price(), Decimal::from(150));
        assert_eq!(product.discount_edit().discount_percent(), Decimal::from(25));
    }

    #[test]
    fn test_product_with_broken_ingredient_json() {
        let product = Product::from(json!({ "id": "p1", "ingredients": "[oops" }));
        assert!(product.ingredients.is_empty());
        assert_eq!(product.price, None);
        assert_eq!(product.display_price(), Decimal::ZERO);
    }

    #[test]
    fn test_order_totals_from_api_json() {
        let order: Order = serde_json::from_value(json!({
            "id": 1001,
            "customer_name": "John Doe",
            "status": "preparing",
            "discount": "5",
            "products": [
                { "product_id": 1, "name": "Burger", "unit_price": 100, "sale_price": 80, "quantity": 2 },
                { "product_id": 2, "name": "Fries", "price": "15.50", "quantity": 1 }
            ]
        }))
        .expect("order decodes");

        assert_eq!(order.status, OrderStatus::Preparing);
        assert_eq!(order.item_count(), 3);
        let totals = order.totals(GrandTotalFallback::SubtractDiscount);
        assert_eq!(totals.subtotal, Decimal::new(17550, 2));
        assert_eq!(totals.savings, Decimal::from(40));
        assert_eq!(totals.grand_total, Decimal::new(17050, 2));
        assert!(!totals.server_total);
    }

    #[test]
    fn test_order_prefers_server_total() {
        let order = Order::from(json!({
            "id": "A-7",
            "total_amount": 42,
            "items": [{ "price": 100, "quantity": 1 }],
            "user": { "name": "Jane Smith" }
        }));
        assert_eq!(order.customer, "Jane Smith");
        let totals = order.totals(GrandTotalFallback::SubtractDiscount);
        assert_eq!(totals.grand_total, Decimal::from(42));
        assert!(totals.server_total);
    }

    #[test]
    fn test_order_status_round_trip_and_unknown_values() {
        assert_eq!(OrderStatus::from("Canceled"), OrderStatus::Cancelled);
        assert!(OrderStatus::Delivered.is_final());
        let custom = OrderStatus::from("Out for delivery");
        assert_eq!(custom.as_str(), "Out for delivery");
        assert!(!custom.is_final());
        assert_eq!(
            serde_json::to_value(OrderStatus::Ready).unwrap(),
            json!("Ready")
        );
    }

    #[test]
    fn test_category_and_user_defaults() {
        let cat = Category::from(json!({ "id": 4 }));
        assert_eq!(cat.name, "Untitled");
        assert_eq!(cat.status, "Active");

        let user = User::from(json!({ "id": 1, "name": "John Doe", "orders": 15, "totalSpent": 234.5 }));
        assert_eq!(user.orders, 15);
        assert_eq!(user.total_spent, Decimal::new(2345, 1));
    }
}
