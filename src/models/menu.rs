use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

use super::PRICE_DECIMAL_PLACES;

/// A dish on the restaurant menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub title: String,
    #[serde(serialize_with = "serialize_price")]
    pub price: Decimal,
    pub inventory: i32,
}

/// Request body for creating or fully replacing a menu item.
///
/// `price` accepts either a JSON number or a decimal string. Any `id` in the
/// body is ignored; identifiers are assigned by storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItemPayload {
    pub title: String,
    pub price: Decimal,
    pub inventory: i32,
}

impl MenuItem {
    pub fn from_payload(id: i64, payload: MenuItemPayload) -> Self {
        Self {
            id,
            title: payload.title,
            price: normalize_price(payload.price),
            inventory: payload.inventory,
        }
    }
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Bring a price to the stored two-digit scale
pub fn normalize_price(price: Decimal) -> Decimal {
    let mut price = price;
    price.rescale(PRICE_DECIMAL_PLACES);
    price
}

/// Prices go over the wire as strings with exactly two fractional digits
pub fn format_price(price: &Decimal) -> String {
    normalize_price(*price).to_string()
}

fn serialize_price<S>(price: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_price(price))
}
