use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Amazon,
    Flipkart,
    Blinkit,
    Zepto,
    Instamart,
    Desidime,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Amazon,
        Platform::Flipkart,
        Platform::Blinkit,
        Platform::Zepto,
        Platform::Instamart,
        Platform::Desidime,
    ];

    /// Pick the platform for a product URL by case-insensitive substring match.
    /// Returns None for sites we have no fetcher for.
    pub fn detect(url: &str) -> Option<Platform> {
        let url = url.to_lowercase();
        Platform::ALL
            .into_iter()
            .find(|p| url.contains(p.as_str()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Amazon => "amazon",
            Platform::Flipkart => "flipkart",
            Platform::Blinkit => "blinkit",
            Platform::Zepto => "zepto",
            Platform::Instamart => "instamart",
            Platform::Desidime => "desidime",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown platform: {s}"))
    }
}

// ---------------------------------------------------------------------------
// Catalog + observation log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub url: String,
    pub platform: Platform,
    /// Nanosecond UTC epoch timestamp.
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceObservation {
    pub product_id: String,
    pub price: Decimal,
    pub currency: String,
    /// Nanosecond UTC epoch timestamp.
    pub observed_at: i64,
}

/// Audit row written only when a new-low alert was delivered.
/// `new_price` always equals the observation price that triggered it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRecord {
    pub product_id: String,
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub currency: String,
    pub message: String,
    pub sent_at: i64,
}

/// A price as returned by a fetcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub price: Decimal,
    pub currency: String,
}

// ---------------------------------------------------------------------------
// Price helpers
// ---------------------------------------------------------------------------

/// Prices are tracked at two decimal places, like the DECIMAL(10,2) columns
/// they originally lived in.
pub const PRICE_SCALE: u32 = 2;

pub fn normalize_price(price: Decimal) -> Decimal {
    price.round_dp(PRICE_SCALE)
}

/// Decimal → integer minor units (paise, cents). Stored this way so SQLite
/// can compute MIN exactly. None when the price does not fit in an i64.
pub fn to_minor_units(price: Decimal) -> Option<i64> {
    normalize_price(price)
        .checked_mul(Decimal::ONE_HUNDRED)?
        .to_i64()
}

pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, PRICE_SCALE)
}

pub fn now_ns() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn detects_platform_from_url() {
        assert_eq!(
            Platform::detect("https://www.amazon.in/dp/B0CHX1W1XY"),
            Some(Platform::Amazon)
        );
        assert_eq!(
            Platform::detect("https://WWW.FLIPKART.COM/apple-iphone/p/itm123"),
            Some(Platform::Flipkart)
        );
        assert_eq!(
            Platform::detect("https://blinkit.com/prn/amul-butter/prid/1"),
            Some(Platform::Blinkit)
        );
        assert_eq!(
            Platform::detect("https://www.swiggy.com/instamart/item/abc"),
            Some(Platform::Instamart)
        );
        assert_eq!(Platform::detect("https://www.zeptonow.com/pn/x"), Some(Platform::Zepto));
        assert_eq!(Platform::detect("https://www.desidime.com/deals/x"), Some(Platform::Desidime));
        assert_eq!(Platform::detect("https://example.com/product/1"), None);
    }

    #[test]
    fn platform_name_round_trips_through_from_str() {
        for p in Platform::ALL {
            assert_eq!(Platform::from_str(&p.to_string()).unwrap(), p);
        }
        assert!(Platform::from_str("ebay").is_err());
    }

    #[test]
    fn minor_units_are_exact_at_two_places() {
        let price = Decimal::from_str("1999.99").unwrap();
        assert_eq!(to_minor_units(price), Some(199_999));
        assert_eq!(from_minor_units(199_999), price);
        // 999 and 999.00 compare equal once normalised
        assert_eq!(from_minor_units(99_900), Decimal::from(999));
    }

    #[test]
    fn oversized_prices_have_no_minor_units() {
        assert_eq!(to_minor_units(Decimal::MAX), None);
        // Parses fine from page text, but overflows once scaled to paise.
        let huge = Decimal::from_str("999999999999999999999999999").unwrap();
        assert_eq!(to_minor_units(huge), None);
        // Fits in a Decimal after scaling, but not in an i64.
        assert_eq!(to_minor_units(Decimal::from(i64::MAX)), None);
    }
}
