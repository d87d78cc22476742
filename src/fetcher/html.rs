use std::str::FromStr;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{Html, Selector};
use tracing::debug;

use crate::error::FetchError;
use crate::fetcher::PriceFetcher;
use crate::types::{normalize_price, Platform, Quote};

/// Scrapes the price off a product page using per-platform CSS selectors.
pub struct HtmlPriceFetcher {
    platform: Platform,
    client: reqwest::Client,
    currency: String,
}

impl HtmlPriceFetcher {
    pub fn new(platform: Platform, client: reqwest::Client, currency: String) -> Self {
        Self { platform, client, currency }
    }
}

#[async_trait]
impl PriceFetcher for HtmlPriceFetcher {
    async fn fetch_price(&self, url: &str) -> Result<Quote, FetchError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::NetworkFailed(format!("HTTP {status} from {url}")));
        }
        let body = resp.text().await?;
        debug!(platform = %self.platform, url, bytes = body.len(), "page downloaded");

        // Html is !Send; parse only after the last await.
        let price = parse_price(self.platform, &body)?;
        Ok(Quote { price, currency: self.currency.clone() })
    }

    fn platform(&self) -> Platform {
        self.platform
    }
}

/// Selectors tried in order; the first element with a usable price wins.
pub fn selectors_for(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::Amazon => &[
            "#corePriceDisplay_desktop_feature_div .a-price-whole",
            ".a-price .a-offscreen",
        ],
        Platform::Flipkart => &["div.Nx9bqj.CxhGGd", "div.Nx9bqj"],
        Platform::Blinkit | Platform::Zepto | Platform::Instamart => &["span[data-testid='price']"],
        Platform::Desidime => &["span.deal-price"],
    }
}

pub fn parse_price(platform: Platform, html: &str) -> Result<Decimal, FetchError> {
    let doc = Html::parse_document(html);
    let mut last_failure: Option<FetchError> = None;

    for selector_str in selectors_for(platform) {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for element in doc.select(&selector) {
            let text: String = element.text().collect();
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            match extract_price_from_text(text) {
                Ok(price) if price > Decimal::ZERO => return Ok(normalize_price(price)),
                Ok(_) => {
                    last_failure =
                        Some(FetchError::NotFound(format!("zero price on {platform} page")));
                }
                Err(e) => last_failure = Some(e),
            }
        }
    }

    Err(last_failure
        .unwrap_or_else(|| FetchError::NotFound(format!("price not found on {platform} page"))))
}

fn price_regex() -> &'static Regex {
    static PRICE_RE: OnceLock<Regex> = OnceLock::new();
    PRICE_RE.get_or_init(|| {
        Regex::new(r"₹?\s*([0-9][0-9,]*(?:\.[0-9]{1,2})?)").expect("price pattern is valid")
    })
}

/// Pull the first price-looking number out of display text:
/// `₹1,999` → 1999, `₹10,99,999` → 1099999, `The price is ₹2,499 only` → 2499.
pub fn extract_price_from_text(text: &str) -> Result<Decimal, FetchError> {
    let caps = price_regex()
        .captures(text)
        .ok_or_else(|| FetchError::ParseFailed(format!("no price in text: {text:?}")))?;
    let digits = caps[1].replace(',', "");
    Decimal::from_str(&digits)
        .map_err(|e| FetchError::ParseFailed(format!("bad price {digits:?}: {e}")))
}
