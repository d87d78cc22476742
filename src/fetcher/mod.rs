pub mod html;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::USER_AGENT;
use crate::error::{AppError, FetchError, Result};
use crate::types::{Platform, Quote};

pub use html::HtmlPriceFetcher;

/// Retrieves the current price of one product page. One implementation per
/// platform. Implementations must bound their own network time; the monitor
/// waits on every fetch it starts.
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    async fn fetch_price(&self, url: &str) -> std::result::Result<Quote, FetchError>;

    fn platform(&self) -> Platform;
}

/// Platform → fetcher dispatch table.
#[derive(Clone, Default)]
pub struct FetcherSet {
    fetchers: HashMap<Platform, Arc<dyn PriceFetcher>>,
}

impl FetcherSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an HTML fetcher for every known platform, sharing one client.
    pub fn http(timeout: Duration, currency: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::from)?;

        let mut set = Self::new();
        for platform in Platform::ALL {
            set.register(Arc::new(HtmlPriceFetcher::new(
                platform,
                client.clone(),
                currency.to_string(),
            )));
        }
        Ok(set)
    }

    /// Later registrations for the same platform replace earlier ones.
    pub fn register(&mut self, fetcher: Arc<dyn PriceFetcher>) {
        self.fetchers.insert(fetcher.platform(), fetcher);
    }

    pub fn get(&self, platform: Platform) -> Result<Arc<dyn PriceFetcher>> {
        self.fetchers
            .get(&platform)
            .cloned()
            .ok_or_else(|| AppError::UnsupportedPlatform(platform.to_string()))
    }

    /// Resolve the platform for a new product URL. Rejects URLs no registered
    /// fetcher can handle, so bad products never reach a cycle.
    pub fn platform_for_url(&self, url: &str) -> Result<Platform> {
        let platform =
            Platform::detect(url).ok_or_else(|| AppError::UnsupportedPlatform(url.to_string()))?;
        if !self.fetchers.contains_key(&platform) {
            return Err(AppError::UnsupportedPlatform(url.to_string()));
        }
        Ok(platform)
    }

    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<Platform> = self.fetchers.keys().copied().collect();
        platforms.sort_by_key(|p| p.as_str());
        platforms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Platform);

    #[async_trait]
    impl PriceFetcher for Fixed {
        async fn fetch_price(&self, _url: &str) -> std::result::Result<Quote, FetchError> {
            Ok(Quote { price: 10.into(), currency: "INR".into() })
        }

        fn platform(&self) -> Platform {
            self.0
        }
    }

    #[test]
    fn http_set_covers_every_platform() {
        let set = FetcherSet::http(Duration::from_secs(5), "INR").unwrap();
        assert_eq!(set.platforms().len(), Platform::ALL.len());
        for p in Platform::ALL {
            assert_eq!(set.get(p).unwrap().platform(), p);
        }
    }

    #[test]
    fn unregistered_platform_is_a_config_error() {
        let mut set = FetcherSet::new();
        set.register(Arc::new(Fixed(Platform::Amazon)));

        assert!(set.get(Platform::Amazon).is_ok());
        assert!(matches!(set.get(Platform::Zepto), Err(AppError::UnsupportedPlatform(_))));
        assert!(matches!(
            set.platform_for_url("https://www.zeptonow.com/pn/milk"),
            Err(AppError::UnsupportedPlatform(_))
        ));
        assert!(matches!(
            set.platform_for_url("https://shop.example.com/item/1"),
            Err(AppError::UnsupportedPlatform(_))
        ));
        assert_eq!(
            set.platform_for_url("https://www.amazon.in/dp/B0").unwrap(),
            Platform::Amazon
        );
    }
}
