use crate::db::models::FeedProduct;
use crate::error::CatalogError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Source of feed pages. Callers own the cursor; implementations keep no state between calls.
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch_page(&self, offset: u64) -> Result<Vec<FeedProduct>, CatalogError>;
}

#[derive(Debug, Deserialize)]
struct ProductPage {
    products: Vec<FeedProduct>,
}

/// dummyjson-compatible product feed:
/// `GET {base}/products?limit={page_size}&skip={offset}&select=title,category`.
#[derive(Clone)]
pub struct DummyJsonClient {
    client: reqwest::Client,
    base_url: Url,
    page_size: u64,
}

impl DummyJsonClient {
    pub fn new(base_url: Url, page_size: u64, timeout: Duration) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("storefront-catalog/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url,
            page_size,
        })
    }

    fn page_url(&self, offset: u64) -> Result<Url, CatalogError> {
        let mut url = self.base_url.join("products")?;
        url.query_pairs_mut()
            .append_pair("limit", &self.page_size.to_string())
            .append_pair("skip", &offset.to_string())
            .append_pair("select", "title,category");
        Ok(url)
    }
}

#[async_trait]
impl FeedClient for DummyJsonClient {
    async fn fetch_page(&self, offset: u64) -> Result<Vec<FeedProduct>, CatalogError> {
        let url = self.page_url(offset)?;
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogError::FeedStatus(status));
        }
        let body = resp.bytes().await?;
        let page: ProductPage = serde_json::from_slice(&body)?;
        debug!(offset, count = page.products.len(), "feed page fetched");
        Ok(page.products)
    }
}
