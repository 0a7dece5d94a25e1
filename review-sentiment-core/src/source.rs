use {
    std::{sync::Arc, time::Duration},
    async_trait::async_trait,
    once_cell::sync::Lazy,
    regex::Regex,
    reqwest::StatusCode,
    tracing::debug,
    url::Url,
    crate::{
        config::SourceConfig,
        error::SourceError,
        models::ReviewPage,
    },
};

static PRODUCT_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"/ip/(?:[^/]+/)?(\d+)").unwrap_or_else(|err| panic!("{}", err)));

#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn fetch_page(&self, product_id: &str, page: u32) -> Result<ReviewPage, SourceError>;
}

#[async_trait]
impl<S: ReviewSource + ?Sized> ReviewSource for Arc<S> {
    async fn fetch_page(&self, product_id: &str, page: u32) -> Result<ReviewPage, SourceError> {
        (**self).fetch_page(product_id, page).await
    }
}

/// Review source behind a scraping proxy that serves review pages as json.
pub struct HttpReviewSource {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpReviewSource {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs()))
            .build()?;

        Ok(Self {
            endpoint: config.endpoint().trim_end_matches('/').to_owned(),
            api_key: config.api_key().cloned(),
            client,
        })
    }

    fn page_url(&self, product_id: &str, page: u32) -> String {
        format!("{}/reviews/{}?page={}&sort=submission-desc", self.endpoint, product_id, page)
    }
}

#[async_trait]
impl ReviewSource for HttpReviewSource {
    async fn fetch_page(&self, product_id: &str, page: u32) -> Result<ReviewPage, SourceError> {
        let url = self.page_url(product_id, page);
        debug!("fetching review page: {}", url);

        let mut request = self.client.get(&url);
        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let res = request.send().await?;
        if res.status() != StatusCode::OK {
            return Err(SourceError::Status(res.status().as_u16()));
        }

        let body = res.text().await?;
        serde_json::from_str(&body).map_err(|err| SourceError::Malformed(err.to_string()))
    }
}

/// Accepts either a bare numeric product id or a product page url (`/ip/<slug>/<id>`).
pub fn product_id_from_url(product: &str) -> Option<String> {
    let product = product.trim();
    if !product.is_empty() && product.chars().all(|c| c.is_ascii_digit()) {
        return Some(product.to_owned());
    }

    let url = Url::parse(product).ok()?;
    PRODUCT_PATH_PATTERN.captures(url.path().trim_end_matches('/'))
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_from_product_url() {
        assert_eq!(product_id_from_url("https://www.walmart.com/ip/Some-Blender/5251143774?classType=REGULAR"), Some("5251143774".to_owned()));
        assert_eq!(product_id_from_url("https://www.walmart.com/ip/5251143774/"), Some("5251143774".to_owned()));
        assert_eq!(product_id_from_url("5251143774"), Some("5251143774".to_owned()));
    }

    #[test]
    fn product_id_missing() {
        assert_eq!(product_id_from_url("https://www.walmart.com/browse/kitchen"), None);
        assert_eq!(product_id_from_url("not a url"), None);
        assert_eq!(product_id_from_url(""), None);
    }

    #[test]
    fn page_url_layout() {
        let source = HttpReviewSource::new(&SourceConfig::default()).unwrap();
        let url = source.page_url("123", 4);
        assert!(url.ends_with("/reviews/123?page=4&sort=submission-desc"));
        assert!(!url.contains("//reviews"));
    }
}
