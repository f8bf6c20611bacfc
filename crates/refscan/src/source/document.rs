use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::REFERER;
use reqwest::{Client, RequestBuilder};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::extractor::ExtractorError;

/// A fetched page. `url` is the final URL after redirects and is what relative references in
/// `body` resolve against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub url: String,
    pub body: String,
}

impl Document {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<Document, ExtractorError>;

    /// Submits a form the way a page script does (`X-Requested-With: XMLHttpRequest`).
    async fn post_ajax(
        &self,
        url: &str,
        _form: &[(&str, &str)],
        _referer: Option<&str>,
    ) -> Result<Document, ExtractorError> {
        Err(ExtractorError::Other(format!(
            "form submission is not supported for {url}"
        )))
    }
}

/// Fetches documents over HTTP with a per-request timeout and optional retries.
#[derive(Debug, Clone)]
pub struct HttpDocumentSource {
    client: Client,
    timeout: Duration,
    retries: u32,
}

impl HttpDocumentSource {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            retries: 0,
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn execute(&self, request: RequestBuilder, url: &str) -> Result<Document, ExtractorError> {
        let response = timeout(self.timeout, request.send())
            .await
            .map_err(|_| ExtractorError::timeout(self.timeout))??;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractorError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let final_url = response.url().to_string();
        let body = timeout(self.timeout, response.text())
            .await
            .map_err(|_| ExtractorError::timeout(self.timeout))??;

        debug!("fetched {} ({} bytes)", final_url, body.len());
        Ok(Document::new(final_url, body))
    }

    async fn with_retries_for<F>(&self, url: &str, build: F) -> Result<Document, ExtractorError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            match self.execute(build(), url).await {
                Ok(document) => return Ok(document),
                Err(e) if attempt < self.retries => {
                    let delay = retry_delay(attempt);
                    warn!(
                        "request to {} failed (attempt {}): {}, retrying in {:?}",
                        url,
                        attempt + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Exponential backoff starting at one second. The exponent stops growing after 16 attempts.
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(1000 * (1u64 << attempt.min(16)))
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<Document, ExtractorError> {
        self.with_retries_for(url, || {
            let request = self.client.get(url);
            match referer {
                Some(referer) => request.header(REFERER, referer),
                None => request,
            }
        })
        .await
    }

    async fn post_ajax(
        &self,
        url: &str,
        form: &[(&str, &str)],
        referer: Option<&str>,
    ) -> Result<Document, ExtractorError> {
        self.with_retries_for(url, || {
            let request = self
                .client
                .post(url)
                .header("X-Requested-With", "XMLHttpRequest")
                .form(form);
            match referer {
                Some(referer) => request.header(REFERER, referer),
                None => request,
            }
        })
        .await
    }
}
