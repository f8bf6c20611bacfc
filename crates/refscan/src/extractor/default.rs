use reqwest::Client;
use rustls::{ClientConfig, crypto::ring};
use rustls_platform_verifier::BuilderVerifierExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::error::ExtractorError;

pub const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

pub fn default_client() -> Result<Client, ExtractorError> {
    create_client(None, DEFAULT_TIMEOUT, DEFAULT_UA)
}

/// Builds the shared HTTP client. The client is immutable once built and is cloned into every
/// worker.
pub fn create_client(
    proxy_config: Option<ProxyConfig>,
    timeout: Duration,
    user_agent: &str,
) -> Result<Client, ExtractorError> {
    let provider = Arc::new(ring::default_provider());
    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ExtractorError::Other(format!("tls protocol versions: {e}")))?
        .with_platform_verifier()
        .map_err(|e| ExtractorError::Other(format!("tls verifier: {e}")))?
        .with_no_client_auth();

    let mut builder = Client::builder()
        .use_preconfigured_tls(tls_config)
        .user_agent(user_agent)
        .timeout(timeout);

    if let Some(config) = proxy_config {
        match reqwest::Proxy::all(&config.url) {
            Ok(mut proxy) => {
                if let (Some(username), Some(password)) = (config.username, config.password) {
                    proxy = proxy.basic_auth(&username, &password);
                }
                builder = builder.proxy(proxy);
            }
            Err(e) => {
                warn!("Failed to configure proxy '{}': {}", config.url, e);
            }
        }
    }

    Ok(builder.build()?)
}
