use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AffiliateConfig;

/// Outcome of a link conversion. `used_fallback` is set whenever the
/// original link is passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub affiliate_link: String,
    pub used_fallback: bool,
}

impl ResolvedLink {
    fn fallback(original_link: &str) -> Self {
        Self {
            affiliate_link: original_link.to_string(),
            used_fallback: true,
        }
    }
}

#[derive(Serialize)]
struct ConvertRequest<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ConvertResponse {
    affiliate_link: Option<String>,
}

/// Converts product links through an external affiliate endpoint.
/// Without an endpoint every link passes through unchanged.
pub struct AffiliateResolver {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl AffiliateResolver {
    pub fn new(config: &AffiliateConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build affiliate HTTP client")?;

        match &config.endpoint {
            Some(endpoint) => info!(
                "Affiliate resolver configured: url={}, timeout={}s",
                endpoint, config.timeout_secs
            ),
            None => warn!("No affiliate endpoint configured. Original links will be used."),
        }

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Single conversion attempt against the endpoint
    async fn convert(&self, endpoint: &str, original_link: &str) -> Result<String> {
        debug!("Requesting affiliate link for {}", original_link);

        let response = self
            .client
            .post(endpoint)
            .json(&ConvertRequest { url: original_link })
            .send()
            .await
            .context("Failed to call affiliate API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Affiliate API error ({}): {}", status, body);
        }

        let resp: ConvertResponse = response
            .json()
            .await
            .context("Failed to parse affiliate response")?;

        resp.affiliate_link
            .filter(|link| !link.trim().is_empty())
            .context("Affiliate response missing 'affiliate_link'")
    }

    /// Resolve a link, falling back to the original on any failure.
    /// Never returns an error: a post with the plain link beats no post.
    pub async fn resolve(&self, original_link: &str) -> ResolvedLink {
        let Some(endpoint) = self.endpoint.as_deref() else {
            debug!("No affiliate endpoint, using original link for {}", original_link);
            return ResolvedLink::fallback(original_link);
        };

        match self.convert(endpoint, original_link).await {
            Ok(affiliate_link) => {
                info!("Generated affiliate link for {}", original_link);
                ResolvedLink {
                    affiliate_link,
                    used_fallback: false,
                }
            }
            Err(e) => {
                warn!(
                    "Affiliate conversion failed for {}: {:#}. Using original link.",
                    original_link, e
                );
                ResolvedLink::fallback(original_link)
            }
        }
    }
}
