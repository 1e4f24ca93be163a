//! HTTP rule repository: fetches the four rule collections from a remote
//! pricing backend over its REST contract.
//!
//! Endpoints, relative to the configured base URL:
//! - `GET /api/v1/pricing/rules?template_id=&product_type=`
//! - `GET /api/v1/pricing/surcharges?...`
//! - `GET /api/v1/pricing/tiers?...`
//! - `GET /api/v1/pricing/thresholds?...`
//!
//! Any transport, status, or decode failure surfaces as a repository error so
//! the engine fails closed instead of pricing against a partial rule set.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;

use craftquote_core::config::BackendConfig;
use craftquote_core::domain::rules::{
    MaterialSurcharge, PricingRule, QuantityTier, RuleSet, SizeThreshold,
};
use craftquote_core::pricing::scope::ScopeKey;
use craftquote_core::repository::{RepositoryError, RuleRepository};

#[derive(Debug)]
pub struct HttpRuleRepository {
    client: Client,
    base_url: Url,
    api_token: Option<SecretString>,
}

impl HttpRuleRepository {
    pub fn new(
        base_url: &str,
        api_token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, RepositoryError> {
        let base_url = Url::parse(base_url).map_err(|error| RepositoryError::Decode {
            reason: format!("invalid backend base url `{base_url}`: {error}"),
        })?;
        let client = Client::builder().timeout(timeout).build().map_err(|error| {
            RepositoryError::Unavailable { reason: format!("failed to build http client: {error}") }
        })?;
        Ok(Self { client, base_url, api_token })
    }

    /// Build from the `[backend]` config section. `base_url` must be set.
    pub fn from_config(config: &BackendConfig) -> Result<Self, RepositoryError> {
        let base_url = config.base_url.as_deref().ok_or_else(|| RepositoryError::Decode {
            reason: "backend.base_url is not configured".to_string(),
        })?;
        Self::new(
            base_url,
            config.api_token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn endpoint(&self, path: &str, scope: &ScopeKey) -> Result<Url, RepositoryError> {
        let mut url = self.base_url.join(path).map_err(|error| RepositoryError::Decode {
            reason: format!("invalid endpoint path `{path}`: {error}"),
        })?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(template_id) = &scope.template_id {
                query.append_pair("template_id", &template_id.0);
            }
            if let Some(product_type) = scope.product_type {
                query.append_pair("product_type", product_type.as_str());
            }
        }
        Ok(url)
    }

    async fn fetch<T>(&self, path: &str, scope: &ScopeKey) -> Result<Vec<T>, RepositoryError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path, scope)?;
        debug!(
            event_name = "pricing.client.fetch",
            endpoint = %url,
            "fetching rule collection"
        );

        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|error| {
            let reason = if error.is_timeout() {
                format!("request to {url} timed out")
            } else {
                format!("request to {url} failed: {error}")
            };
            RepositoryError::Unavailable { reason }
        })?;

        match response.status() {
            StatusCode::OK => response.json::<Vec<T>>().await.map_err(|error| {
                RepositoryError::Decode {
                    reason: format!("invalid response body from {url}: {error}"),
                }
            }),
            status => Err(RepositoryError::Unavailable {
                reason: format!("backend returned {status} for {url}"),
            }),
        }
    }
}

#[async_trait]
impl RuleRepository for HttpRuleRepository {
    async fn get_applicable_rules(&self, scope: &ScopeKey) -> Result<RuleSet, RepositoryError> {
        let pricing_rules: Vec<PricingRule> =
            self.fetch("api/v1/pricing/rules", scope).await?;
        let material_surcharges: Vec<MaterialSurcharge> =
            self.fetch("api/v1/pricing/surcharges", scope).await?;
        let quantity_tiers: Vec<QuantityTier> =
            self.fetch("api/v1/pricing/tiers", scope).await?;
        let size_thresholds: Vec<SizeThreshold> =
            self.fetch("api/v1/pricing/thresholds", scope).await?;

        Ok(RuleSet { pricing_rules, material_surcharges, quantity_tiers, size_thresholds })
    }
}
