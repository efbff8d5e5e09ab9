use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use url::form_urlencoded;

use crate::config::PrimarySection;

use super::{SourceError, StructuredResponse, StructuredSource};

/// Structured source reached over HTTP, one endpoint template per version hint.
#[derive(Debug, Clone)]
pub struct HttpStructuredSource {
    client: Client,
    endpoints: BTreeMap<String, String>,
}

impl HttpStructuredSource {
    pub fn new(config: &PrimarySection) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            endpoints: config.endpoints.clone(),
        })
    }

    pub fn endpoint_for(&self, page_url: &str, version: &str) -> Result<String, SourceError> {
        let template = self
            .endpoints
            .get(version)
            .ok_or_else(|| SourceError::UnknownVersion(version.to_string()))?;
        let encoded: String = form_urlencoded::byte_serialize(page_url.as_bytes()).collect();
        let endpoint = template.replace("{url}", &encoded);
        url::Url::parse(&endpoint).map_err(|err| SourceError::Endpoint(format!("{endpoint}: {err}")))?;
        Ok(endpoint)
    }
}

#[async_trait]
impl StructuredSource for HttpStructuredSource {
    async fn fetch(
        &self,
        page_url: &str,
        version: &str,
    ) -> Result<StructuredResponse, SourceError> {
        let endpoint = self.endpoint_for(page_url, version)?;
        let response = self.client.get(&endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        Ok(response.json::<StructuredResponse>().await?)
    }
}
