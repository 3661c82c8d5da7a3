//! DuckDNS provider.

use super::{ensure_ok, render_url, UpdateProvider, UpdateStatus};
use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use std::net::IpAddr;

/// Default DuckDNS update endpoint.
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://www.duckdns.org/update?domains=SUBDOMAIN&token=TOKEN&ip=NEWIP";

/// DuckDNS provider.
pub struct DuckDnsProvider {
    client: reqwest::Client,
    url_template: String,
    token: String,
}

impl DuckDnsProvider {
    /// Create a new DuckDNS provider.
    pub fn new(client: reqwest::Client, url_template: String, token: String) -> Self {
        Self {
            client,
            url_template,
            token,
        }
    }
}

#[async_trait]
impl UpdateProvider for DuckDnsProvider {
    fn name(&self) -> &'static str {
        "duckdns"
    }

    async fn update(&self, name: &str, address: IpAddr) -> Result<UpdateStatus> {
        let url = render_url(
            self.name(),
            &self.url_template,
            name,
            address,
            Some(&self.token),
        )?;

        tracing::debug!(subdomain = name, new_ip = %address, "calling DuckDNS");

        let response = self.client.get(url).send().await?;
        ensure_ok(self.name(), &response)?;

        let text = response.text().await?;
        if text.trim() == "OK" {
            Ok(UpdateStatus::Updated)
        } else {
            Err(DdnsError::ResponseBody {
                provider: self.name().to_string(),
                body: text.trim().to_string(),
            })
        }
    }
}
