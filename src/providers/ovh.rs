//! OVH DynHost provider.

use super::{dyndns_status, ensure_ok, render_url, UpdateProvider, UpdateStatus};
use crate::error::Result;
use async_trait::async_trait;
use std::net::IpAddr;

/// Default OVH DynHost update endpoint.
pub const DEFAULT_URL_TEMPLATE: &str =
    "http://www.ovh.com/nic/update?system=dyndns&hostname=SUBDOMAIN&myip=NEWIP";

/// OVH DynHost provider: GET with basic auth.
pub struct OvhProvider {
    client: reqwest::Client,
    url_template: String,
    username: String,
    password: String,
}

impl OvhProvider {
    /// Create a new OVH provider.
    pub fn new(
        client: reqwest::Client,
        url_template: String,
        username: String,
        password: String,
    ) -> Self {
        Self {
            client,
            url_template,
            username,
            password,
        }
    }
}

#[async_trait]
impl UpdateProvider for OvhProvider {
    fn name(&self) -> &'static str {
        "ovh"
    }

    async fn update(&self, name: &str, address: IpAddr) -> Result<UpdateStatus> {
        let url = render_url(self.name(), &self.url_template, name, address, None)?;

        tracing::debug!(subdomain = name, new_ip = %address, "calling OVH DynHost");

        let response = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        ensure_ok(self.name(), &response)?;

        // DynHost sometimes answers with an empty 200
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(UpdateStatus::Updated);
        }

        dyndns_status(self.name(), &text, address)
    }
}
