//! Google Domains dynamic DNS provider.

use super::{dyndns_status, ensure_ok, render_url, UpdateProvider, UpdateStatus};
use crate::error::Result;
use async_trait::async_trait;
use std::net::IpAddr;

/// Default Google dynamic DNS endpoint.
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://domains.google.com/nic/update?hostname=SUBDOMAIN&myip=NEWIP";

/// Google provider: POST, basic auth only when credentials are configured
/// (they may also be embedded in the URL template).
pub struct GoogleProvider {
    client: reqwest::Client,
    url_template: String,
    credentials: Option<(String, String)>,
}

impl GoogleProvider {
    /// Create a new Google provider.
    pub fn new(
        client: reqwest::Client,
        url_template: String,
        credentials: Option<(String, String)>,
    ) -> Self {
        Self {
            client,
            url_template,
            credentials,
        }
    }
}

#[async_trait]
impl UpdateProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn update(&self, name: &str, address: IpAddr) -> Result<UpdateStatus> {
        let url = render_url(self.name(), &self.url_template, name, address, None)?;

        let mut request = self.client.post(url);
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, Some(password));
        }

        tracing::debug!(subdomain = name, new_ip = %address, "calling Google dynamic DNS");

        let response = request.send().await?;
        ensure_ok(self.name(), &response)?;

        let text = response.text().await?;
        dyndns_status(self.name(), &text, address)
    }
}
