//! DDNS provider implementations.

pub mod duckdns;
pub mod google;
pub mod ovh;

#[cfg(test)]
mod tests;

pub use duckdns::DuckDnsProvider;
pub use google::GoogleProvider;
pub use ovh::OvhProvider;

use crate::config::ProviderSettings;
use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// How the provider acknowledged an accepted update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    /// The record now carries the new address.
    Updated,
    /// The record already carried the address (`nochg`).
    NoChange,
}

/// Trait for DDNS update providers.
///
/// One call issues exactly one update request. Retrying is left to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpdateProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &'static str;

    /// Point `name` at `address`.
    async fn update(&self, name: &str, address: IpAddr) -> Result<UpdateStatus>;
}

/// Create a provider from configuration.
///
/// `settings` carry resolved credentials, as produced by
/// [`Config::provider_configs`](crate::config::Config::provider_configs).
pub fn create_provider(
    settings: &ProviderSettings,
    client: reqwest::Client,
) -> Box<dyn UpdateProvider> {
    match settings {
        ProviderSettings::Ovh {
            url_template,
            username,
            password,
        } => Box::new(OvhProvider::new(
            client,
            url_template.clone(),
            username.clone(),
            password.clone(),
        )),
        ProviderSettings::Google {
            url_template,
            credentials,
        } => Box::new(GoogleProvider::new(
            client,
            url_template.clone(),
            credentials.clone(),
        )),
        ProviderSettings::DuckDns {
            url_template,
            token,
        } => Box::new(DuckDnsProvider::new(
            client,
            url_template.clone(),
            token.clone(),
        )),
    }
}

/// Substitute the template placeholders and parse the result.
fn render_url(
    provider: &str,
    template: &str,
    name: &str,
    address: IpAddr,
    token: Option<&str>,
) -> Result<reqwest::Url> {
    let mut url = template
        .replace("SUBDOMAIN", name)
        .replace("NEWIP", &address.to_string());
    if let Some(token) = token {
        url = url.replace("TOKEN", token);
    }

    reqwest::Url::parse(&url).map_err(|e| DdnsError::RequestBuild {
        provider: provider.to_string(),
        message: e.to_string(),
    })
}

/// Interpret a dyndns2-style answer (`good <ip>` / `nochg <ip>`).
///
/// The address following the keyword must be exactly `address`.
fn dyndns_status(provider: &str, body: &str, address: IpAddr) -> Result<UpdateStatus> {
    let tokens: Vec<&str> = body.split_whitespace().collect();

    for pair in tokens.windows(2) {
        let status = match pair[0] {
            "good" => UpdateStatus::Updated,
            "nochg" => UpdateStatus::NoChange,
            _ => continue,
        };
        if pair[1].parse::<IpAddr>().ok() == Some(address) {
            return Ok(status);
        }
    }

    Err(DdnsError::ResponseBody {
        provider: provider.to_string(),
        body: body.trim().to_string(),
    })
}

/// Reject anything but a 200.
fn ensure_ok(provider: &str, response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(DdnsError::UnexpectedStatus {
            provider: provider.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(())
}
