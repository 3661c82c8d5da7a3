//! Public address detection and name resolution.

use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr};

/// Source of the two addresses a reconcile pass compares.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Current public address of this host. Never cached.
    async fn public_address(&self) -> Result<IpAddr>;

    /// Address `name` currently resolves to.
    async fn resolve_name(&self, name: &str) -> Result<IpAddr>;
}

/// Resolver backed by an HTTP address-reporting service and the system resolver.
pub struct HttpResolver {
    client: reqwest::Client,
    web_ip: String,
}

impl HttpResolver {
    /// Create a resolver querying `web_ip` for the public address.
    pub fn new(client: reqwest::Client, web_ip: String) -> Self {
        Self { client, web_ip }
    }

    /// The address-reporting endpoint.
    pub fn endpoint(&self) -> &str {
        &self.web_ip
    }
}

#[async_trait]
impl AddressResolver for HttpResolver {
    async fn public_address(&self) -> Result<IpAddr> {
        let response = self.client.get(&self.web_ip).send().await?;

        if !response.status().is_success() {
            return Err(DdnsError::Network(format!(
                "HTTP {} from {}",
                response.status(),
                self.web_ip
            )));
        }

        let text = response.text().await?;
        let ip = parse_address(text.trim())
            .map_err(|_| DdnsError::Parse(format!("Invalid IP response: {}", text.trim())))?;

        tracing::debug!(public_ip = %ip, service = %self.web_ip, "detected public address");
        Ok(ip)
    }

    async fn resolve_name(&self, name: &str) -> Result<IpAddr> {
        let addrs = tokio::net::lookup_host((name, 0))
            .await
            .map_err(|e| DdnsError::Lookup {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        single_address(name, addrs)
    }
}

/// Reduce lookup results to exactly one distinct address.
///
/// Zero or several distinct addresses is an error: picking one would hide an
/// inconsistent record set.
pub fn single_address<I>(name: &str, addrs: I) -> Result<IpAddr>
where
    I: IntoIterator<Item = SocketAddr>,
{
    let distinct: BTreeSet<IpAddr> = addrs.into_iter().map(|addr| addr.ip()).collect();

    let mut iter = distinct.iter();
    match (iter.next(), iter.next()) {
        (Some(ip), None) => Ok(*ip),
        _ => Err(DdnsError::Lookup {
            name: name.to_string(),
            message: format!("expected exactly 1 address, found {}", distinct.len()),
        }),
    }
}

/// Parse an address, splitting off a port if one is attached.
pub fn parse_address(raw: &str) -> Result<IpAddr> {
    if let Ok(ip) = raw.parse::<IpAddr>() {
        return Ok(ip);
    }

    raw.parse::<SocketAddr>()
        .map(|addr| addr.ip())
        .map_err(|_| DdnsError::Split(raw.to_string()))
}
