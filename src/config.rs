//! Configuration management for ddns-watch.

use crate::error::{DdnsError, Result};
use crate::providers::{duckdns, google, ovh};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_UPDATE_TIME_SECS: u64 = 180;
const DEFAULT_PROPAGATION_SECS: u64 = 180;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Default address-reporting endpoint.
pub const DEFAULT_WEB_IP: &str = "http://dynamicdns.park-your-domain.com/getip";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Seconds between two reconcile passes (0 means default: 180).
    #[serde(default = "default_update_time")]
    pub update_time: u64,

    /// Seconds a freshly updated name is left alone (0 means default: 180).
    #[serde(default = "default_propagation")]
    pub pending_dns_propagation: u64,

    /// Endpoint answering with the caller's public address as plain text.
    #[serde(default = "default_web_ip")]
    pub web_ip: String,

    /// Per-request timeout of the HTTP client, in seconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout: u64,

    /// Log output settings.
    #[serde(default)]
    pub logger: LoggerConfig,

    /// Configured watchers, one per provider.
    #[serde(default)]
    pub watchers: Vec<WatcherConfig>,
}

fn default_update_time() -> u64 {
    DEFAULT_UPDATE_TIME_SECS
}

fn default_propagation() -> u64 {
    DEFAULT_PROPAGATION_SECS
}

fn default_web_ip() -> String {
    DEFAULT_WEB_IP.to_string()
}

fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggerConfig {
    /// Minimum level (trace, debug, info, warn, error).
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub disable_timestamp: bool,

    #[serde(default)]
    pub disable_color: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            disable_timestamp: false,
            disable_color: false,
        }
    }
}

/// Watcher configuration, tagged by provider name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum WatcherConfig {
    Ovh {
        /// Update URL template (SUBDOMAIN and NEWIP are substituted).
        #[serde(
            rename = "url-template",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        url_template: Option<String>,
        #[serde(default)]
        config: Vec<BasicAccount>,
    },

    Google {
        #[serde(
            rename = "url-template",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        url_template: Option<String>,
        #[serde(default)]
        config: Vec<GoogleAccount>,
    },

    DuckDns {
        /// Update URL template (SUBDOMAIN, NEWIP and TOKEN are substituted).
        #[serde(
            rename = "url-template",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        url_template: Option<String>,
        #[serde(default)]
        config: Vec<TokenAccount>,
    },
}

/// Account authenticated with a mandatory username/password pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicAccount {
    /// Username (or environment variable name if prefixed with $).
    pub username: String,
    /// Password (or environment variable name if prefixed with $).
    pub password: String,
    /// Optional parent domain appended to every subdomain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub subdomains: Vec<String>,
}

/// Google account, credentials may be embedded in the URL template instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleAccount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub subdomains: Vec<String>,
}

/// Account authenticated with a token substituted into the URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenAccount {
    /// Token (or environment variable name if prefixed with $).
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub subdomains: Vec<String>,
}

/// Runtime configuration of one provider group, driven by a single watcher.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Group identifier, e.g. `ovh[0]`.
    pub group: String,
    /// Provider endpoint and credentials.
    pub settings: ProviderSettings,
    /// Fully-qualified names tracked by this group.
    pub names: Vec<String>,
}

/// Closed set of provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSettings {
    Ovh {
        url_template: String,
        username: String,
        password: String,
    },
    Google {
        url_template: String,
        credentials: Option<(String, String)>,
    },
    DuckDns {
        url_template: String,
        token: String,
    },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            update_time: DEFAULT_UPDATE_TIME_SECS,
            pending_dns_propagation: DEFAULT_PROPAGATION_SECS,
            web_ip: default_web_ip(),
            http_timeout: DEFAULT_HTTP_TIMEOUT_SECS,
            logger: LoggerConfig::default(),
            watchers: Vec::new(),
        }
    }
}

impl Config {
    /// Get the default config file path.
    pub fn default_path() -> Result<std::path::PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| DdnsError::Config("Could not find config directory".to_string()))?;

        Ok(config_dir.join("ddns-watch").join("config.toml"))
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DdnsError::Config(format!(
                "Configuration file {} not found",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Interval between two passes of the same group.
    pub fn update_interval(&self) -> Duration {
        non_zero_secs(self.update_time, DEFAULT_UPDATE_TIME_SECS)
    }

    /// Propagation window during which an updated name is not re-checked.
    pub fn propagation_window(&self) -> Duration {
        non_zero_secs(self.pending_dns_propagation, DEFAULT_PROPAGATION_SECS)
    }

    /// HTTP client timeout.
    pub fn request_timeout(&self) -> Duration {
        non_zero_secs(self.http_timeout, DEFAULT_HTTP_TIMEOUT_SECS)
    }

    /// Check that every watcher can be turned into a working provider group.
    pub fn validate(&self) -> Result<()> {
        self.provider_configs().map(|_| ())
    }

    /// Build the per-group runtime configuration.
    ///
    /// Every account entry of every watcher becomes its own group. Any
    /// invalid entry fails the whole configuration. Credentials written as
    /// `$VAR` are read from the environment here, so the returned settings
    /// carry the real values.
    pub fn provider_configs(&self) -> Result<Vec<ProviderConfig>> {
        if self.watchers.is_empty() {
            return Err(DdnsError::Config(
                "At least one watcher must be configured".to_string(),
            ));
        }

        let mut groups = Vec::new();

        for watcher in &self.watchers {
            let name = watcher.name();
            if watcher.account_count() == 0 {
                return Err(DdnsError::Config(format!(
                    "Watcher {} has no config entries",
                    name
                )));
            }

            match watcher {
                WatcherConfig::Ovh {
                    url_template,
                    config,
                } => {
                    let url_template = template_or(url_template, ovh::DEFAULT_URL_TEMPLATE);
                    for (i, account) in config.iter().enumerate() {
                        let group = format!("{}[{}]", name, i);
                        let username = credential(&group, "username", &account.username)?;
                        let password = credential(&group, "password", &account.password)?;
                        groups.push(ProviderConfig {
                            names: expand_subdomains(&group, &account.subdomains, &account.domain)?,
                            settings: ProviderSettings::Ovh {
                                url_template: url_template.clone(),
                                username,
                                password,
                            },
                            group,
                        });
                    }
                }
                WatcherConfig::Google {
                    url_template,
                    config,
                } => {
                    let url_template = template_or(url_template, google::DEFAULT_URL_TEMPLATE);
                    for (i, account) in config.iter().enumerate() {
                        let group = format!("{}[{}]", name, i);
                        let credentials = match (&account.username, &account.password) {
                            (Some(user), Some(pass)) => Some((
                                credential(&group, "username", user)?,
                                credential(&group, "password", pass)?,
                            )),
                            (None, None) if url_template.contains('@') => None,
                            (None, None) => {
                                return Err(DdnsError::Config(format!(
                                    "{}: username and password are required unless the url template embeds them",
                                    group
                                )));
                            }
                            _ => {
                                return Err(DdnsError::Config(format!(
                                    "{}: username and password must be set together",
                                    group
                                )));
                            }
                        };
                        groups.push(ProviderConfig {
                            names: expand_subdomains(&group, &account.subdomains, &account.domain)?,
                            settings: ProviderSettings::Google {
                                url_template: url_template.clone(),
                                credentials,
                            },
                            group,
                        });
                    }
                }
                WatcherConfig::DuckDns {
                    url_template,
                    config,
                } => {
                    let url_template = template_or(url_template, duckdns::DEFAULT_URL_TEMPLATE);
                    for (i, account) in config.iter().enumerate() {
                        let group = format!("{}[{}]", name, i);
                        let token = credential(&group, "token", &account.token)?;
                        groups.push(ProviderConfig {
                            names: expand_subdomains(&group, &account.subdomains, &account.domain)?,
                            settings: ProviderSettings::DuckDns {
                                url_template: url_template.clone(),
                                token,
                            },
                            group,
                        });
                    }
                }
            }
        }

        Ok(groups)
    }

    /// Generate example configuration.
    pub fn example() -> Self {
        Self {
            watchers: vec![
                WatcherConfig::Ovh {
                    url_template: None,
                    config: vec![BasicAccount {
                        username: "$OVH_USERNAME".to_string(),
                        password: "$OVH_PASSWORD".to_string(),
                        domain: Some("example.com".to_string()),
                        subdomains: vec!["home".to_string(), "vpn".to_string()],
                    }],
                },
                WatcherConfig::DuckDns {
                    url_template: None,
                    config: vec![TokenAccount {
                        token: "$DUCKDNS_TOKEN".to_string(),
                        domain: None,
                        subdomains: vec!["myhome.duckdns.org".to_string()],
                    }],
                },
            ],
            ..Self::default()
        }
    }
}

impl WatcherConfig {
    /// Get the provider name.
    pub fn name(&self) -> &'static str {
        match self {
            WatcherConfig::Ovh { .. } => "ovh",
            WatcherConfig::Google { .. } => "google",
            WatcherConfig::DuckDns { .. } => "duckdns",
        }
    }

    fn account_count(&self) -> usize {
        match self {
            WatcherConfig::Ovh { config, .. } => config.len(),
            WatcherConfig::Google { config, .. } => config.len(),
            WatcherConfig::DuckDns { config, .. } => config.len(),
        }
    }
}

impl ProviderSettings {
    /// Get the provider name.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderSettings::Ovh { .. } => "ovh",
            ProviderSettings::Google { .. } => "google",
            ProviderSettings::DuckDns { .. } => "duckdns",
        }
    }
}

fn non_zero_secs(secs: u64, default: u64) -> Duration {
    Duration::from_secs(if secs == 0 { default } else { secs })
}

fn template_or(template: &Option<String>, default: &str) -> String {
    template
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Check a credential and resolve `$VAR` references against the environment.
fn credential(group: &str, field: &str, value: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(DdnsError::Config(format!("{}: {} is empty", group, field)));
    }
    resolve_env(value).map_err(|e| DdnsError::Config(format!("{}: {} {}", group, field, e)))
}

/// Resolve environment variable references (values starting with $).
fn resolve_env(value: &str) -> std::result::Result<String, String> {
    let Some(var_name) = value.strip_prefix('$') else {
        return Ok(value.to_string());
    };

    match std::env::var(var_name) {
        Ok(resolved) if !resolved.trim().is_empty() => Ok(resolved),
        Ok(_) => Err(format!("environment variable {} is empty", var_name)),
        Err(_) => Err(format!("environment variable {} is not set", var_name)),
    }
}

fn expand_subdomains(
    group: &str,
    subdomains: &[String],
    domain: &Option<String>,
) -> Result<Vec<String>> {
    if subdomains.is_empty() {
        return Err(DdnsError::Config(format!("{}: no subdomains configured", group)));
    }

    subdomains
        .iter()
        .map(|sub| {
            let sub = sub.trim();
            if sub.is_empty() {
                return Err(DdnsError::Config(format!("{}: empty subdomain", group)));
            }
            Ok(match domain.as_deref().map(str::trim) {
                Some(domain) if !domain.is_empty() => format!("{}.{}", sub, domain),
                _ => sub.to_string(),
            })
        })
        .collect()
}
