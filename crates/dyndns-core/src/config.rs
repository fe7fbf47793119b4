//! Configuration types for the dyndns system
//!
//! Configuration is read once at startup, from `CFDD_*` environment
//! variables, and handed by value to the components that need it.
//!
//! ```text
//! CFDD_TOKEN=...                      required
//! CFDD_LOG_LEVEL=debug                trace|debug|info|warn|error (default warn)
//! CFDD_TIMEOUT_SECONDS=5              per-call deadline
//! CFDD_TTL=300                        TTL of created records
//! CFDD_ZONE_1=example.com
//! CFDD_SUBDOMAINS_1=home,vpn
//! CFDD_RESOLVER=1.1.1.1               WAN IP lookup server
//! CFDD_RESOLVER_TARGET=whoami.cloudflare
//! ```

use std::fmt;
use std::time::Duration;

use crate::traits::DEFAULT_TTL;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "CFDD_";

/// Default per-call timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default WAN IP lookup server
pub const DEFAULT_RESOLVER_SERVER: &str = "1.1.1.1";

/// Default WAN IP lookup name
pub const DEFAULT_RESOLVER_TARGET: &str = "whoami.cloudflare";

/// Main dyndns configuration
#[derive(Clone)]
pub struct DyndnsConfig {
    /// Provider API token
    /// ⚠️ NEVER log this value
    pub api_token: String,

    /// Log verbosity
    pub log_level: LogLevel,

    /// Deadline for each network call, in seconds
    pub timeout_secs: u64,

    /// TTL for created records, in seconds
    pub ttl: u32,

    /// Zones and the subdomains to reconcile in each
    pub domains: Vec<DomainConfig>,

    /// WAN IP lookup settings
    pub resolver: ResolverConfig,

    /// Non-fatal problems found while parsing (logged once logging is up)
    pub warnings: Vec<String>,
}

// The token is redacted from debug output
impl fmt::Debug for DyndnsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DyndnsConfig")
            .field("api_token", &"<REDACTED>")
            .field("log_level", &self.log_level)
            .field("timeout_secs", &self.timeout_secs)
            .field("ttl", &self.ttl)
            .field("domains", &self.domains)
            .field("resolver", &self.resolver)
            .finish()
    }
}

impl DyndnsConfig {
    /// Create a configuration with defaults and no domains
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            log_level: LogLevel::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            ttl: DEFAULT_TTL,
            domains: Vec::new(),
            resolver: ResolverConfig::default(),
            warnings: Vec::new(),
        }
    }

    /// Add a domain
    pub fn with_domain(mut self, domain: DomainConfig) -> Self {
        self.domains.push(domain);
        self
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, crate::Error> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup function
    ///
    /// Missing token is an error. Unparseable timeout or TTL values fall back
    /// to their defaults and are recorded in `warnings`.
    pub fn from_vars<F>(lookup: F) -> Result<Self, crate::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_token = var("TOKEN").ok_or_else(|| crate::Error::config("CFDD_TOKEN is required"))?;
        let mut config = Self::new(api_token);

        config.log_level = var("LOG_LEVEL")
            .map(|v| LogLevel::parse_lenient(&v))
            .unwrap_or_default();

        if let Some(raw) = var("TIMEOUT_SECONDS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout_secs = secs,
                _ => config.warnings.push(format!(
                    "Invalid CFDD_TIMEOUT_SECONDS '{}', using default {} seconds",
                    raw, DEFAULT_TIMEOUT_SECS
                )),
            }
        }

        if let Some(raw) = var("TTL") {
            match raw.parse::<u32>() {
                Ok(ttl) if ttl > 0 => config.ttl = ttl,
                _ => config.warnings.push(format!(
                    "Invalid CFDD_TTL '{}', using default {}",
                    raw, DEFAULT_TTL
                )),
            }
        }

        if let Some(server) = var("RESOLVER") {
            config.resolver.server = server;
        }
        if let Some(target) = var("RESOLVER_TARGET") {
            config.resolver.target = target;
        }

        for index in 1.. {
            let (Some(zone), Some(subdomains)) = (
                var(&format!("ZONE_{}", index)),
                var(&format!("SUBDOMAINS_{}", index)),
            ) else {
                break;
            };

            config.domains.push(DomainConfig {
                zone,
                subdomains: subdomains
                    .replace(' ', "")
                    .split(',')
                    .map(str::to_string)
                    .collect(),
            });
        }

        Ok(config)
    }

    /// Per-call deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_token.is_empty() {
            return Err(crate::Error::config("CFDD_TOKEN is required"));
        }

        if self.domains.is_empty() {
            return Err(crate::Error::config(
                "no domains configured - please set CFDD_ZONE_1 and CFDD_SUBDOMAINS_1",
            ));
        }

        for (i, domain) in self.domains.iter().enumerate() {
            domain.validate(i + 1)?;
        }

        if self.resolver.target.is_empty() || self.resolver.server.is_empty() {
            return Err(crate::Error::config("resolver server and target cannot be empty"));
        }

        Ok(())
    }
}

/// A zone and the subdomains to reconcile within it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainConfig {
    /// Zone name (e.g. "example.com")
    pub zone: String,

    /// Subdomain labels, in processing order
    pub subdomains: Vec<String>,
}

impl DomainConfig {
    /// Create a new domain configuration
    pub fn new<I, S>(zone: impl Into<String>, subdomains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            zone: zone.into(),
            subdomains: subdomains.into_iter().map(Into::into).collect(),
        }
    }

    /// Fully-qualified name of a subdomain in this zone
    pub fn record_name(&self, subdomain: &str) -> String {
        format!("{}.{}", subdomain, self.zone)
    }

    /// Validate the domain; `position` is 1-based and only used in messages
    fn validate(&self, position: usize) -> Result<(), crate::Error> {
        if self.zone.is_empty() {
            return Err(crate::Error::config(format!(
                "domain {} has empty zone name",
                position
            )));
        }

        if self.zone.len() > 253 || !self.zone.split('.').all(is_valid_label) {
            return Err(crate::Error::config(format!(
                "domain {} has invalid zone name format: {}",
                position, self.zone
            )));
        }

        if self.subdomains.is_empty() {
            return Err(crate::Error::config(format!(
                "domain {} ({}) has no subdomains configured",
                position, self.zone
            )));
        }

        for (j, subdomain) in self.subdomains.iter().enumerate() {
            if subdomain.is_empty() {
                return Err(crate::Error::config(format!(
                    "domain {} ({}) has empty subdomain at position {}",
                    position,
                    self.zone,
                    j + 1
                )));
            }

            if !is_valid_label(subdomain) {
                return Err(crate::Error::config(format!(
                    "domain {} ({}) has invalid subdomain format: {}",
                    position, self.zone, subdomain
                )));
            }
        }

        Ok(())
    }
}

/// A single DNS label: 1-63 ASCII alphanumerics or hyphens, no hyphen at
/// either end
fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !label.starts_with('-')
        && !label.ends_with('-')
}

/// WAN IP lookup configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// DNS server to query: IPv4 address or host name, optional `:port`
    pub server: String,

    /// Name to query as CHAOS-class TXT
    pub target: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_RESOLVER_SERVER.to_string(),
            target: DEFAULT_RESOLVER_TARGET.to_string(),
        }
    }
}

/// Log verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name; anything unrecognised means `Warn`
    pub fn parse_lenient(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "error" => LogLevel::Error,
            _ => LogLevel::Warn,
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}
