// # Cloudflare Record Store
//
// This crate implements `RecordStore` over the Cloudflare API v4.
//
// ## Behavior
//
// - One HTTP request per trait call, no retry, no caching
// - Zone lookup filters the provider's search results by exact name
// - Record lookup filters by exact name and type A and returns the first match
// - API failures carry Cloudflare's error code, message and error chain
// - Request timeouts are reported as `Error::Timeout`, never as API errors
//
// ## Security Requirements
//
// - API token NEVER appears in logs
// - Store construction fails fast if the token is empty
//
// ## API Reference
//
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=A`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use dyndns_core::config::DyndnsConfig;
use dyndns_core::traits::{DnsRecord, RecordStore, RecordType, Zone};
use dyndns_core::{Error, ProviderCause, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Response envelope shared by every Cloudflare API v4 endpoint
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    result: Option<T>,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    error_chain: Vec<ApiError>,
}

impl ApiError {
    /// Depth-first flattening of the nested error chain
    fn flatten_chain(&self, out: &mut Vec<ProviderCause>) {
        for cause in &self.error_chain {
            out.push(ProviderCause {
                code: cause.code,
                message: cause.message.clone(),
            });
            cause.flatten_chain(out);
        }
    }

    fn into_error(self) -> Error {
        let mut chain = Vec::new();
        self.flatten_chain(&mut chain);
        Error::Provider {
            code: self.code,
            message: self.message,
            chain,
        }
    }
}

/// Cloudflare-backed record store
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareStore {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL (overridable for tests)
    base_url: String,

    /// Request timeout, also used to label timeout errors
    timeout: Duration,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl std::fmt::Debug for CloudflareStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareStore")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CloudflareStore {
    /// Create a new Cloudflare store
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:Read and DNS:Edit permissions
    /// - `timeout`: Timeout applied to every HTTP request
    pub fn new(api_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            timeout,
            client,
        })
    }

    /// Create a store from configuration
    pub fn from_config(config: &DyndnsConfig) -> Result<Self> {
        Self::new(config.api_token.clone(), config.timeout())
    }

    /// Point the store at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and unwrap the Cloudflare envelope
    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder, operation: &str) -> Result<T> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| self.transport_error(e, operation))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e, operation))?;

        let envelope = serde_json::from_str::<ApiResponse<T>>(&body);

        match envelope {
            Ok(envelope) if envelope.success && status.is_success() => {
                envelope.result.ok_or_else(|| {
                    Error::provider(
                        i64::from(status.as_u16()),
                        format!("{}: response has no result", operation),
                    )
                })
            }
            // Cloudflare reports the most specific error first
            Ok(envelope) => match envelope.errors.into_iter().next() {
                Some(error) => Err(error.into_error()),
                None => Err(status_error(status, operation, &body)),
            },
            Err(e) if status.is_success() => Err(Error::provider(
                i64::from(status.as_u16()),
                format!("{}: failed to parse response: {}", operation, e),
            )),
            Err(_) => Err(status_error(status, operation, &body)),
        }
    }

    fn transport_error(&self, e: reqwest::Error, operation: &str) -> Error {
        if e.is_timeout() {
            Error::timeout(operation, self.timeout)
        } else {
            Error::http(format!("{}: {}", operation, e))
        }
    }
}

/// Map an HTTP status without a usable Cloudflare error body
fn status_error(status: StatusCode, operation: &str, body: &str) -> Error {
    let code = i64::from(status.as_u16());
    match status.as_u16() {
        401 | 403 => Error::provider(
            code,
            format!(
                "{}: Authentication failed: Invalid API token or insufficient permissions. Status: {}",
                operation, status
            ),
        ),
        429 => Error::provider(
            code,
            format!("{}: Rate limit exceeded. Status: {}", operation, status),
        ),
        500..=599 => Error::provider(
            code,
            format!("{}: Cloudflare server error (transient): {} - {}", operation, status, body),
        ),
        _ => Error::provider(code, format!("{}: {} - {}", operation, status, body)),
    }
}

#[async_trait]
impl RecordStore for CloudflareStore {
    async fn resolve_zone_id(&self, zone_name: &str) -> Result<String> {
        tracing::debug!(zone = zone_name, "Looking up zone ID");

        let request = self
            .client
            .get(self.url("/zones"))
            .query(&[("name", zone_name)]);
        let zones: Vec<Zone> = self.call(request, "list zones").await?;

        let matches: Vec<Zone> = zones
            .into_iter()
            .filter(|z| z.name.eq_ignore_ascii_case(zone_name))
            .collect();

        match matches.as_slice() {
            [] => Err(Error::not_found(format!("zone not found: {}", zone_name))),
            [zone] => {
                tracing::debug!(zone = zone_name, zone_id = %zone.id, "Found zone ID");
                Ok(zone.id.clone())
            }
            _ => Err(Error::ambiguous(format!(
                "{} zones named {}",
                matches.len(),
                zone_name
            ))),
        }
    }

    async fn find_record(&self, zone_id: &str, record_name: &str) -> Result<DnsRecord> {
        tracing::debug!(record = record_name, "Looking up record");

        let request = self
            .client
            .get(self.url(&format!("/zones/{}/dns_records", zone_id)))
            .query(&[("name", record_name), ("type", RecordType::A.as_str())]);
        let records: Vec<DnsRecord> = self.call(request, "list DNS records").await?;

        // Only address records are ever patched; other types under the same
        // name are left alone
        let mut matches = records.into_iter().filter(|r| {
            r.name.eq_ignore_ascii_case(record_name)
                && r.record_type.eq_ignore_ascii_case(RecordType::A.as_str())
        });

        let record = matches
            .next()
            .ok_or_else(|| Error::not_found(format!("record not found: {}", record_name)))?;

        let extra = matches.count();
        if extra > 0 {
            tracing::warn!(
                record = record_name,
                using = %record.id,
                ignored = extra,
                "Multiple records share this name, using the first"
            );
        }

        Ok(record)
    }

    async fn create_record(
        &self,
        zone_id: &str,
        record_type: RecordType,
        name: &str,
        content: &str,
        ttl: u32,
    ) -> Result<DnsRecord> {
        let request = self
            .client
            .post(self.url(&format!("/zones/{}/dns_records", zone_id)))
            .json(&json!({
                "type": record_type.as_str(),
                "name": name,
                "content": content,
                "ttl": ttl,
            }));

        self.call(request, "create DNS record").await
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        name: &str,
        content: &str,
    ) -> Result<()> {
        let request = self
            .client
            .patch(self.url(&format!("/zones/{}/dns_records/{}", zone_id, record_id)))
            .json(&json!({
                "name": name,
                "content": content,
            }));

        let _: serde_json::Value = self.call(request, "update DNS record").await?;
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "cloudflare"
    }
}
