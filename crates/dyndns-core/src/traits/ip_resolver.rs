// # WAN IP Resolver Trait
//
// Defines the interface for discovering the caller's public IP address.
//
// ## Implementations
//
// - CHAOS-class TXT lookup: `dyndns-ip-chaos` crate
//
// ## Usage
//
// ```rust,ignore
// use dyndns_core::WanIpResolver;
//
// let wan_ip = resolver.resolve().await?;
// println!("WAN IP: {}", wan_ip);
// ```

use async_trait::async_trait;

/// Trait for WAN IP discovery
///
/// A resolver performs exactly one lookup per call, bounded by its own
/// deadline. The returned string is always a valid IPv4 or IPv6 literal.
#[async_trait]
pub trait WanIpResolver: Send + Sync {
    /// Discover the current public IP address
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The IP literal as reported by the lookup service
    /// - `Err(Error)`: Resolution, malformed response, or timeout errors
    async fn resolve(&self) -> Result<String, crate::Error>;

    /// Describe the lookup (for logging)
    fn describe(&self) -> String;
}
