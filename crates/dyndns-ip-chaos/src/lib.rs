// # CHAOS TXT IP Resolver
//
// This crate discovers the WAN IP of the host by asking a public resolver for
// a TXT record in the CHAOS class.
//
// ## How It Works
//
// Some public resolvers answer a CHAOS-class TXT query for a well-known name
// with the source address they observed, instead of zone data:
//
// ```bash
// dig @1.1.1.1 whoami.cloudflare TXT CH +short
// "203.0.113.5"
// ```
//
// The query goes out over UDP from an IPv4 socket. One datagram is sent and
// one is read; the whole exchange is bounded by a single deadline. A server
// given by host name is looked up inside that deadline and the first IPv4
// address is used.

use async_trait::async_trait;
use dyndns_core::config::DyndnsConfig;
use dyndns_core::traits::WanIpResolver;
use dyndns_core::{Error, Result};
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;

/// Port DNS servers listen on
pub const DNS_PORT: u16 = 53;

/// Largest response we read
const MAX_RESPONSE_LEN: usize = 4096;

/// DNS server a query is sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverServer {
    /// A fixed IPv4 socket address
    Addr(SocketAddr),
    /// A host name, looked up at query time
    Host {
        /// Host name
        host: String,
        /// UDP port
        port: u16,
    },
}

impl ResolverServer {
    /// Parse `ip`, `ip:port`, `host` or `host:port`; port 53 is implied
    ///
    /// IPv6 servers are rejected: the query socket is IPv4.
    pub fn parse(value: &str) -> Result<Self> {
        let ipv4_only = || {
            Error::config(format!(
                "resolver server must be IPv4 or a host name, got: {}",
                value
            ))
        };

        if let Ok(addr) = value.parse::<SocketAddr>() {
            return if addr.is_ipv4() {
                Ok(Self::Addr(addr))
            } else {
                Err(ipv4_only())
            };
        }

        match value.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => return Ok(Self::Addr(SocketAddr::from((ip, DNS_PORT)))),
            Ok(IpAddr::V6(_)) => return Err(ipv4_only()),
            Err(_) => {}
        }

        let (host, port) = match value.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    Error::config(format!("invalid resolver port in: {}", value))
                })?;
                (host, port)
            }
            None => (value, DNS_PORT),
        };

        if host.is_empty() || host.contains(':') {
            return Err(ipv4_only());
        }

        Ok(Self::Host {
            host: host.to_string(),
            port,
        })
    }

    /// The IPv4 address to send to
    async fn socket_addr(&self) -> Result<SocketAddr> {
        match self {
            Self::Addr(addr) => Ok(*addr),
            Self::Host { host, port } => tokio::net::lookup_host((host.as_str(), *port))
                .await
                .map_err(|e| Error::resolution(format!("failed to look up {}: {}", host, e)))?
                .find(SocketAddr::is_ipv4)
                .ok_or_else(|| Error::resolution(format!("{} has no IPv4 address", host))),
        }
    }
}

impl From<SocketAddr> for ResolverServer {
    fn from(addr: SocketAddr) -> Self {
        Self::Addr(addr)
    }
}

impl fmt::Display for ResolverServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Addr(addr) => write!(f, "{}", addr),
            Self::Host { host, port } => write!(f, "{}:{}", host, port),
        }
    }
}

/// WAN IP resolver using a CHAOS-class TXT query
#[derive(Debug, Clone)]
pub struct ChaosTxtResolver {
    /// Name to query (e.g. "whoami.cloudflare")
    target: String,

    /// DNS server to ask
    server: ResolverServer,

    /// Deadline for the whole exchange
    timeout: Duration,
}

impl ChaosTxtResolver {
    /// Create a new resolver
    ///
    /// # Parameters
    ///
    /// - `target`: Name to query, with or without the trailing dot
    /// - `server`: DNS server (normally port 53)
    /// - `timeout`: Hard deadline for lookup, send and receive
    pub fn new(
        target: impl Into<String>,
        server: impl Into<ResolverServer>,
        timeout: Duration,
    ) -> Self {
        Self {
            target: target.into(),
            server: server.into(),
            timeout,
        }
    }

    /// Create a resolver from the `resolver` section of the configuration
    ///
    /// The server is an IPv4 address or a host name, optionally with a
    /// port; port 53 is implied.
    pub fn from_config(config: &DyndnsConfig) -> Result<Self> {
        Ok(Self::new(
            config.resolver.target.clone(),
            ResolverServer::parse(&config.resolver.server)?,
            config.timeout(),
        ))
    }

    /// Build the wire-format query
    fn build_query(&self, id: u16) -> Result<Vec<u8>> {
        let fqdn = if self.target.ends_with('.') {
            self.target.clone()
        } else {
            format!("{}.", self.target)
        };

        let name = Name::from_ascii(&fqdn)
            .map_err(|e| Error::resolution(format!("invalid query name {}: {}", self.target, e)))?;

        let mut query = Query::query(name, RecordType::TXT);
        query.set_query_class(DNSClass::CH);

        let mut message = Message::new();
        message
            .set_id(id)
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true)
            .add_query(query);

        message
            .to_vec()
            .map_err(|e| Error::resolution(format!("failed to encode query: {}", e)))
    }

    /// Send the query and read one response
    async fn exchange(&self) -> Result<Message> {
        let id: u16 = rand::random();
        let request = self.build_query(id)?;
        let server = self.server.socket_addr().await?;

        let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
            .await
            .map_err(|e| Error::resolution(format!("DNS exchange failed: {}", e)))?;

        tracing::debug!(server = %server, target = %self.target, id, "Sending CHAOS TXT query");

        socket
            .send_to(&request, server)
            .await
            .map_err(|e| Error::resolution(format!("DNS exchange failed: {}", e)))?;

        let mut buf = vec![0u8; MAX_RESPONSE_LEN];
        let (len, from) = socket
            .recv_from(&mut buf)
            .await
            .map_err(|e| Error::resolution(format!("DNS exchange failed: {}", e)))?;

        if from != server {
            return Err(Error::resolution(format!(
                "response from unexpected address {} (queried {})",
                from, server
            )));
        }

        let response = Message::from_vec(&buf[..len])
            .map_err(|e| Error::resolution(format!("malformed DNS response: {}", e)))?;

        if response.id() != id {
            return Err(Error::resolution(format!(
                "response id {} does not match query id {}",
                response.id(),
                id
            )));
        }

        Ok(response)
    }
}

/// Pull the IP literal out of a CHAOS TXT response
///
/// Only the first answer is considered; its first character-string must be
/// an IPv4 or IPv6 literal and is returned verbatim.
pub fn extract_ip(target: &str, response: &Message) -> Result<String> {
    let answer = response
        .answers()
        .first()
        .ok_or_else(|| Error::no_answer(target))?;

    if answer.record_type() != RecordType::TXT {
        return Err(Error::unexpected_record_type(answer.record_type().to_string()));
    }

    let first = match answer.data() {
        Some(RData::TXT(txt)) => txt.txt_data().first(),
        _ => None,
    }
    .ok_or_else(|| Error::empty_record(target))?;

    let ip = String::from_utf8_lossy(first).into_owned();
    if ip.parse::<IpAddr>().is_err() {
        return Err(Error::invalid_address(ip));
    }

    Ok(ip)
}

#[async_trait]
impl WanIpResolver for ChaosTxtResolver {
    async fn resolve(&self) -> Result<String> {
        let response = tokio::time::timeout(self.timeout, self.exchange())
            .await
            .map_err(|_| {
                Error::timeout(
                    format!("CHAOS TXT lookup of {} via {}", self.target, self.server),
                    self.timeout,
                )
            })??;

        extract_ip(&self.target, &response)
    }

    fn describe(&self) -> String {
        format!("TXT/CH {} @ {}", self.target, self.server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::rr::Record;
    use hickory_proto::rr::rdata::{A, TXT};

    fn response_with(answers: Vec<Record>) -> Message {
        let mut message = Message::new();
        message.set_message_type(MessageType::Response);
        for answer in answers {
            message.add_answer(answer);
        }
        message
    }

    fn txt(strings: &[&str]) -> Record {
        let name = Name::from_ascii("whoami.cloudflare.").unwrap();
        let rdata = TXT::new(strings.iter().map(|s| s.to_string()).collect());
        let mut record = Record::from_rdata(name, 0, RData::TXT(rdata));
        record.set_dns_class(DNSClass::CH);
        record
    }

    fn a(ip: Ipv4Addr) -> Record {
        let name = Name::from_ascii("whoami.cloudflare.").unwrap();
        Record::from_rdata(name, 0, RData::A(A::from(ip)))
    }

    #[test]
    fn test_extracts_ipv4_and_ipv6() {
        for ip in ["203.0.113.5", "2001:db8::1", "::ffff:192.0.2.1"] {
            let response = response_with(vec![txt(&[ip])]);
            assert_eq!(extract_ip("whoami.cloudflare", &response).unwrap(), ip);
        }
    }

    #[test]
    fn test_only_first_string_is_used() {
        let response = response_with(vec![txt(&["203.0.113.5", "garbage"])]);
        assert_eq!(extract_ip("whoami.cloudflare", &response).unwrap(), "203.0.113.5");
    }

    #[test]
    fn test_non_ip_is_invalid_address() {
        for bad in ["not-an-ip", "203.0.113", "203.0.113.5 ", "localhost", ""] {
            let response = response_with(vec![txt(&[bad])]);
            let err = extract_ip("whoami.cloudflare", &response).unwrap_err();
            assert!(matches!(err, Error::InvalidAddress(_)), "{:?} gave {:?}", bad, err);
        }
    }

    #[test]
    fn test_empty_answer_section() {
        let err = extract_ip("whoami.cloudflare", &response_with(vec![])).unwrap_err();
        assert!(matches!(err, Error::NoAnswer(_)));
    }

    #[test]
    fn test_first_answer_not_txt() {
        let response = response_with(vec![a(Ipv4Addr::new(203, 0, 113, 5)), txt(&["203.0.113.5"])]);
        let err = extract_ip("whoami.cloudflare", &response).unwrap_err();
        assert!(matches!(err, Error::UnexpectedRecordType(_)));
    }

    #[test]
    fn test_txt_without_strings() {
        let response = response_with(vec![txt(&[])]);
        let err = extract_ip("whoami.cloudflare", &response).unwrap_err();
        assert!(matches!(err, Error::EmptyRecord(_)));
    }

    #[test]
    fn test_query_is_chaos_txt() {
        let resolver = ChaosTxtResolver::new(
            "whoami.cloudflare",
            SocketAddr::from(([127, 0, 0, 1], DNS_PORT)),
            Duration::from_secs(5),
        );

        let bytes = resolver.build_query(4242).unwrap();
        let message = Message::from_vec(&bytes).unwrap();

        assert_eq!(message.id(), 4242);
        assert!(message.recursion_desired());
        let query = &message.queries()[0];
        assert_eq!(query.name().to_ascii(), "whoami.cloudflare.");
        assert_eq!(query.query_type(), RecordType::TXT);
        assert_eq!(query.query_class(), DNSClass::CH);
    }

    #[test]
    fn test_from_config() {
        let mut config = DyndnsConfig::new("token");
        let resolver = ChaosTxtResolver::from_config(&config).unwrap();
        assert_eq!(
            resolver.server,
            ResolverServer::Addr(SocketAddr::from(([1, 1, 1, 1], DNS_PORT)))
        );
        assert_eq!(resolver.target, "whoami.cloudflare");
        assert_eq!(resolver.timeout, Duration::from_secs(5));

        config.resolver.server = "one.one.one.one".to_string();
        let resolver = ChaosTxtResolver::from_config(&config).unwrap();
        assert_eq!(resolver.describe(), "TXT/CH whoami.cloudflare @ one.one.one.one:53");

        config.resolver.server = "2606:4700:4700::1111".to_string();
        assert!(matches!(
            ChaosTxtResolver::from_config(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_server_parsing() {
        let addr = |s: &str| ResolverServer::parse(s).unwrap();
        let host = |h: &str, port: u16| ResolverServer::Host {
            host: h.to_string(),
            port,
        };

        assert_eq!(
            addr("1.1.1.1"),
            ResolverServer::Addr(SocketAddr::from(([1, 1, 1, 1], 53)))
        );
        assert_eq!(
            addr("9.9.9.9:5353"),
            ResolverServer::Addr(SocketAddr::from(([9, 9, 9, 9], 5353)))
        );
        assert_eq!(addr("one.one.one.one"), host("one.one.one.one", 53));
        assert_eq!(addr("dns.lan:5353"), host("dns.lan", 5353));

        for bad in ["2001:db8::1", "[2001:db8::1]:53", "dns.lan:abc", ":53", ""] {
            assert!(
                matches!(ResolverServer::parse(bad), Err(Error::Config(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }
}
