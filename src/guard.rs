//! Connection-time enforcement.
//!
//! The classifiers return decisions; a DNS hook or dialer needs a yes/no it
//! can reject a connection attempt with. [`Policy::check_connect`] runs the
//! per-dimension checks in the order a hook sees them (host, scheme, port,
//! then every resolved address) and turns the first deny into
//! [`Error::Denied`].
//!
//! Call it synchronously between resolution and connect. Any gap between the
//! two reopens a rebinding window.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use http::Method;
use tracing::{debug, warn};

use crate::decision::Decision;
use crate::error::Error;
use crate::policy::Policy;
use crate::target::UrlParts;

/// One independently classified axis of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Scheme,
    Method,
    Port,
    Host,
    Ip,
    Url,
}

impl Dimension {
    pub const fn as_str(self) -> &'static str {
        match self {
            Dimension::Scheme => "scheme",
            Dimension::Method => "method",
            Dimension::Port => "port",
            Dimension::Host => "host",
            Dimension::Ip => "ip",
            Dimension::Url => "url",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A connection about to be opened, as seen from a resolver hook.
#[derive(Debug, Clone, Copy)]
pub struct ConnectTarget<'a> {
    /// Lower-cased URL scheme.
    pub scheme: &'a str,

    /// Host name as requested (before resolution).
    pub host: &'a str,

    /// Destination port.
    pub port: u16,

    /// Every address the resolver returned.
    pub addrs: &'a [IpAddr],
}

impl<'a> ConnectTarget<'a> {
    pub fn new(scheme: &'a str, host: &'a str, port: u16, addrs: &'a [IpAddr]) -> Self {
        Self {
            scheme,
            host,
            port,
            addrs,
        }
    }

    /// Socket addresses to dial once the target has passed the guard.
    pub fn socket_addrs(&self) -> Vec<SocketAddr> {
        self.addrs
            .iter()
            .map(|ip| SocketAddr::new(*ip, self.port))
            .collect()
    }
}

impl Policy {
    /// Check a resolved connection target.
    ///
    /// Every address must pass. A resolver that returns one public and one
    /// private address is rejected outright rather than trusted to dial the
    /// right one.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::net::IpAddr;
    /// use http_acl::{ConnectTarget, Error, Policy};
    ///
    /// let policy = Policy::default();
    ///
    /// let public: [IpAddr; 1] = ["93.184.216.34".parse().unwrap()];
    /// let target = ConnectTarget::new("https", "example.com", 443, &public);
    /// assert!(policy.check_connect(&target).is_ok());
    ///
    /// let private: [IpAddr; 1] = ["10.0.0.7".parse().unwrap()];
    /// let err = policy
    ///     .check_connect(&ConnectTarget::new("https", "nas.local", 443, &private))
    ///     .unwrap_err();
    /// assert!(matches!(err, Error::Denied { .. }));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAddresses`] if `addrs` is empty, or
    /// [`Error::Denied`] for the first dimension the policy rejects.
    pub fn check_connect(&self, target: &ConnectTarget<'_>) -> Result<(), Error> {
        if target.addrs.is_empty() {
            warn!(host = target.host, "resolver returned no addresses");
            return Err(Error::no_addresses(target.host));
        }

        enforce(Dimension::Host, target.host, self.is_host_allowed(target.host))?;
        enforce(Dimension::Scheme, target.scheme, self.is_scheme_allowed(target.scheme))?;
        enforce(Dimension::Port, target.port, self.is_port_allowed(target.port))?;
        for ip in target.addrs {
            enforce(Dimension::Ip, ip, self.is_ip_allowed(*ip))?;
        }

        debug!(
            host = target.host,
            scheme = target.scheme,
            port = target.port,
            addrs = target.addrs.len(),
            "egress connection allowed"
        );
        Ok(())
    }

    /// [`check_connect`](Self::check_connect) with the request method checked first.
    pub fn check_request(&self, method: &Method, target: &ConnectTarget<'_>) -> Result<(), Error> {
        enforce(Dimension::Method, method, self.is_method_allowed(method))?;
        self.check_connect(target)
    }

    /// Pre-flight check of a URL before it is handed to a client.
    ///
    /// Returns the parsed parts so the caller can resolve `host()` and then
    /// run [`check_connect`](Self::check_connect) on the result.
    pub fn check_url(&self, url: &str) -> Result<UrlParts, Error> {
        let parts = UrlParts::parse(url)?;
        // Userinfo stays out of the error and the log line.
        let origin = format!("{}://{}:{}", parts.scheme(), parts.host(), parts.port());
        enforce(Dimension::Url, origin, self.is_url_parts_allowed(&parts))?;
        Ok(parts)
    }

    /// Drop the addresses the policy denies, keeping resolver order.
    ///
    /// For dialers that want to fall back to the remaining addresses instead
    /// of failing the whole connection.
    pub fn allowed_addrs(&self, addrs: &[IpAddr]) -> Vec<IpAddr> {
        addrs
            .iter()
            .copied()
            .filter(|ip| {
                let decision = self.is_ip_allowed(*ip);
                if !decision.allowed() {
                    warn!(
                        ip = %ip,
                        classification = %decision.classification(),
                        "filtered denied address from DNS response"
                    );
                }
                decision.allowed()
            })
            .collect()
    }
}

fn enforce(
    dimension: Dimension,
    value: impl fmt::Display,
    decision: Decision,
) -> Result<(), Error> {
    if decision.allowed() {
        return Ok(());
    }

    let value = value.to_string();
    warn!(
        dimension = %dimension,
        value = %value,
        classification = %decision.classification(),
        details = decision.details().unwrap_or_default(),
        "egress request denied"
    );
    Err(Error::denied(dimension, value, decision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Classification;

    fn addrs(list: &[&str]) -> Vec<IpAddr> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn denied(err: Error) -> (Dimension, String, Classification) {
        match err {
            Error::Denied {
                dimension,
                value,
                decision,
            } => (dimension, value, decision.classification()),
            other => panic!("expected Denied, got {other:?}"),
        }
    }

    // ==================== check_connect ====================

    #[test]
    fn test_connect_public_allowed() {
        let policy = Policy::default();
        let ips = addrs(&["93.184.216.34", "2606:2800:220:1:248:1893:25c8:1946"]);
        assert!(policy
            .check_connect(&ConnectTarget::new("https", "example.com", 443, &ips))
            .is_ok());
    }

    #[test]
    fn test_connect_no_addresses() {
        let policy = Policy::default();
        let err = policy
            .check_connect(&ConnectTarget::new("https", "example.com", 443, &[]))
            .unwrap_err();
        assert!(matches!(err, Error::NoAddresses { ref host } if host == "example.com"));
    }

    #[test]
    fn test_connect_private_address() {
        let policy = Policy::builder().allow_http(false).allow_private_ranges(false).build();
        let ips = addrs(&["192.168.1.20"]);
        let err = policy
            .check_connect(&ConnectTarget::new("https", "nas.local", 443, &ips))
            .unwrap_err();

        let (dimension, value, classification) = denied(err);
        assert_eq!(dimension, Dimension::Ip);
        assert_eq!(value, "192.168.1.20");
        assert_eq!(classification, Classification::DeniedPrivateRange);
    }

    #[test]
    fn test_connect_any_private_address_rejects() {
        let policy = Policy::default();
        let ips = addrs(&["93.184.216.34", "127.0.0.1"]);
        let err = policy
            .check_connect(&ConnectTarget::new("https", "rebind.example", 443, &ips))
            .unwrap_err();
        assert_eq!(denied(err).0, Dimension::Ip);
    }

    #[test]
    fn test_connect_checks_host_first() {
        let policy = Policy::builder().denied_hosts(["evil.example"]).build();
        let ips = addrs(&["10.0.0.1"]);
        let err = policy
            .check_connect(&ConnectTarget::new("http", "evil.example", 21, &ips))
            .unwrap_err();

        let (dimension, value, classification) = denied(err);
        assert_eq!(dimension, Dimension::Host);
        assert_eq!(value, "evil.example");
        assert_eq!(classification, Classification::DeniedUserAcl);
    }

    #[test]
    fn test_connect_scheme_then_port() {
        let policy = Policy::default();
        let ips = addrs(&["93.184.216.34"]);

        let err = policy
            .check_connect(&ConnectTarget::new("http", "example.com", 21, &ips))
            .unwrap_err();
        assert_eq!(denied(err).0, Dimension::Scheme);

        let err = policy
            .check_connect(&ConnectTarget::new("https", "example.com", 21, &ips))
            .unwrap_err();
        let (dimension, value, classification) = denied(err);
        assert_eq!(dimension, Dimension::Port);
        assert_eq!(value, "21");
        assert_eq!(classification, Classification::DeniedDefault);
    }

    #[test]
    fn test_connect_mapped_address_hits_deny_list() {
        let policy = Policy::builder()
            .denied_ips(addrs(&["93.184.216.34"]))
            .build();
        let ips = addrs(&["::ffff:93.184.216.34"]);
        let err = policy
            .check_connect(&ConnectTarget::new("https", "example.com", 443, &ips))
            .unwrap_err();

        let (dimension, value, classification) = denied(err);
        assert_eq!(dimension, Dimension::Ip);
        assert_eq!(value, "::ffff:93.184.216.34");
        assert_eq!(classification, Classification::DeniedUserAcl);
    }

    #[test]
    fn test_connect_allow_listed_internal_service() {
        let policy = Policy::builder()
            .allowed_ips(addrs(&["10.20.23.31"]))
            .build();
        let ips = addrs(&["10.20.23.31"]);
        assert!(policy
            .check_connect(&ConnectTarget::new("https", "internal.example", 443, &ips))
            .is_ok());
    }

    #[test]
    fn test_socket_addrs() {
        let ips = addrs(&["1.1.1.1", "::1"]);
        let target = ConnectTarget::new("https", "one.one.one.one", 443, &ips);
        let sockets = target.socket_addrs();
        assert_eq!(sockets.len(), 2);
        assert!(sockets.iter().all(|s| s.port() == 443));
    }

    // ==================== check_request ====================

    #[test]
    fn test_request_method_checked() {
        let policy = Policy::standard();
        let ips = addrs(&["93.184.216.34"]);
        let target = ConnectTarget::new("https", "example.com", 443, &ips);

        assert!(policy.check_request(&Method::GET, &target).is_ok());

        let err = policy.check_request(&Method::PUT, &target).unwrap_err();
        let decision = err.decision().cloned().unwrap();
        assert_eq!(decision.classification(), Classification::DeniedUserAcl);
        assert_eq!(decision.details(), Some("Denied user acl has high priority"));
    }

    // ==================== check_url ====================

    #[test]
    fn test_check_url() {
        let policy = Policy::default();

        let parts = policy.check_url("https://example.com/feed.rss").unwrap();
        assert_eq!(parts.host(), "example.com");
        assert_eq!(parts.port(), 443);

        let err = policy.check_url("http://admin:pw@example.com:9012").unwrap_err();
        let (dimension, value, classification) = denied(err);
        assert_eq!(dimension, Dimension::Url);
        assert_eq!(value, "http://example.com:9012");
        assert_eq!(classification, Classification::DeniedUserAcl);

        assert!(matches!(policy.check_url("::"), Err(Error::InvalidUrl { .. })));
    }

    // ==================== allowed_addrs ====================

    #[test]
    fn test_allowed_addrs_filters_private() {
        let policy = Policy::default();
        let ips = addrs(&["10.0.0.1", "93.184.216.34", "fe80::1", "1.1.1.1"]);
        assert_eq!(policy.allowed_addrs(&ips), addrs(&["93.184.216.34", "1.1.1.1"]));
    }

    #[test]
    fn test_error_message() {
        let policy = Policy::default();
        let ips = addrs(&["10.0.0.1"]);
        let err = policy
            .check_connect(&ConnectTarget::new("https", "example.com", 443, &ips))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Request has been rejected from acl due to DeniedPrivateRange (ip 10.0.0.1)"
        );
    }
}
