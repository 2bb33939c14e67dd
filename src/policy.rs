//! The egress policy and its per-dimension classifiers.
//!
//! ## Precedence
//!
//! Every dimension resolves in a fixed order and the first match wins.
//!
//! | Dimension | Order |
//! |---|---|
//! | scheme | http/https flag, otherwise deny |
//! | method, port, host | deny list, allow list, default flag |
//! | ip | allow list, deny list, private-range guard, default flag |
//!
//! Deny lists sit above allow lists so a value present in both is denied. The
//! IP dimension is the exception: an explicitly allowed address beats the deny
//! list and the private-range guard, which lets an operator reach a specific
//! internal service without opening every private range.
//!
//! ## Immutability
//!
//! A [`Policy`] is produced by [`PolicyBuilder::build()`](crate::PolicyBuilder::build)
//! and has no `&mut self` methods. Share it across threads freely.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use http::Method;

use crate::decision::{Classification, Decision};
use crate::error::Error;
use crate::policy_builder::PolicyBuilder;
use crate::ranges::{canonical_ip, PrivateRanges};
use crate::target::UrlParts;

pub(crate) const DENY_LIST_PRIORITY: &str = "Denied user acl has high priority";
pub(crate) const USERNAME_NOT_ALLOWED: &str = "Username on the url is not allowed";

/// An immutable egress access-control policy.
///
/// # Example
///
/// ```rust
/// use http_acl::{Classification, Policy};
///
/// let policy = Policy::builder()
///     .allowed_hosts(["example.com"])
///     .host_default_allow(false)
///     .build();
///
/// assert_eq!(
///     policy.is_host_allowed("example.com").classification(),
///     Classification::AllowedUserAcl
/// );
/// assert!(!policy.is_host_allowed("google.com").allowed());
/// ```
#[derive(Clone)]
pub struct Policy {
    pub(crate) allow_http: bool,
    pub(crate) allow_https: bool,

    pub(crate) allowed_methods: HashSet<Method>,
    pub(crate) denied_methods: HashSet<Method>,
    pub(crate) method_default_allow: bool,

    pub(crate) allowed_ips: HashSet<IpAddr>,
    pub(crate) denied_ips: HashSet<IpAddr>,
    pub(crate) allow_private_ranges: bool,
    pub(crate) ip_default_allow: bool,

    pub(crate) allowed_ports: HashSet<u16>,
    pub(crate) denied_ports: HashSet<u16>,
    pub(crate) port_default_allow: bool,

    pub(crate) allowed_hosts: HashSet<String>,
    pub(crate) denied_hosts: HashSet<String>,
    pub(crate) host_default_allow: bool,

    pub(crate) allow_username_in_url: bool,

    pub(crate) private_ranges: Arc<dyn PrivateRanges>,
}

impl Policy {
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::new()
    }

    /// A ready-made policy for general web clients: http and https allowed,
    /// private ranges denied, `PUT` denied.
    pub fn standard() -> Self {
        PolicyBuilder::new()
            .allow_http(true)
            .allow_https(true)
            .allow_private_ranges(false)
            .denied_methods([Method::PUT])
            .build()
    }

    /// Classify a URL scheme.
    ///
    /// Only `http` and `https` can ever be allowed, and only when their flag
    /// is set. There is no default tier. The comparison is exact, so callers
    /// pass the lower-cased scheme a URL parser produces.
    pub fn is_scheme_allowed(&self, scheme: &str) -> Decision {
        let allowed = match scheme {
            "http" => self.allow_http,
            "https" => self.allow_https,
            _ => false,
        };

        if allowed {
            Decision::new(Classification::AllowedUserAcl)
        } else {
            Decision::new(Classification::DeniedUserAcl)
        }
    }

    pub fn is_method_allowed(&self, method: &Method) -> Decision {
        if self.denied_methods.contains(method) {
            return Decision::with_details(Classification::DeniedUserAcl, DENY_LIST_PRIORITY);
        }
        allow_list_or_default(self.allowed_methods.contains(method), self.method_default_allow)
    }

    /// Classify a resolved address. This is the check that must run between
    /// DNS resolution and connect.
    ///
    /// IPv4-mapped and IPv4-compatible IPv6 addresses are matched as the
    /// IPv4 address they carry.
    pub fn is_ip_allowed(&self, ip: IpAddr) -> Decision {
        let ip = canonical_ip(ip);

        if self.allowed_ips.contains(&ip) {
            return Decision::new(Classification::AllowedUserAcl);
        }

        if self.denied_ips.contains(&ip) {
            return Decision::new(Classification::DeniedUserAcl);
        }

        if !self.allow_private_ranges && self.private_ranges.is_private(ip) {
            return Decision::new(Classification::DeniedPrivateRange);
        }

        default_decision(self.ip_default_allow)
    }

    /// Parse an IP literal and classify it.
    ///
    /// Bracketed IPv6 (`[::1]`, as it appears in a URL host) is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIp`] if `ip` is not an IP literal.
    pub fn is_ip_str_allowed(&self, ip: &str) -> Result<Decision, Error> {
        let literal = ip.trim_start_matches('[').trim_end_matches(']');
        let parsed = literal
            .parse::<IpAddr>()
            .map_err(|e| Error::invalid_ip(ip, e.to_string()))?;
        Ok(self.is_ip_allowed(parsed))
    }

    pub fn is_port_allowed(&self, port: u16) -> Decision {
        if self.denied_ports.contains(&port) {
            return Decision::new(Classification::DeniedUserAcl);
        }
        allow_list_or_default(self.allowed_ports.contains(&port), self.port_default_allow)
    }

    /// Classify a host name by literal equality. No wildcard or suffix
    /// matching is done.
    ///
    /// Both sides are compared in DNS canonical form: ASCII lower-case with
    /// the root dot dropped, so `Evil.Example.` matches `evil.example`.
    pub fn is_host_allowed(&self, host: &str) -> Decision {
        let host = normalize_host(host);
        if self.denied_hosts.contains(host.as_ref()) {
            return Decision::new(Classification::DeniedUserAcl);
        }
        allow_list_or_default(
            self.allowed_hosts.contains(host.as_ref()),
            self.host_default_allow,
        )
    }

    /// Parse a URL and classify its host, port, scheme and userinfo.
    ///
    /// The host is not resolved and no IP check is made; run
    /// [`is_ip_allowed`](Self::is_ip_allowed) on the resolved addresses at
    /// connect time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the URL cannot be parsed.
    pub fn is_url_allowed(&self, url: &str) -> Result<Decision, Error> {
        let parts = UrlParts::parse(url)?;
        Ok(self.is_url_parts_allowed(&parts))
    }

    /// Classify an already-parsed URL.
    ///
    /// Allowed only when host, port and scheme each come back allowed and the
    /// URL carries no username the policy forbids. Otherwise a forbidden
    /// username is reported as `DeniedUserAcl`, anything else as
    /// `DeniedDefault`.
    pub fn is_url_parts_allowed(&self, url: &UrlParts) -> Decision {
        let host = self.is_host_allowed(url.host());
        let port = self.is_port_allowed(url.port());
        let scheme = self.is_scheme_allowed(url.scheme());
        let username_denied = url.has_username() && !self.allow_username_in_url;

        if host.allowed() && port.allowed() && scheme.allowed() && !username_denied {
            return Decision::new(Classification::AllowedUserAcl);
        }

        if username_denied {
            return Decision::with_details(Classification::DeniedUserAcl, USERNAME_NOT_ALLOWED);
        }

        Decision::new(Classification::DeniedDefault)
    }
}

impl Default for Policy {
    fn default() -> Self {
        PolicyBuilder::new().build()
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("allow_http", &self.allow_http)
            .field("allow_https", &self.allow_https)
            .field("allowed_methods", &self.allowed_methods)
            .field("denied_methods", &self.denied_methods)
            .field("method_default_allow", &self.method_default_allow)
            .field("allowed_ips", &self.allowed_ips)
            .field("denied_ips", &self.denied_ips)
            .field("allow_private_ranges", &self.allow_private_ranges)
            .field("ip_default_allow", &self.ip_default_allow)
            .field("allowed_ports", &self.allowed_ports)
            .field("denied_ports", &self.denied_ports)
            .field("port_default_allow", &self.port_default_allow)
            .field("allowed_hosts", &self.allowed_hosts)
            .field("denied_hosts", &self.denied_hosts)
            .field("host_default_allow", &self.host_default_allow)
            .field("allow_username_in_url", &self.allow_username_in_url)
            .finish_non_exhaustive()
    }
}

pub(crate) fn normalize_host(host: &str) -> Cow<'_, str> {
    let host = host.strip_suffix('.').unwrap_or(host);
    if host.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(host.to_ascii_lowercase())
    } else {
        Cow::Borrowed(host)
    }
}

fn allow_list_or_default(listed: bool, default_allow: bool) -> Decision {
    if listed {
        Decision::new(Classification::AllowedUserAcl)
    } else {
        default_decision(default_allow)
    }
}

fn default_decision(default_allow: bool) -> Decision {
    if default_allow {
        Decision::new(Classification::AllowedDefault)
    } else {
        Decision::new(Classification::DeniedDefault)
    }
}
