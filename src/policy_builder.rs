//! Builder for [`Policy`].
//!
//! ## Immutability
//!
//! Every setter consumes the builder and returns it, and [`PolicyBuilder::build()`]
//! consumes it once more to produce the [`Policy`]. Nothing can observe or
//! change a policy after it is built.
//!
//! ## No validation
//!
//! Setters never check one field against another. A port in both the allow and
//! deny lists is legal and resolved by precedence when it is classified.
//!
//! ## Security Considerations
//!
//! **Be careful with `allowed_ips` and `allow_private_ranges`.** Both open the
//! private-range guard:
//!
//! ```rust
//! use http_acl::Policy;
//!
//! // DANGEROUS: every internal address becomes reachable.
//! let bad_policy = Policy::builder()
//!     .allow_private_ranges(true)
//!     .build();
//! ```
//!
//! Prefer allow-listing the single address of the internal service you need.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use http::Method;

use crate::policy::{normalize_host, Policy};
use crate::ranges::{canonical_ip, PrivateRanges, ReservedRanges};

/// Ports allowed before any configuration.
pub const DEFAULT_ALLOWED_PORTS: [u16; 3] = [80, 443, 8080];

/// Methods allowed before any configuration.
pub const DEFAULT_ALLOWED_METHODS: [Method; 9] = [
    Method::GET,
    Method::CONNECT,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
    Method::POST,
    Method::PUT,
    Method::TRACE,
];

/// Builder for creating policies.
///
/// Starts from a conservative posture: https only, private ranges denied,
/// ports 80/443/8080 only, standard methods only, usernames in URLs denied.
/// Hosts and addresses fall through to allow.
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use http_acl::{Classification, PolicyBuilder};
///
/// let policy = PolicyBuilder::new()
///     .allow_http(false)
///     .allow_https(true)
///     .denied_methods([Method::PATCH])
///     .allowed_methods([Method::PATCH])
///     .build();
///
/// // Deny wins when a method is in both lists.
/// assert_eq!(
///     policy.is_method_allowed(&Method::PATCH).classification(),
///     Classification::DeniedUserAcl
/// );
/// ```
#[derive(Clone)]
pub struct PolicyBuilder {
    allow_http: bool,
    allow_https: bool,
    allowed_methods: HashSet<Method>,
    denied_methods: HashSet<Method>,
    method_default_allow: bool,
    allowed_ips: HashSet<IpAddr>,
    denied_ips: HashSet<IpAddr>,
    allow_private_ranges: bool,
    ip_default_allow: bool,
    allowed_ports: HashSet<u16>,
    denied_ports: HashSet<u16>,
    port_default_allow: bool,
    allowed_hosts: HashSet<String>,
    denied_hosts: HashSet<String>,
    host_default_allow: bool,
    allow_username_in_url: bool,
    private_ranges: Arc<dyn PrivateRanges>,
}

impl PolicyBuilder {
    pub fn new() -> Self {
        Self {
            allow_http: false,
            allow_https: true,
            allowed_methods: DEFAULT_ALLOWED_METHODS.into_iter().collect(),
            denied_methods: HashSet::new(),
            method_default_allow: false,
            allowed_ips: HashSet::new(),
            denied_ips: HashSet::new(),
            allow_private_ranges: false,
            ip_default_allow: true,
            allowed_ports: DEFAULT_ALLOWED_PORTS.into_iter().collect(),
            denied_ports: HashSet::new(),
            port_default_allow: false,
            allowed_hosts: HashSet::new(),
            denied_hosts: HashSet::new(),
            host_default_allow: true,
            allow_username_in_url: false,
            private_ranges: Arc::new(ReservedRanges::new()),
        }
    }

    pub fn allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    pub fn allow_https(mut self, allow: bool) -> Self {
        self.allow_https = allow;
        self
    }

    /// Replace the allowed method list.
    pub fn allowed_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.allowed_methods = methods.into_iter().collect();
        self
    }

    /// Replace the denied method list. Denied methods win over allowed ones.
    pub fn denied_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.denied_methods = methods.into_iter().collect();
        self
    }

    pub fn method_default_allow(mut self, allow: bool) -> Self {
        self.method_default_allow = allow;
        self
    }

    /// Replace the allowed address list. These override the deny list and the
    /// private-range guard.
    pub fn allowed_ips(mut self, ips: impl IntoIterator<Item = IpAddr>) -> Self {
        self.allowed_ips = ips.into_iter().map(canonical_ip).collect();
        self
    }

    pub fn denied_ips(mut self, ips: impl IntoIterator<Item = IpAddr>) -> Self {
        self.denied_ips = ips.into_iter().map(canonical_ip).collect();
        self
    }

    pub fn allow_private_ranges(mut self, allow: bool) -> Self {
        self.allow_private_ranges = allow;
        self
    }

    pub fn ip_default_allow(mut self, allow: bool) -> Self {
        self.ip_default_allow = allow;
        self
    }

    /// Replace the allowed port list, including the 80/443/8080 defaults.
    pub fn allowed_ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.allowed_ports = ports.into_iter().collect();
        self
    }

    pub fn denied_ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.denied_ports = ports.into_iter().collect();
        self
    }

    pub fn port_default_allow(mut self, allow: bool) -> Self {
        self.port_default_allow = allow;
        self
    }

    /// Replace the allowed host list. Hosts match by exact string equality
    /// after lower-casing and dropping a trailing dot.
    pub fn allowed_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_hosts = hosts
            .into_iter()
            .map(|host| host_entry(host.into()))
            .collect();
        self
    }

    pub fn denied_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denied_hosts = hosts
            .into_iter()
            .map(|host| host_entry(host.into()))
            .collect();
        self
    }

    pub fn host_default_allow(mut self, allow: bool) -> Self {
        self.host_default_allow = allow;
        self
    }

    /// Permit URLs carrying `user[:pass]@` credentials.
    pub fn allow_username_in_url(mut self, allow: bool) -> Self {
        self.allow_username_in_url = allow;
        self
    }

    /// Swap the predicate used to detect private addresses.
    pub fn private_ranges(mut self, ranges: impl PrivateRanges + 'static) -> Self {
        self.private_ranges = Arc::new(ranges);
        self
    }

    pub fn build(self) -> Policy {
        Policy {
            allow_http: self.allow_http,
            allow_https: self.allow_https,
            allowed_methods: self.allowed_methods,
            denied_methods: self.denied_methods,
            method_default_allow: self.method_default_allow,
            allowed_ips: self.allowed_ips,
            denied_ips: self.denied_ips,
            allow_private_ranges: self.allow_private_ranges,
            ip_default_allow: self.ip_default_allow,
            allowed_ports: self.allowed_ports,
            denied_ports: self.denied_ports,
            port_default_allow: self.port_default_allow,
            allowed_hosts: self.allowed_hosts,
            denied_hosts: self.denied_hosts,
            host_default_allow: self.host_default_allow,
            allow_username_in_url: self.allow_username_in_url,
            private_ranges: self.private_ranges,
        }
    }
}

fn host_entry(host: String) -> String {
    normalize_host(&host).into_owned()
}

impl Default for PolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Classification;

    #[test]
    fn test_builder_chaining() {
        let policy = PolicyBuilder::new()
            .allow_http(true)
            .allow_https(false)
            .allowed_hosts(["a.example"])
            .denied_hosts(vec![String::from("b.example")])
            .host_default_allow(false)
            .allowed_ports([8443])
            .denied_ports([22])
            .port_default_allow(true)
            .allowed_ips(["10.0.0.1".parse().unwrap()])
            .denied_ips(["1.2.3.4".parse().unwrap()])
            .allow_private_ranges(false)
            .ip_default_allow(false)
            .allowed_methods([Method::GET])
            .denied_methods([Method::DELETE])
            .method_default_allow(true)
            .allow_username_in_url(true)
            .build();

        assert!(policy.is_scheme_allowed("http").allowed());
        assert!(!policy.is_scheme_allowed("https").allowed());
        assert_eq!(
            policy.is_host_allowed("a.example").classification(),
            Classification::AllowedUserAcl
        );
        assert_eq!(
            policy.is_host_allowed("b.example").classification(),
            Classification::DeniedUserAcl
        );
        assert_eq!(
            policy.is_host_allowed("c.example").classification(),
            Classification::DeniedDefault
        );
        assert_eq!(policy.is_port_allowed(22).classification(), Classification::DeniedUserAcl);
        assert_eq!(policy.is_port_allowed(80).classification(), Classification::AllowedDefault);
        assert_eq!(
            policy.is_ip_allowed("10.0.0.1".parse().unwrap()).classification(),
            Classification::AllowedUserAcl
        );
        assert_eq!(
            policy.is_ip_allowed("1.2.3.4".parse().unwrap()).classification(),
            Classification::DeniedUserAcl
        );
        assert_eq!(
            policy.is_ip_allowed("9.9.9.9".parse().unwrap()).classification(),
            Classification::DeniedDefault
        );
        assert_eq!(
            policy.is_method_allowed(&Method::DELETE).classification(),
            Classification::DeniedUserAcl
        );
        assert_eq!(
            policy.is_method_allowed(&Method::POST).classification(),
            Classification::AllowedDefault
        );
    }

    #[test]
    fn test_setters_replace_lists() {
        let policy = PolicyBuilder::new()
            .denied_ports([22, 23])
            .denied_ports([25])
            .build();

        assert_eq!(policy.is_port_allowed(25).classification(), Classification::DeniedUserAcl);
        assert_eq!(policy.is_port_allowed(22).classification(), Classification::DeniedDefault);
    }

    #[test]
    fn test_builder_reusable_via_clone() {
        let base = PolicyBuilder::new().allow_http(true);
        let strict = base.clone().allowed_ports([443]).build();
        let loose = base.port_default_allow(true).build();

        assert!(!strict.is_port_allowed(80).allowed());
        assert!(loose.is_port_allowed(80).allowed());
        assert!(strict.is_scheme_allowed("http").allowed());
    }

    #[test]
    fn test_default_matches_new() {
        let from_default = PolicyBuilder::default().build();
        let from_new = PolicyBuilder::new().build();
        assert_eq!(from_default.is_port_allowed(8080), from_new.is_port_allowed(8080));
        assert_eq!(
            from_default.is_port_allowed(8080).classification(),
            Classification::AllowedUserAcl
        );
    }
}
