//! Loading policies from TOML.
//!
//! Every key is optional and falls back to the builder default, so a file
//! only states what it changes:
//!
//! ```toml
//! allow_http = false
//! allow_https = true
//! allow_private_ranges = false
//! denied_methods = ["PUT"]
//! allowed_ports = [443]
//! allowed_ips = ["10.20.23.31"]
//! extra_private_ranges = ["203.0.113.0/24"]
//! ```

use std::fs;
use std::net::IpAddr;
use std::path::Path;

use http::Method;
use ipnet::IpNet;
use serde::Deserialize;
use tracing::debug;

use crate::error::Error;
use crate::policy::Policy;
use crate::policy_builder::{PolicyBuilder, DEFAULT_ALLOWED_METHODS, DEFAULT_ALLOWED_PORTS};
use crate::ranges::ReservedRanges;

/// Serialized form of a [`Policy`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    pub allow_http: bool,
    pub allow_https: bool,

    /// Method names, matched case-insensitively on load.
    pub allowed_methods: Vec<String>,
    pub denied_methods: Vec<String>,
    pub method_default_allow: bool,

    pub allowed_ips: Vec<IpAddr>,
    pub denied_ips: Vec<IpAddr>,
    pub allow_private_ranges: bool,
    pub ip_default_allow: bool,
    /// CIDRs treated as private on top of the reserved table.
    pub extra_private_ranges: Vec<String>,

    pub allowed_ports: Vec<u16>,
    pub denied_ports: Vec<u16>,
    pub port_default_allow: bool,

    pub allowed_hosts: Vec<String>,
    pub denied_hosts: Vec<String>,
    pub host_default_allow: bool,

    pub allow_username_in_url: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allow_http: false,
            allow_https: true,
            allowed_methods: DEFAULT_ALLOWED_METHODS
                .iter()
                .map(|m| m.as_str().to_string())
                .collect(),
            denied_methods: Vec::new(),
            method_default_allow: false,
            allowed_ips: Vec::new(),
            denied_ips: Vec::new(),
            allow_private_ranges: false,
            ip_default_allow: true,
            extra_private_ranges: Vec::new(),
            allowed_ports: DEFAULT_ALLOWED_PORTS.to_vec(),
            denied_ports: Vec::new(),
            port_default_allow: false,
            allowed_hosts: Vec::new(),
            denied_hosts: Vec::new(),
            host_default_allow: true,
            allow_username_in_url: false,
        }
    }
}

impl PolicyConfig {
    /// Build the policy this config describes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for a method name that is not a valid
    /// HTTP token or a private range that is not a CIDR.
    pub fn into_policy(self) -> Result<Policy, Error> {
        let allowed_methods = parse_methods(&self.allowed_methods)?;
        let denied_methods = parse_methods(&self.denied_methods)?;

        let mut ranges = ReservedRanges::new();
        for cidr in &self.extra_private_ranges {
            let net = cidr
                .trim()
                .parse::<IpNet>()
                .map_err(|e| Error::invalid_config(format!("invalid CIDR '{cidr}': {e}")))?;
            ranges = ranges.with_range(net);
        }

        Ok(PolicyBuilder::new()
            .allow_http(self.allow_http)
            .allow_https(self.allow_https)
            .allowed_methods(allowed_methods)
            .denied_methods(denied_methods)
            .method_default_allow(self.method_default_allow)
            .allowed_ips(self.allowed_ips)
            .denied_ips(self.denied_ips)
            .allow_private_ranges(self.allow_private_ranges)
            .ip_default_allow(self.ip_default_allow)
            .allowed_ports(self.allowed_ports)
            .denied_ports(self.denied_ports)
            .port_default_allow(self.port_default_allow)
            .allowed_hosts(self.allowed_hosts)
            .denied_hosts(self.denied_hosts)
            .host_default_allow(self.host_default_allow)
            .allow_username_in_url(self.allow_username_in_url)
            .private_ranges(ranges)
            .build())
    }
}

fn parse_methods(names: &[String]) -> Result<Vec<Method>, Error> {
    names.iter().map(|name| parse_method(name)).collect()
}

/// Parse a method name the way config files spell them: surrounding
/// whitespace ignored, any case.
pub(crate) fn parse_method(name: &str) -> Result<Method, Error> {
    Method::from_bytes(name.trim().to_ascii_uppercase().as_bytes())
        .map_err(|e| Error::invalid_config(format!("invalid method '{name}': {e}")))
}

pub fn load_from_str(s: &str) -> Result<Policy, Error> {
    let config: PolicyConfig =
        toml::from_str(s).map_err(|e| Error::invalid_config(format!("invalid toml: {e}")))?;
    debug!(?config, "loaded egress acl config");
    config.into_policy()
}

pub fn load_from_file(path: impl AsRef<Path>) -> Result<Policy, Error> {
    let path = path.as_ref();
    let s = fs::read_to_string(path).map_err(|e| {
        Error::invalid_config(format!("read config {} failed: {e}", path.display()))
    })?;
    load_from_str(&s)
}
