//! # http-acl
//!
//! Egress access control for outbound HTTP requests.
//!
//! `http-acl` classifies each dimension of a request (scheme, method, host,
//! port and resolved IP) against an immutable [`Policy`] and says whether it
//! may proceed and why. It does not resolve names or make requests itself:
//! wire it into your client's resolver or dialer so every address is checked
//! before the socket opens, including addresses only reached through DNS.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::net::IpAddr;
//! use http_acl::{Classification, ConnectTarget, Policy};
//!
//! let policy = Policy::builder()
//!     .allow_http(false)
//!     .allow_https(true)
//!     .allow_private_ranges(false)
//!     .build();
//!
//! assert!(policy.is_url_allowed("https://example.com/blog.rss").unwrap().allowed());
//!
//! let decision = policy.is_ip_allowed("192.168.1.1".parse().unwrap());
//! assert_eq!(decision.classification(), Classification::DeniedPrivateRange);
//!
//! // Inside a resolver hook, after DNS:
//! let resolved: Vec<IpAddr> = vec!["10.0.0.12".parse().unwrap()];
//! let target = ConnectTarget::new("https", "nas.local", 443, &resolved);
//! assert!(policy.check_connect(&target).is_err());
//! ```

pub mod config;
mod decision;
mod error;
mod guard;
mod policy;
mod policy_builder;
mod ranges;
mod target;

pub use decision::{Classification, Decision};
pub use error::Error;
pub use guard::{ConnectTarget, Dimension};
pub use policy::Policy;
pub use policy_builder::{PolicyBuilder, DEFAULT_ALLOWED_METHODS, DEFAULT_ALLOWED_PORTS};
pub use ranges::{PrivateRanges, ReservedRanges};
pub use target::UrlParts;

#[cfg(feature = "python")]
mod python;

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn http_acl(m: &Bound<'_, PyModule>) -> PyResult<()> {
    python::register(m)
}
