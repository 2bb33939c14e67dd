//! Error types for http-acl.
//!
//! Classification itself never fails. These errors cover the edges around it:
//! parsing caller input, loading configuration, and the connect guard turning
//! a deny decision into something a connection hook can reject with.

use thiserror::Error;

use crate::decision::Decision;
use crate::guard::Dimension;

/// Errors produced while preparing input for, or acting on, a classification.
#[derive(Debug, Error)]
pub enum Error {
    /// URL could not be parsed, or has no host.
    #[error("Invalid URL: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// IP literal could not be parsed.
    #[error("Invalid IP address {value}: {reason}")]
    InvalidIp { value: String, reason: String },

    /// Policy configuration document is malformed.
    #[error("Invalid ACL config: {reason}")]
    InvalidConfig { reason: String },

    /// The resolver handed the guard an empty address list.
    #[error("No address found for DNS resolution on {host}")]
    NoAddresses { host: String },

    /// A dimension of the request was denied by the policy.
    #[error(
        "Request has been rejected from acl due to {} ({dimension} {value})",
        .decision.classification()
    )]
    Denied {
        dimension: Dimension,
        value: String,
        decision: Decision,
    },
}

impl Error {
    pub(crate) fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_ip(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIp {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    pub(crate) fn no_addresses(host: impl Into<String>) -> Self {
        Self::NoAddresses { host: host.into() }
    }

    pub(crate) fn denied(
        dimension: Dimension,
        value: impl Into<String>,
        decision: Decision,
    ) -> Self {
        Self::Denied {
            dimension,
            value: value.into(),
            decision,
        }
    }

    /// The deny decision behind this error, if it is a policy denial.
    pub fn decision(&self) -> Option<&Decision> {
        match self {
            Self::Denied { decision, .. } => Some(decision),
            _ => None,
        }
    }
}
