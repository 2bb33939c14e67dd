//! The URL components the composite check reads.

use url::Url;

use crate::Error;

/// The parts of a URL that matter to the policy: scheme, host, port and
/// username.
///
/// Build one with [`UrlParts::parse`], or with [`UrlParts::new`] when the
/// caller already has the components from its own HTTP stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    scheme: String,
    host: String,
    port: u16,
    username: String,
}

impl UrlParts {
    pub fn new(
        scheme: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port,
            username: username.into(),
        }
    }

    /// Parse a URL string.
    ///
    /// The scheme and host come back the way the `url` crate normalizes them:
    /// lower-cased, with IPv6 hosts bracketed. A missing port takes the
    /// scheme's well-known default, or 0 for schemes without one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the URL is malformed or has no host.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let url = Url::parse(input).map_err(|e| Error::invalid_url(input, e.to_string()))?;
        Self::from_url(&url).ok_or_else(|| Error::invalid_url(input, "URL must have a host"))
    }

    /// Extract the parts of an already-parsed URL. `None` when it has no host.
    pub fn from_url(url: &Url) -> Option<Self> {
        let host = url.host_str()?;
        Some(Self {
            scheme: url.scheme().to_string(),
            host: host.to_string(),
            port: url.port_or_known_default().unwrap_or(0),
            username: url.username().to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn has_username(&self) -> bool {
        !self.username.is_empty()
    }
}

impl TryFrom<&str> for UrlParts {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Valid URL Tests ====================

    #[test]
    fn test_parse_https() {
        let url = UrlParts::parse("https://example.com/path").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host(), "example.com");
        assert_eq!(url.port(), 443);
        assert!(!url.has_username());
    }

    #[test]
    fn test_parse_http_default_port() {
        let url = UrlParts::parse("http://example.com").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.port(), 80);
    }

    #[test]
    fn test_parse_explicit_port() {
        let url = UrlParts::parse("https://example.com:9012/").unwrap();
        assert_eq!(url.port(), 9012);
        assert_eq!(url.host(), "example.com");
    }

    #[test]
    fn test_parse_normalizes_case() {
        let url = UrlParts::parse("HTTPS://EXAMPLE.COM/").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host(), "example.com");
    }

    #[test]
    fn test_parse_ipv6_host() {
        let url = UrlParts::parse("http://[::1]:8080/").unwrap();
        assert_eq!(url.host(), "[::1]");
        assert_eq!(url.port(), 8080);
    }

    #[test]
    fn test_parse_other_scheme_keeps_known_port() {
        let url = UrlParts::parse("ftp://example.com/").unwrap();
        assert_eq!(url.scheme(), "ftp");
        assert_eq!(url.port(), 21);
    }

    #[test]
    fn test_parse_unknown_scheme_port_zero() {
        let url = UrlParts::parse("custom://example.com/").unwrap();
        assert_eq!(url.port(), 0);
    }

    // ==================== Userinfo Tests ====================

    #[test]
    fn test_parse_username() {
        let url = UrlParts::parse("http://admin:pw@example.com:9012").unwrap();
        assert_eq!(url.username(), "admin");
        assert!(url.has_username());
        assert_eq!(url.port(), 9012);
    }

    #[test]
    fn test_password_only_has_no_username() {
        let url = UrlParts::parse("https://:secret@example.com/").unwrap();
        assert!(!url.has_username());
    }

    // ==================== Invalid Input ====================

    #[test]
    fn test_reject_relative() {
        assert!(matches!(UrlParts::parse("/just/a/path"), Err(Error::InvalidUrl { .. })));
    }

    #[test]
    fn test_reject_hostless() {
        assert!(UrlParts::parse("mailto:someone@example.com").is_err());
        assert!(UrlParts::parse("data:text/html,<h1>hi</h1>").is_err());
    }

    #[test]
    fn test_new_and_try_from() {
        let built = UrlParts::new("https", "example.com", 443, "");
        let parsed = UrlParts::try_from("https://example.com/").unwrap();
        assert_eq!(built, parsed);
    }
}
