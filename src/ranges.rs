//! Private and reserved address ranges.
//!
//! The IP classifier only asks one question of this module: is this address
//! private? It is asked through the [`PrivateRanges`] trait so operators can
//! swap or extend the table with site-specific ranges
//! without touching the classifier.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

/// Predicate deciding whether an address is private or reserved.
///
/// Any `Fn(IpAddr) -> bool + Send + Sync` closure implements it.
pub trait PrivateRanges: Send + Sync {
    fn is_private(&self, ip: IpAddr) -> bool;
}

impl<F> PrivateRanges for F
where
    F: Fn(IpAddr) -> bool + Send + Sync,
{
    fn is_private(&self, ip: IpAddr) -> bool {
        self(ip)
    }
}

const RESERVED_V4: &[Ipv4Net] = &[
    Ipv4Net::new_assert(Ipv4Addr::new(0, 0, 0, 0), 8),
    Ipv4Net::new_assert(Ipv4Addr::new(10, 0, 0, 0), 8),
    Ipv4Net::new_assert(Ipv4Addr::new(100, 64, 0, 0), 10),
    Ipv4Net::new_assert(Ipv4Addr::new(127, 0, 0, 0), 8),
    Ipv4Net::new_assert(Ipv4Addr::new(169, 254, 0, 0), 16),
    Ipv4Net::new_assert(Ipv4Addr::new(172, 16, 0, 0), 12),
    Ipv4Net::new_assert(Ipv4Addr::new(192, 168, 0, 0), 16),
];

const RESERVED_V6: &[Ipv6Net] = &[
    Ipv6Net::new_assert(Ipv6Addr::UNSPECIFIED, 128),
    Ipv6Net::new_assert(Ipv6Addr::LOCALHOST, 128),
    Ipv6Net::new_assert(Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7),
    Ipv6Net::new_assert(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10),
];

/// The bundled private-range table.
///
/// Covers RFC 1918, loopback, link-local, CGNAT shared space, the unspecified
/// block, and unique-local IPv6. IPv4 addresses embedded in IPv6 (mapped
/// `::ffff:a.b.c.d` or compatible `::a.b.c.d`) are unwrapped and checked
/// against the IPv4 table.
///
/// # Example
///
/// ```rust
/// use http_acl::{PrivateRanges, ReservedRanges};
///
/// let ranges = ReservedRanges::new().with_range("203.0.113.0/24".parse().unwrap());
/// assert!(ranges.is_private("192.168.1.1".parse().unwrap()));
/// assert!(ranges.is_private("::ffff:10.0.0.1".parse().unwrap()));
/// assert!(ranges.is_private("203.0.113.9".parse().unwrap()));
/// assert!(!ranges.is_private("1.1.1.1".parse().unwrap()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReservedRanges {
    extra: Vec<IpNet>,
}

impl ReservedRanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat an additional network as private.
    pub fn with_range(mut self, net: IpNet) -> Self {
        self.extra.push(net);
        self
    }

    /// Extra networks configured on top of the reserved table.
    pub fn extra_ranges(&self) -> &[IpNet] {
        &self.extra
    }

    fn is_extra(&self, ip: IpAddr) -> bool {
        self.extra.iter().any(|net| net.contains(&ip))
    }
}

impl PrivateRanges for ReservedRanges {
    fn is_private(&self, ip: IpAddr) -> bool {
        if self.is_extra(ip) {
            return true;
        }
        match ip {
            IpAddr::V4(v4) => is_reserved_ipv4(v4),
            IpAddr::V6(v6) => match embedded_ipv4(v6) {
                Some(v4) => is_reserved_ipv4(v4) || self.is_extra(IpAddr::V4(v4)),
                None => RESERVED_V6.iter().any(|net| net.contains(&v6)),
            },
        }
    }
}

fn is_reserved_ipv4(ip: Ipv4Addr) -> bool {
    RESERVED_V4.iter().any(|net| net.contains(&ip))
}

/// IPv4 address carried inside an IPv6 one, mapped or compatible.
///
/// `::` and `::1` are left alone: they are IPv6 unspecified and loopback, not
/// `0.0.0.0` and `0.0.0.1`.
fn embedded_ipv4(ip: Ipv6Addr) -> Option<Ipv4Addr> {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return Some(v4);
    }

    let segments = ip.segments();
    if segments[0..6] == [0, 0, 0, 0, 0, 0] && (segments[6] != 0 || segments[7] > 1) {
        let [a, b] = segments[6].to_be_bytes();
        let [c, d] = segments[7].to_be_bytes();
        return Some(Ipv4Addr::new(a, b, c, d));
    }

    None
}

/// Collapse an IPv6 address carrying an IPv4 one to the IPv4 form, so list
/// lookups see one spelling per host.
pub(crate) fn canonical_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => embedded_ipv4(v6).map_or(ip, IpAddr::V4),
        IpAddr::V4(_) => ip,
    }
}
