//! IP range keys
//!
//! Parses the CIDR-or-exact-address strings that key geolocation records
//! and answers point-in-range containment. Ranges are held as a network
//! value plus prefix length in the 128-bit address space, with IPv4
//! occupying the low 32 bits (prefix lengths shifted by 96), so a single
//! mask comparison covers both families. Addresses never match across
//! families.

use crate::error::{GeoError, Result};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// A parsed CIDR or exact-address range key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IpRange {
    network: u128,
    prefix_len: u8,
    is_v4: bool,
}

impl IpRange {
    /// Parse a range key: either CIDR notation ("10.0.0.0/8") or a bare
    /// address, which is treated as a /32 (v4) or /128 (v6) range.
    pub fn parse(key: &str) -> Result<Self> {
        if let Some(slash_pos) = key.find('/') {
            let addr_str = &key[..slash_pos];
            let prefix_str = &key[slash_pos + 1..];
            let addr: IpAddr = addr_str.parse().map_err(|_| {
                GeoError::InvalidArgument(format!("invalid range key address: {}", key))
            })?;
            let prefix_len: u8 = prefix_str.parse().map_err(|_| {
                GeoError::InvalidArgument(format!("invalid range key prefix: {}", key))
            })?;
            let max_prefix = if addr.is_ipv4() { 32 } else { 128 };
            if prefix_len > max_prefix {
                return Err(GeoError::InvalidArgument(format!(
                    "prefix length {} exceeds {} in range key {}",
                    prefix_len, max_prefix, key
                )));
            }
            Ok(Self::from_parts(addr, prefix_len))
        } else {
            let addr: IpAddr = key.parse().map_err(|_| {
                GeoError::InvalidArgument(format!("invalid range key address: {}", key))
            })?;
            let prefix_len = if addr.is_ipv4() { 32 } else { 128 };
            Ok(Self::from_parts(addr, prefix_len))
        }
    }

    fn from_parts(addr: IpAddr, prefix_len: u8) -> Self {
        let (bits, wide_prefix, is_v4) = match addr {
            IpAddr::V4(v4) => (u32::from(v4) as u128, 96 + prefix_len, true),
            IpAddr::V6(v6) => (u128::from(v6), prefix_len, false),
        };
        let mask = prefix_mask(wide_prefix);
        Self {
            network: bits & mask,
            prefix_len: wide_prefix,
            is_v4,
        }
    }

    /// True when the address falls inside this range. Cross-family
    /// comparisons are always false.
    pub fn contains(&self, addr: IpAddr) -> bool {
        let (bits, is_v4) = match addr {
            IpAddr::V4(v4) => (u32::from(v4) as u128, true),
            IpAddr::V6(v6) => (u128::from(v6), false),
        };
        if is_v4 != self.is_v4 {
            return false;
        }
        bits & prefix_mask(self.prefix_len) == self.network
    }

    /// Prefix length in the 128-bit space (IPv4 prefixes are offset by 96),
    /// so longer values are always more specific regardless of family.
    pub fn specificity(&self) -> u8 {
        self.prefix_len
    }
}

impl FromStr for IpRange {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_v4 {
            let v4 = std::net::Ipv4Addr::from((self.network & 0xffff_ffff) as u32);
            write!(f, "{}/{}", v4, self.prefix_len - 96)
        } else {
            let v6 = std::net::Ipv6Addr::from(self.network);
            write!(f, "{}/{}", v6, self.prefix_len)
        }
    }
}

fn prefix_mask(prefix_len: u8) -> u128 {
    if prefix_len == 0 {
        0
    } else {
        u128::MAX << (128 - prefix_len as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cidr() {
        let range = IpRange::parse("1.0.0.0/25").unwrap();
        assert!(range.contains("1.0.0.0".parse().unwrap()));
        assert!(range.contains("1.0.0.127".parse().unwrap()));
        assert!(!range.contains("1.0.0.128".parse().unwrap()));
    }

    #[test]
    fn test_parse_exact_address() {
        let range = IpRange::parse("203.0.113.7").unwrap();
        assert!(range.contains("203.0.113.7".parse().unwrap()));
        assert!(!range.contains("203.0.113.8".parse().unwrap()));
    }

    #[test]
    fn test_parse_ipv6_cidr() {
        let range = IpRange::parse("2001:db8::/32").unwrap();
        assert!(range.contains("2001:db8::1".parse().unwrap()));
        assert!(!range.contains("2001:db9::1".parse().unwrap()));
    }

    #[test]
    fn test_no_cross_family_match() {
        let v4 = IpRange::parse("0.0.0.0/0").unwrap();
        assert!(!v4.contains("::1".parse().unwrap()));
        let v6 = IpRange::parse("::/0").unwrap();
        assert!(!v6.contains("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_invalid_keys_rejected() {
        assert!(IpRange::parse("not-an-ip").is_err());
        assert!(IpRange::parse("10.0.0.0/33").is_err());
        assert!(IpRange::parse("10.0.0.0/abc").is_err());
        assert!(IpRange::parse("2001:db8::/129").is_err());
    }

    #[test]
    fn test_specificity_orders_v4_over_broad_v6() {
        let narrow = IpRange::parse("10.0.0.0/24").unwrap();
        let broad = IpRange::parse("10.0.0.0/8").unwrap();
        assert!(narrow.specificity() > broad.specificity());
    }

    #[test]
    fn test_display_round_trip() {
        for key in ["10.0.0.0/8", "203.0.113.7/32", "2001:db8::/32"] {
            let range = IpRange::parse(key).unwrap();
            assert_eq!(range.to_string(), key);
        }
    }
}
