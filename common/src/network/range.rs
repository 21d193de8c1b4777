//! # Address Ranges
//!
//! A CIDR block (e.g. `192.168.1.0/24`) and the lazy iterator that walks
//! every address inside it, network and broadcast addresses included.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use pnet::ipnetwork::{IpNetwork, IpNetworkError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RangeError {
    #[error("missing prefix length in '{0}' (expected ADDRESS/PREFIX)")]
    MissingPrefix(String),
    #[error("invalid network range: {0}")]
    Network(#[from] IpNetworkError),
}

/// A network block: a base address plus a prefix length.
///
/// The stored base is always the network address, i.e. the address handed to
/// [`AddressRange::new`] with its host bits cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    network: IpNetwork,
}

impl AddressRange {
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self, RangeError> {
        let network: IpNetwork = IpNetwork::new(addr, prefix)?;
        Self::from_network(network)
    }

    fn from_network(network: IpNetwork) -> Result<Self, RangeError> {
        let network: IpNetwork = IpNetwork::new(network.network(), network.prefix())?;
        Ok(Self { network })
    }

    pub fn prefix(&self) -> u8 {
        self.network.prefix()
    }

    /// The network address.
    pub fn first(&self) -> IpAddr {
        self.network.network()
    }

    /// The highest address of the block (all host bits set).
    pub fn last(&self) -> IpAddr {
        self.network.broadcast()
    }

    /// Number of addresses in the block.
    ///
    /// Saturates at `u128::MAX` for `::/0`, which holds one more address than
    /// a `u128` can count.
    pub fn len(&self) -> u128 {
        let width: u8 = match self.network {
            IpNetwork::V4(_) => 32,
            IpNetwork::V6(_) => 128,
        };
        let host_bits: u32 = u32::from(width - self.prefix());
        1u128.checked_shl(host_bits).unwrap_or(u128::MAX)
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.network.contains(*addr)
    }

    /// Returns a fresh iterator starting at the network address.
    pub fn iter(&self) -> AddressIter {
        AddressIter {
            cursor: Some(self.first()),
            last: self.last(),
        }
    }
}

impl IntoIterator for &AddressRange {
    type Item = IpAddr;
    type IntoIter = AddressIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.network)
    }
}

impl FromStr for AddressRange {
    type Err = RangeError;

    /// Parses CIDR notation such as `10.0.0.0/8` or `2001:db8::/120`. An IPv4
    /// netmask is accepted in place of the prefix length.
    ///
    /// Host bits set in the address are cleared, so `10.0.0.7/30` is the same
    /// block as `10.0.0.4/30`. A bare address is rejected rather than read as
    /// a host route.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s: &str = s.trim();
        if !s.contains('/') {
            return Err(RangeError::MissingPrefix(s.to_string()));
        }

        Self::from_network(IpNetwork::from_str(s)?)
    }
}

/// Walks an [`AddressRange`] in ascending order.
///
/// Every item is an owned `IpAddr`, so callers can hand each one to a
/// separate task.
#[derive(Debug, Clone)]
pub struct AddressIter {
    cursor: Option<IpAddr>,
    last: IpAddr,
}

impl Iterator for AddressIter {
    type Item = IpAddr;

    fn next(&mut self) -> Option<Self::Item> {
        let current: IpAddr = self.cursor?;
        self.cursor = if current == self.last {
            None
        } else {
            successor(current)
        };
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining: u128 = match (self.cursor, self.last) {
            (None, _) => 0,
            (Some(IpAddr::V4(cur)), IpAddr::V4(last)) => {
                u128::from(u32::from(last) - u32::from(cur)) + 1
            }
            (Some(IpAddr::V6(cur)), IpAddr::V6(last)) => {
                (u128::from(last) - u128::from(cur)).saturating_add(1)
            }
            _ => 0,
        };

        match usize::try_from(remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl std::iter::FusedIterator for AddressIter {}

/// Adds one to a big-endian byte sequence, carrying into more significant
/// bytes. Returns `false` if the value wrapped around to all zeroes.
pub fn increment(octets: &mut [u8]) -> bool {
    for byte in octets.iter_mut().rev() {
        *byte = byte.wrapping_add(1);
        if *byte != 0 {
            return true;
        }
    }
    false
}

/// The next address, or `None` past the top of the address family.
pub fn successor(addr: IpAddr) -> Option<IpAddr> {
    match addr {
        IpAddr::V4(v4) => {
            let mut octets: [u8; 4] = v4.octets();
            increment(&mut octets).then(|| IpAddr::V4(Ipv4Addr::from(octets)))
        }
        IpAddr::V6(v6) => {
            let mut octets: [u8; 16] = v6.octets();
            increment(&mut octets).then(|| IpAddr::V6(Ipv6Addr::from(octets)))
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
