//! IPv4 network blocks and key universe sampling
//!
//! The benchmark draws its lookup identifiers from the host addresses of a
//! few CIDR blocks, the same address space the importer writes entries for.

use std::{fmt, net::Ipv4Addr, str::FromStr};

use log::debug;
use rand::Rng;

use crate::error::{Result, StoreError};

/// An IPv4 CIDR block such as `8.8.8.0/24`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkBlock {
    network: Ipv4Addr,
    prefix: u8,
}

impl NetworkBlock {
    /// Builds a block, clearing any host bits set in `addr`
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self> {
        if prefix > 32 {
            return Err(StoreError::config(format!("invalid prefix length /{prefix}")));
        }
        let network = Ipv4Addr::from(u32::from(addr) & Self::mask(prefix));
        Ok(Self { network, prefix })
    }

    const fn mask(prefix: u8) -> u32 {
        if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - prefix as u32)
        }
    }

    #[must_use]
    pub const fn network(&self) -> Ipv4Addr {
        self.network
    }

    #[must_use]
    pub const fn prefix(&self) -> u8 {
        self.prefix
    }

    /// First usable host and number of usable hosts
    ///
    /// Network and broadcast addresses are excluded unless the block is a
    /// /31 or /32, where every address is usable.
    fn host_range(&self) -> (u32, u64) {
        let base = u32::from(self.network);
        let size = 1u64 << (32 - u32::from(self.prefix));
        if self.prefix >= 31 {
            (base, size)
        } else {
            (base + 1, size - 2)
        }
    }

    #[must_use]
    pub fn num_hosts(&self) -> u64 {
        self.host_range().1
    }

    /// The `index`-th usable host, if within range
    #[must_use]
    pub fn host(&self, index: u64) -> Option<Ipv4Addr> {
        let (first, count) = self.host_range();
        (index < count).then(|| Ipv4Addr::from(first + index as u32))
    }

    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        let (first, count) = self.host_range();
        (0..count).map(move |i| Ipv4Addr::from(first + i as u32))
    }
}

impl FromStr for NetworkBlock {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        let (addr, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| StoreError::config(format!("network block {s:?} is missing /prefix")))?;

        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|e| StoreError::config(format!("invalid address in {s:?}: {e}")))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|e| StoreError::config(format!("invalid prefix in {s:?}: {e}")))?;

        Self::new(addr, prefix)
    }
}

impl fmt::Display for NetworkBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

/// Samples up to `pool_size_hint` distinct host addresses across `blocks`
///
/// When the blocks hold no more hosts than requested, every host is
/// returned in block order. The result may be empty (e.g. a hint of 0);
/// rejecting an empty pool is the caller's decision.
pub fn load_universe<R: Rng + ?Sized>(
    blocks: &[String],
    pool_size_hint: usize,
    rng: &mut R,
) -> Result<Vec<String>> {
    let blocks = blocks
        .iter()
        .map(|b| b.parse::<NetworkBlock>())
        .collect::<Result<Vec<_>>>()?;

    let total: u64 = blocks.iter().map(NetworkBlock::num_hosts).sum();
    debug!(
        "Sampling {} of {} hosts from {} network blocks",
        pool_size_hint.min(total as usize),
        total,
        blocks.len()
    );

    if total <= pool_size_hint as u64 {
        return Ok(blocks
            .iter()
            .flat_map(NetworkBlock::hosts)
            .map(|ip| ip.to_string())
            .collect());
    }

    let picked = rand::seq::index::sample(rng, total as usize, pool_size_hint);
    let ids = picked
        .into_iter()
        .filter_map(|mut index| {
            for block in &blocks {
                let count = block.num_hosts() as usize;
                if index < count {
                    return block.host(index as u64);
                }
                index -= count;
            }
            None
        })
        .map(|ip| ip.to_string())
        .collect();

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn test_parse_block() {
        let block: NetworkBlock = "8.8.8.0/24".parse().unwrap();
        assert_eq!(block.network(), Ipv4Addr::new(8, 8, 8, 0));
        assert_eq!(block.prefix(), 24);
        assert_eq!(block.num_hosts(), 254);
        assert_eq!(block.to_string(), "8.8.8.0/24");

        // host bits are masked off
        let block: NetworkBlock = "10.1.2.3/16".parse().unwrap();
        assert_eq!(block.network(), Ipv4Addr::new(10, 1, 0, 0));

        assert!("10.0.0.0".parse::<NetworkBlock>().is_err());
        assert!("10.0.0.0/33".parse::<NetworkBlock>().is_err());
        assert!("10.0.0/24".parse::<NetworkBlock>().is_err());
    }

    #[test]
    fn test_hosts_exclude_network_and_broadcast() {
        let block: NetworkBlock = "192.0.2.0/30".parse().unwrap();
        let hosts: Vec<_> = block.hosts().collect();
        assert_eq!(
            hosts,
            vec![Ipv4Addr::new(192, 0, 2, 1), Ipv4Addr::new(192, 0, 2, 2)]
        );

        let single: NetworkBlock = "203.0.113.7/32".parse().unwrap();
        assert_eq!(single.hosts().collect::<Vec<_>>(), vec![Ipv4Addr::new(203, 0, 113, 7)]);
        assert_eq!(single.host(1), None);
    }

    #[test]
    fn test_load_universe_returns_all_when_small() {
        let mut rng = StdRng::seed_from_u64(7);
        let blocks = vec!["192.0.2.0/30".to_string(), "203.0.113.7/32".to_string()];
        let ids = load_universe(&blocks, 100, &mut rng).unwrap();
        assert_eq!(ids, vec!["192.0.2.1", "192.0.2.2", "203.0.113.7"]);
    }

    #[test]
    fn test_load_universe_samples_distinct() {
        let mut rng = StdRng::seed_from_u64(42);
        let blocks = vec!["8.8.8.0/24".to_string(), "1.1.1.0/24".to_string()];
        let ids = load_universe(&blocks, 100, &mut rng).unwrap();

        assert_eq!(ids.len(), 100);
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 100);
        assert!(ids
            .iter()
            .all(|ip| ip.starts_with("8.8.8.") || ip.starts_with("1.1.1.")));
    }

    #[test]
    fn test_load_universe_rejects_bad_block() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(load_universe(&["nonsense".to_string()], 10, &mut rng).is_err());
    }
}
