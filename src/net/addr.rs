//! IPv4 地址段与地址分配
//!
//! 每条链路分配一个独立地址段，按设备创建顺序依次绑定主机地址，
//! 跳过网络地址与广播地址。

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::{DeviceId, LinkId, NodeId};

/// 地址配置错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("mask {mask} is not a contiguous netmask")]
    InvalidMask { mask: Ipv4Addr },
    #[error("network address {network} has host bits set for mask {mask}")]
    HostBitsSet { network: Ipv4Addr, mask: Ipv4Addr },
    #[error("range {range} has {available} usable addresses but {needed} devices need one")]
    Exhausted {
        range: Ipv4Range,
        needed: usize,
        available: usize,
    },
    #[error("range {range} for {link:?} overlaps {other} already assigned to {other_link:?}")]
    Overlap {
        link: LinkId,
        range: Ipv4Range,
        other_link: LinkId,
        other: Ipv4Range,
    },
    #[error("no such link {0:?}")]
    UnknownLink(LinkId),
}

/// IPv4 地址段：(网络地址, 掩码)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ipv4Range {
    pub network: Ipv4Addr,
    pub mask: Ipv4Addr,
}

impl Ipv4Range {
    /// 校验掩码连续且网络地址不含主机位。
    pub fn new(network: Ipv4Addr, mask: Ipv4Addr) -> Result<Self, AddressError> {
        let range = Ipv4Range { network, mask };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), AddressError> {
        let m = u32::from(self.mask);
        // 连续掩码取反后加一必为 2 的幂（或 0）
        if (!m).wrapping_add(1) & !m != 0 {
            return Err(AddressError::InvalidMask { mask: self.mask });
        }
        if u32::from(self.network) & !m != 0 {
            return Err(AddressError::HostBitsSet {
                network: self.network,
                mask: self.mask,
            });
        }
        Ok(())
    }

    pub fn prefix_len(&self) -> u32 {
        u32::from(self.mask).count_ones()
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let m = u32::from(self.mask);
        u32::from(addr) & m == u32::from(self.network) & m
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network) | !u32::from(self.mask))
    }

    /// 可分配主机地址数（不含网络地址与广播地址）
    pub fn host_capacity(&self) -> usize {
        let size = u64::from(!u32::from(self.mask)) + 1;
        usize::try_from(size.saturating_sub(2)).unwrap_or(usize::MAX)
    }

    /// 两个地址段是否有交集
    pub fn overlaps(&self, other: &Ipv4Range) -> bool {
        // 取两者中较短的前缀比较
        let m = u32::from(self.mask) & u32::from(other.mask);
        u32::from(self.network) & m == u32::from(other.network) & m
    }
}

impl fmt::Display for Ipv4Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len())
    }
}

/// 接口：设备与其绑定地址
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interface {
    pub device: DeviceId,
    pub node: NodeId,
    pub link: LinkId,
    pub addr: Ipv4Addr,
    pub range: Ipv4Range,
}

/// 顺序地址分配器
#[derive(Debug, Clone)]
pub struct AddressAllocator {
    range: Ipv4Range,
    next_host: u32,
}

impl AddressAllocator {
    pub fn new(range: Ipv4Range) -> Self {
        Self { range, next_host: 1 }
    }

    pub fn range(&self) -> Ipv4Range {
        self.range
    }

    /// 为 `count` 个设备依次分配地址；容量不足时整体失败，不分配任何地址。
    pub fn assign(&mut self, count: usize) -> Result<Vec<Ipv4Addr>, AddressError> {
        let used = (self.next_host - 1) as usize;
        let available = self.range.host_capacity().saturating_sub(used);
        if count > available {
            return Err(AddressError::Exhausted {
                range: self.range,
                needed: count,
                available,
            });
        }
        let base = u32::from(self.range.network);
        let addrs = (0..count as u32)
            .map(|i| Ipv4Addr::from(base + self.next_host + i))
            .collect();
        self.next_host += count as u32;
        Ok(addrs)
    }
}
