//! 静态路由表
//!
//! 在地址分配完成后一次性计算：对每个节点、每条链路的地址段生成一条转发条目。
//! 直连链路为 on-link 条目；其余链路在节点图上做 BFS，取最短路径的第一跳，
//! 等长路径按设备创建顺序取第一条，保证结果确定。

use std::collections::VecDeque;
use std::net::Ipv4Addr;

use thiserror::Error;
use tracing::debug;

use super::addr::Ipv4Range;
use super::id::{DeviceId, LinkId, NodeId};
use super::network::Network;

/// 路由错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("link {link:?} is unreachable from node {node:?}")]
    Unreachable { node: NodeId, link: LinkId },
    #[error("link {link:?} has no address range assigned")]
    Unaddressed { link: LinkId },
    #[error("node {node:?} has no route to {dst}")]
    NoRoute { node: NodeId, dst: Ipv4Addr },
    #[error("no interface owns next-hop address {addr}")]
    UnknownHost { addr: Ipv4Addr },
    #[error("routing loop from node {node:?} towards {dst}")]
    Loop { node: NodeId, dst: Ipv4Addr },
}

/// 转发条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardingEntry {
    pub dest: Ipv4Range,
    /// 出设备
    pub device: DeviceId,
    /// 出设备的接口地址
    pub iface_addr: Ipv4Addr,
    /// None 表示目的网段直连
    pub next_hop: Option<Ipv4Addr>,
    /// 到达目的网段所需跳数
    pub metric: u32,
}

/// 全网转发表：`entries[node]` 为该节点的转发条目，按链路顺序排列
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    entries: Vec<Vec<ForwardingEntry>>,
}

/// BFS 中记录的第一跳：(出设备, 下一跳地址)
type FirstHop = (DeviceId, Ipv4Addr);

impl RoutingTable {
    /// 基于当前拓扑计算全网转发表
    pub fn populate(net: &Network) -> Result<Self, RoutingError> {
        let mut ranges = Vec::with_capacity(net.links().len());
        for link in net.links() {
            ranges.push(link.range.ok_or(RoutingError::Unaddressed { link: link.id })?);
        }

        let mut entries = Vec::with_capacity(net.nodes().len());
        for node in net.nodes() {
            let (dist, first) = bfs(net, node.id)?;
            let mut table = Vec::with_capacity(ranges.len());

            for link in net.links() {
                let dest = ranges[link.id.0];
                if let Some(&dev) = node
                    .devices
                    .iter()
                    .find(|d| net.device(**d).link == link.id)
                {
                    let iface_addr = net
                        .device(dev)
                        .addr
                        .ok_or(RoutingError::Unaddressed { link: link.id })?;
                    table.push(ForwardingEntry {
                        dest,
                        device: dev,
                        iface_addr,
                        next_hop: None,
                        metric: 0,
                    });
                    continue;
                }

                // 取链路上离本节点最近的成员节点；并列时取先创建的设备
                let nearest = link
                    .devices
                    .iter()
                    .map(|d| net.device(*d).node)
                    .filter(|n| dist[n.0].is_some())
                    .min_by_key(|n| dist[n.0]);
                let Some(via) = nearest else {
                    return Err(RoutingError::Unreachable {
                        node: node.id,
                        link: link.id,
                    });
                };
                let (device, next_hop) = first[via.0].ok_or(RoutingError::Unreachable {
                    node: node.id,
                    link: link.id,
                })?;
                let iface_addr = net
                    .device(device)
                    .addr
                    .ok_or(RoutingError::Unaddressed { link: net.device(device).link })?;
                table.push(ForwardingEntry {
                    dest,
                    device,
                    iface_addr,
                    next_hop: Some(next_hop),
                    metric: dist[via.0].unwrap_or(0),
                });
            }

            debug!(node = ?node.id, entries = table.len(), "🧭 转发表已生成");
            entries.push(table);
        }

        Ok(Self { entries })
    }

    /// 节点的全部转发条目
    pub fn entries(&self, node: NodeId) -> &[ForwardingEntry] {
        self.entries.get(node.0).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// 最长前缀匹配；前缀相同时取跳数更小者
    pub fn lookup(&self, node: NodeId, dst: Ipv4Addr) -> Option<&ForwardingEntry> {
        self.entries(node)
            .iter()
            .filter(|e| e.dest.contains(dst))
            .min_by_key(|e| (std::cmp::Reverse(e.dest.prefix_len()), e.metric))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 从 `src` 出发在节点图上做 BFS，返回每个节点的跳数与第一跳。
fn bfs(net: &Network, src: NodeId) -> Result<(Vec<Option<u32>>, Vec<Option<FirstHop>>), RoutingError> {
    let n = net.nodes().len();
    let mut dist: Vec<Option<u32>> = vec![None; n];
    let mut first: Vec<Option<FirstHop>> = vec![None; n];
    let mut q: VecDeque<NodeId> = VecDeque::new();

    dist[src.0] = Some(0);
    q.push_back(src);

    while let Some(u) = q.pop_front() {
        let du = dist[u.0].unwrap_or(0);
        for &out_dev in &net.node(u).devices {
            let link = net.link(net.device(out_dev).link);
            for &peer_dev in &link.devices {
                let peer = net.device(peer_dev);
                if peer.node == u || dist[peer.node.0].is_some() {
                    continue;
                }
                dist[peer.node.0] = Some(du + 1);
                first[peer.node.0] = if u == src {
                    let addr = peer.addr.ok_or(RoutingError::Unaddressed { link: link.id })?;
                    Some((out_dev, addr))
                } else {
                    first[u.0]
                };
                q.push_back(peer.node);
            }
        }
    }

    Ok((dist, first))
}
