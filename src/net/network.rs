//! 网络拓扑管理
//!
//! 定义网络拓扑结构，包含节点、设备、链路、地址、转发表与数据报转发。
//! 拓扑在准备阶段构建完成后只读，仿真阶段只更新统计信息。

use std::net::{Ipv4Addr, SocketAddrV4};

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::addr::{AddressAllocator, AddressError, Interface, Ipv4Range};
use super::deliver_packet::DeliverPacket;
use super::id::{DeviceId, LinkId, NodeId};
use super::link::{Link, LinkKind, LinkParams};
use super::node::{Device, Node};
use super::packet::{Datagram, UDP_IPV4_HEADER_BYTES};
use super::routing::{RoutingError, RoutingTable};
use super::stats::Stats;
use crate::sim::{SimTime, Simulator};

/// 拓扑构建错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("segment {segment} has no nodes")]
    EmptySegment { segment: String },
    #[error("bridge index {index} out of range for segment {segment} with {len} nodes")]
    BridgeIndexOutOfRange {
        segment: String,
        index: usize,
        len: usize,
    },
    #[error("point-to-point link needs exactly 2 nodes, got {got}")]
    PointToPointArity { got: usize },
    #[error("no such node {0:?}")]
    UnknownNode(NodeId),
}

/// 网络拓扑
#[derive(Debug, Default, Clone)]
pub struct Network {
    nodes: Vec<Node>,
    devices: Vec<Device>,
    links: Vec<Link>,
    routes: RoutingTable,
    next_pkt_id: u64,
    pub stats: Stats,
}

impl Network {
    /// 添加节点
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id, name));
        id
    }

    /// 创建链路，并为每个成员节点安装一个挂接到该链路的设备
    pub fn add_link(
        &mut self,
        kind: LinkKind,
        params: LinkParams,
        members: &[NodeId],
    ) -> Result<LinkId, TopologyError> {
        if kind == LinkKind::PointToPoint && members.len() != 2 {
            return Err(TopologyError::PointToPointArity { got: members.len() });
        }
        if let Some(&bad) = members.iter().find(|n| n.0 >= self.nodes.len()) {
            return Err(TopologyError::UnknownNode(bad));
        }

        let link_id = LinkId(self.links.len());
        let mut link = Link::new(link_id, kind, params);
        for &node in members {
            let dev_id = DeviceId(self.devices.len());
            self.devices.push(Device {
                id: dev_id,
                node,
                link: link_id,
                data_rate_bps: params.data_rate_bps,
                delay: params.delay,
                addr: None,
            });
            self.nodes[node.0].devices.push(dev_id);
            link.devices.push(dev_id);
        }
        debug!(link = ?link_id, kind = ?kind, members = members.len(), "🔗 创建链路");
        self.links.push(link);
        Ok(link_id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn device(&self, id: DeviceId) -> &Device {
        &self.devices[id.0]
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    /// 为链路分配地址段并绑定各设备地址。
    ///
    /// 跨链路地址段重叠在这里统一检查；对同一链路重复分配会替换原地址段。
    #[tracing::instrument(skip(self), fields(range = %range))]
    pub fn assign_addresses(
        &mut self,
        link: LinkId,
        range: Ipv4Range,
    ) -> Result<Vec<Interface>, AddressError> {
        range.validate()?;
        if link.0 >= self.links.len() {
            return Err(AddressError::UnknownLink(link));
        }
        let clash = self
            .links
            .iter()
            .filter(|other| other.id != link)
            .find_map(|other| other.range.filter(|r| r.overlaps(&range)).map(|r| (other.id, r)));
        if let Some((other_link, other)) = clash {
            return Err(AddressError::Overlap {
                link,
                range,
                other_link,
                other,
            });
        }

        let members = self.links[link.0].devices.clone();
        let addrs = AddressAllocator::new(range).assign(members.len())?;
        self.links[link.0].range = Some(range);

        let mut ifaces = Vec::with_capacity(members.len());
        for (dev_id, addr) in members.into_iter().zip(addrs) {
            let dev = &mut self.devices[dev_id.0];
            dev.addr = Some(addr);
            trace!(device = ?dev_id, node = ?dev.node, %addr, "绑定接口地址");
            ifaces.push(Interface {
                device: dev_id,
                node: dev.node,
                link,
                addr,
                range,
            });
        }
        info!(link = ?link, interfaces = ifaces.len(), "📇 地址分配完成");
        Ok(ifaces)
    }

    /// 所有已绑定地址的接口（按设备顺序）
    pub fn interfaces(&self) -> Vec<Interface> {
        self.devices
            .iter()
            .filter_map(|d| {
                let addr = d.addr?;
                let range = self.links[d.link.0].range?;
                Some(Interface {
                    device: d.id,
                    node: d.node,
                    link: d.link,
                    addr,
                    range,
                })
            })
            .collect()
    }

    /// 节点在指定链路上的接口地址
    pub fn addr_on(&self, node: NodeId, link: LinkId) -> Option<Ipv4Addr> {
        self.nodes[node.0]
            .devices
            .iter()
            .map(|d| &self.devices[d.0])
            .find(|d| d.link == link)
            .and_then(|d| d.addr)
    }

    /// 拥有该地址的节点
    pub fn node_of_addr(&self, addr: Ipv4Addr) -> Option<NodeId> {
        self.devices
            .iter()
            .find(|d| d.addr == Some(addr))
            .map(|d| d.node)
    }

    /// 地址是否属于该节点的某个接口
    pub fn is_local(&self, node: NodeId, addr: Ipv4Addr) -> bool {
        self.nodes[node.0]
            .devices
            .iter()
            .any(|d| self.devices[d.0].addr == Some(addr))
    }

    /// 计算（或重算）全网转发表；重复调用整体替换，不会累积条目。
    pub fn populate_routes(&mut self) -> Result<(), RoutingError> {
        self.routes = RoutingTable::populate(self)?;
        Ok(())
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    /// 查询从 `from` 发往 `dst` 的出设备与下一跳节点
    pub fn next_hop(&self, from: NodeId, dst: Ipv4Addr) -> Result<(DeviceId, NodeId), RoutingError> {
        let entry = self
            .routes
            .lookup(from, dst)
            .ok_or(RoutingError::NoRoute { node: from, dst })?;
        let target = entry.next_hop.unwrap_or(dst);
        let out_link = self.devices[entry.device.0].link;
        let next = self.links[out_link.0]
            .devices
            .iter()
            .map(|d| &self.devices[d.0])
            .find(|d| d.addr == Some(target))
            .map(|d| d.node)
            .ok_or(RoutingError::UnknownHost { addr: target })?;
        Ok((entry.device, next))
    }

    /// 沿转发表走出的节点路径（含首尾）
    pub fn path(&self, src: NodeId, dst: Ipv4Addr) -> Result<Vec<(NodeId, Option<DeviceId>)>, RoutingError> {
        let mut hops = Vec::new();
        let mut at = src;
        while !self.is_local(at, dst) {
            if hops.len() > self.nodes.len() {
                return Err(RoutingError::Loop { node: src, dst });
            }
            let (dev, next) = self.next_hop(at, dst)?;
            hops.push((at, Some(dev)));
            at = next;
        }
        hops.push((at, None));
        Ok(hops)
    }

    /// 载荷为 `payload_bytes` 的数据报从 `src` 到 `dst` 的累计单向时延
    pub fn path_delay(&self, src: NodeId, dst: Ipv4Addr, payload_bytes: u32) -> Result<SimTime, RoutingError> {
        let wire = payload_bytes.saturating_add(UDP_IPV4_HEADER_BYTES);
        Ok(self
            .path(src, dst)?
            .iter()
            .filter_map(|(_, dev)| *dev)
            .fold(SimTime::ZERO, |acc, dev| {
                acc.saturating_add(self.devices[dev.0].hop_delay(wire))
            }))
    }

    /// 分配新的数据报 id
    pub fn alloc_pkt_id(&mut self) -> u64 {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        id
    }

    /// 创建数据报
    pub fn make_datagram(
        &mut self,
        src: SocketAddrV4,
        dst: SocketAddrV4,
        seq: u64,
        payload: Vec<u8>,
    ) -> Datagram {
        let id = self.alloc_pkt_id();
        Datagram {
            id,
            src,
            dst,
            seq,
            payload,
            hops_taken: 0,
        }
    }

    /// 从指定节点转发数据报：查表得到出设备，按单跳时延调度到达事件
    #[tracing::instrument(skip(self, sim, pkt), fields(pkt_id = pkt.id, from = ?from, dst = %pkt.dst))]
    pub fn forward_from(
        &mut self,
        from: NodeId,
        pkt: Datagram,
        sim: &mut Simulator,
    ) -> Result<(), RoutingError> {
        debug!("🚀 从指定节点转发数据报");

        let (dev_id, to) = match self.next_hop(from, *pkt.dst.ip()) {
            Ok(hop) => hop,
            Err(e) => {
                warn!(error = %e, "无法转发，丢弃数据报");
                self.stats.dropped_pkts += 1;
                return Err(e);
            }
        };
        let dev = &self.devices[dev_id.0];
        let tx_time = dev.tx_time(pkt.wire_bytes());
        let delay = tx_time.saturating_add(dev.delay);

        trace!(
            now = ?sim.now(),
            device = ?dev_id,
            tx_time = ?tx_time,
            prop_delay = ?dev.delay,
            to = ?to,
            "计算单跳时延"
        );

        self.stats.forwarded_pkts += 1;
        sim.schedule_in(delay, DeliverPacket { to, pkt: pkt.advance() });
        Ok(())
    }

    /// 数据报送达目的节点时的统计
    pub(crate) fn on_delivered(&mut self, pkt: &Datagram) {
        self.stats.delivered_pkts += 1;
        self.stats.delivered_bytes += u64::from(pkt.payload_len());
        debug!(
            pkt_id = pkt.id,
            delivered_pkts = self.stats.delivered_pkts,
            "✅ 数据报送达目的地"
        );
    }
}
