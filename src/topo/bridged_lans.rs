//! 双局域网 + 点对点桥接拓扑构建
//!
//! 拓扑结构：
//!
//! ```text
//!   LAN A (shared)              LAN B (shared)
//! a0 -- a1 -- a2 ========== b0 -- b1 -- b2
//!              (point-to-point)
//! ```
//!
//! 构建分两步：先给出不可变的 `BridgedLansOpts` 描述，再由
//! `build_bridged_lans` 一次性实例化出运行时的节点/设备/链路图。

use crate::net::{LinkId, LinkKind, LinkParams, Network, NodeId, TopologyError};
use crate::sim::SimTime;
use tracing::info;

/// 共享网段描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentOpts {
    pub nodes: usize,
    pub link: LinkParams,
}

/// 桥接描述：两侧网段各取一个节点（按下标）组成点对点链路
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeOpts {
    pub a_index: usize,
    pub b_index: usize,
    pub link: LinkParams,
}

/// 桥接拓扑配置选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgedLansOpts {
    pub lan_a: SegmentOpts,
    pub lan_b: SegmentOpts,
    pub bridge: BridgeOpts,
}

impl Default for BridgedLansOpts {
    fn default() -> Self {
        let lan = LinkParams::new(100_000_000, SimTime::from_nanos(6560));
        Self {
            lan_a: SegmentOpts { nodes: 3, link: lan },
            lan_b: SegmentOpts { nodes: 3, link: lan },
            bridge: BridgeOpts {
                a_index: 2,
                b_index: 0,
                link: LinkParams::new(5_000_000, SimTime::from_millis(2)),
            },
        }
    }
}

/// 实例化后的拓扑
#[derive(Debug, Clone)]
pub struct BridgedLans {
    pub net: Network,
    pub lan_a: Vec<NodeId>,
    pub lan_b: Vec<NodeId>,
    pub lan_a_link: LinkId,
    pub lan_b_link: LinkId,
    pub bridge_link: LinkId,
    /// 桥接节点（LAN A 侧, LAN B 侧）
    pub bridge: (NodeId, NodeId),
}

fn check_segment(name: &str, seg: &SegmentOpts, index: usize) -> Result<(), TopologyError> {
    if seg.nodes == 0 {
        return Err(TopologyError::EmptySegment {
            segment: name.to_string(),
        });
    }
    if index >= seg.nodes {
        return Err(TopologyError::BridgeIndexOutOfRange {
            segment: name.to_string(),
            index,
            len: seg.nodes,
        });
    }
    Ok(())
}

/// 构建桥接拓扑
///
/// 返回全新的 `Network`：LAN A 链路、LAN B 链路、桥接链路依次创建，
/// 设备按节点顺序安装，因此相同输入总是得到相同的图。
pub fn build_bridged_lans(opts: &BridgedLansOpts) -> Result<BridgedLans, TopologyError> {
    check_segment("a", &opts.lan_a, opts.bridge.a_index)?;
    check_segment("b", &opts.lan_b, opts.bridge.b_index)?;

    let mut net = Network::default();
    let lan_a = (0..opts.lan_a.nodes)
        .map(|i| net.add_node(format!("a{i}")))
        .collect::<Vec<_>>();
    let lan_b = (0..opts.lan_b.nodes)
        .map(|i| net.add_node(format!("b{i}")))
        .collect::<Vec<_>>();

    let lan_a_link = net.add_link(LinkKind::Shared, opts.lan_a.link, &lan_a)?;
    let lan_b_link = net.add_link(LinkKind::Shared, opts.lan_b.link, &lan_b)?;
    let bridge = (lan_a[opts.bridge.a_index], lan_b[opts.bridge.b_index]);
    let bridge_link = net.add_link(LinkKind::PointToPoint, opts.bridge.link, &[bridge.0, bridge.1])?;

    info!(
        nodes = net.nodes().len(),
        devices = net.devices().len(),
        links = net.links().len(),
        "🏗️  桥接拓扑构建完成"
    );

    Ok(BridgedLans {
        net,
        lan_a,
        lan_b,
        lan_a_link,
        lan_b_link,
        bridge_link,
        bridge,
    })
}
