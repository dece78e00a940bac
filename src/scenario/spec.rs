//! 场景配置（JSON）
//!
//! 每个字段都有默认值，缺省时得到原始场景：两个 3 节点局域网，
//! LAN A 的 a2 与 LAN B 的 b0 之间用点对点链路桥接，
//! a0 上运行回显服务端，b2 上运行回显客户端。

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::net::{Ipv4Range, LinkParams};
use crate::sim::SimTime;
use crate::topo::bridged_lans::{BridgeOpts, BridgedLansOpts, SegmentOpts};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScenarioSpec {
    pub lan_a: SegmentSpec,
    pub lan_b: SegmentSpec,
    pub bridge: BridgeSpec,
    pub server: ServerSpec,
    pub client: ClientSpec,
}

/// 节点所在网段
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    A,
    B,
}

/// 按 (网段, 下标) 引用节点
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeRef {
    pub segment: Segment,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkSpec {
    pub data_rate_bps: u64,
    pub delay_ns: u64,
}

impl LinkSpec {
    pub fn params(&self) -> LinkParams {
        LinkParams::new(self.data_rate_bps, SimTime::from_nanos(self.delay_ns))
    }
}

/// 网段给出时节点数与地址段必填，链路参数可缺省
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SegmentSpec {
    pub nodes: usize,
    #[serde(default = "default_lan_link")]
    pub link: LinkSpec,
    pub range: Ipv4Range,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeSpec {
    pub a_index: usize,
    pub b_index: usize,
    pub link: LinkSpec,
    pub range: Ipv4Range,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSpec {
    pub node: NodeRef,
    pub port: u16,
    pub start_ms: u64,
    pub stop_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientSpec {
    pub node: NodeRef,
    /// 目标节点；地址取其所在网段上的接口地址
    pub target: NodeRef,
    /// 目标端口；缺省为服务端端口
    pub target_port: Option<u16>,
    pub max_packets: u32,
    pub interval_ms: u64,
    pub payload_size: u32,
    pub start_ms: u64,
    pub stop_ms: u64,
}

const LAN_LINK: LinkSpec = LinkSpec {
    data_rate_bps: 100_000_000,
    delay_ns: 6560,
};

fn default_lan_link() -> LinkSpec {
    LAN_LINK
}

const fn slash24(a: u8, b: u8, c: u8) -> Ipv4Range {
    Ipv4Range {
        network: Ipv4Addr::new(a, b, c, 0),
        mask: Ipv4Addr::new(255, 255, 255, 0),
    }
}

impl Default for SegmentSpec {
    fn default() -> Self {
        Self {
            nodes: 3,
            link: LAN_LINK,
            range: slash24(10, 1, 1),
        }
    }
}

impl Default for BridgeSpec {
    fn default() -> Self {
        Self {
            a_index: 2,
            b_index: 0,
            link: LinkSpec {
                data_rate_bps: 5_000_000,
                delay_ns: 2_000_000,
            },
            range: slash24(192, 168, 200),
        }
    }
}

impl Default for ServerSpec {
    fn default() -> Self {
        Self {
            node: NodeRef {
                segment: Segment::A,
                index: 0,
            },
            port: 9,
            start_ms: 0,
            stop_ms: 10_000,
        }
    }
}

impl Default for ClientSpec {
    fn default() -> Self {
        Self {
            node: NodeRef {
                segment: Segment::B,
                index: 2,
            },
            target: NodeRef {
                segment: Segment::A,
                index: 0,
            },
            target_port: None,
            max_packets: 1,
            interval_ms: 1_000,
            payload_size: 1024,
            start_ms: 1_000,
            stop_ms: 10_000,
        }
    }
}

impl Default for ScenarioSpec {
    fn default() -> Self {
        Self {
            lan_a: SegmentSpec::default(),
            lan_b: SegmentSpec {
                range: slash24(10, 1, 2),
                ..SegmentSpec::default()
            },
            bridge: BridgeSpec::default(),
            server: ServerSpec::default(),
            client: ClientSpec::default(),
        }
    }
}

impl ScenarioSpec {
    /// 拓扑部分的描述
    pub fn topology_opts(&self) -> BridgedLansOpts {
        BridgedLansOpts {
            lan_a: SegmentOpts {
                nodes: self.lan_a.nodes,
                link: self.lan_a.link.params(),
            },
            lan_b: SegmentOpts {
                nodes: self.lan_b.nodes,
                link: self.lan_b.link.params(),
            },
            bridge: BridgeOpts {
                a_index: self.bridge.a_index,
                b_index: self.bridge.b_index,
                link: self.bridge.link.params(),
            },
        }
    }
}
