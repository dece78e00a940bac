//! 场景驱动
//!
//! 准备阶段依次执行：拓扑构建 → 地址分配 → 路由计算 → 应用安装；
//! 之后由仿真器把事件队列跑空（或跑到给定时间）。

mod spec;

pub use spec::{
    BridgeSpec, ClientSpec, LinkSpec, NodeRef, ScenarioSpec, Segment, SegmentSpec, ServerSpec,
};

use std::net::SocketAddrV4;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::app::{self, AppError, AppId, AppWindow, Application, UdpEchoClient, UdpEchoServer};
use crate::net::{AddressError, NetWorld, NodeId, RoutingError, TopologyError};
use crate::sim::{SimTime, Simulator};
use crate::topo::bridged_lans::{BridgedLans, build_bridged_lans};

/// 场景错误：汇总各组件错误
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("topology: {0}")]
    Topology(#[from] TopologyError),
    #[error("addressing: {0}")]
    Address(#[from] AddressError),
    #[error("routing: {0}")]
    Routing(#[from] RoutingError),
    #[error("application: {0}")]
    App(#[from] AppError),
    #[error("node {index} does not exist in segment {segment:?}")]
    UnknownNode { segment: Segment, index: usize },
    #[error("target node {0:?} has no address")]
    Unaddressed(NodeId),
    #[error("invalid scenario json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot read scenario: {0}")]
    Io(#[from] std::io::Error),
}

impl ScenarioSpec {
    pub fn from_json_str(raw: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

/// 准备阶段的产物：已分配地址并计算好路由的拓扑
#[derive(Debug, Clone)]
pub struct Scenario {
    pub topo: BridgedLans,
}

impl Scenario {
    /// 拓扑构建 → 地址分配 → 路由计算
    pub fn build(spec: &ScenarioSpec) -> Result<Self, ScenarioError> {
        let mut topo = build_bridged_lans(&spec.topology_opts())?;
        topo.net.assign_addresses(topo.lan_a_link, spec.lan_a.range)?;
        topo.net.assign_addresses(topo.lan_b_link, spec.lan_b.range)?;
        topo.net.assign_addresses(topo.bridge_link, spec.bridge.range)?;
        topo.net.populate_routes()?;
        info!(
            interfaces = topo.net.interfaces().len(),
            "🧱 场景准备完成"
        );
        Ok(Self { topo })
    }

    /// 解析节点引用
    pub fn node(&self, r: NodeRef) -> Result<NodeId, ScenarioError> {
        let lan = match r.segment {
            Segment::A => &self.topo.lan_a,
            Segment::B => &self.topo.lan_b,
        };
        lan.get(r.index).copied().ok_or(ScenarioError::UnknownNode {
            segment: r.segment,
            index: r.index,
        })
    }

    /// 节点在其所属网段上的地址
    pub fn segment_addr(&self, r: NodeRef) -> Result<SocketAddrV4, ScenarioError> {
        let node = self.node(r)?;
        let link = match r.segment {
            Segment::A => self.topo.lan_a_link,
            Segment::B => self.topo.lan_b_link,
        };
        let ip = self
            .topo
            .net
            .addr_on(node, link)
            .ok_or(ScenarioError::Unaddressed(node))?;
        Ok(SocketAddrV4::new(ip, 0))
    }

    /// 安装服务端与客户端，返回 (服务端, 客户端)
    pub fn install_apps(
        &self,
        spec: &ScenarioSpec,
        world: &mut NetWorld,
        sim: &mut Simulator,
    ) -> Result<(AppId, AppId), ScenarioError> {
        let server = UdpEchoServer::new(
            self.node(spec.server.node)?,
            spec.server.port,
            AppWindow::new(
                SimTime::from_millis(spec.server.start_ms),
                SimTime::from_millis(spec.server.stop_ms),
            ),
        );
        let server_id = app::install(world, sim, Application::Server(server))?;

        let mut remote = self.segment_addr(spec.client.target)?;
        remote.set_port(spec.client.target_port.unwrap_or(spec.server.port));
        let client = UdpEchoClient::new(
            self.node(spec.client.node)?,
            remote,
            spec.client.max_packets,
            SimTime::from_millis(spec.client.interval_ms),
            spec.client.payload_size,
            AppWindow::new(
                SimTime::from_millis(spec.client.start_ms),
                SimTime::from_millis(spec.client.stop_ms),
            ),
        );
        let client_id = app::install(world, sim, Application::Client(client))?;
        Ok((server_id, client_id))
    }
}

/// 一次完整运行的结果
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub world: NetWorld,
    pub final_time: SimTime,
    pub events: u64,
    pub server: AppId,
    pub client: AppId,
}

/// 运行整个场景；`until` 为 None 时跑到事件队列为空。
pub fn run_scenario(spec: &ScenarioSpec, until: Option<SimTime>) -> Result<ScenarioOutcome, ScenarioError> {
    let scenario = Scenario::build(spec)?;
    let mut sim = Simulator::default();
    let mut world = NetWorld::new(scenario.topo.net.clone());
    let (server, client) = scenario.install_apps(spec, &mut world, &mut sim)?;

    let events = match until {
        Some(t) => sim.run_until(t, &mut world),
        None => sim.run(&mut world),
    };
    let final_time = sim.now();
    // 仿真结束，丢弃剩余未执行事件
    sim.clear();

    info!(
        events,
        final_time = %final_time,
        delivered_pkts = world.net.stats.delivered_pkts,
        dropped_pkts = world.net.stats.dropped_pkts,
        "🏁 场景运行结束"
    );

    Ok(ScenarioOutcome {
        world,
        final_time,
        events,
        server,
        client,
    })
}
