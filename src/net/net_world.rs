//! 网络世界实现
//!
//! 定义网络仿真的世界（World）实现，持有网络拓扑、已安装应用、端口表与时间线。

use super::network::Network;
use super::id::NodeId;
use super::packet::Datagram;
use super::socket::SocketTable;
use crate::app::{AppCtx, AppId, Application};
use crate::sim::{Simulator, World};
use crate::timeline::{Timeline, TimelineKind};
use std::any::Any;
use tracing::{debug, trace};

/// 默认的网络世界实现。
#[derive(Debug, Default)]
pub struct NetWorld {
    pub net: Network,
    pub apps: Vec<Application>,
    pub sockets: SocketTable,
    pub timeline: Timeline,
}

impl NetWorld {
    pub fn new(net: Network) -> Self {
        Self {
            net,
            ..Self::default()
        }
    }

    /// 拆分借用：把应用与其余状态同时交给回调
    pub(crate) fn with_app(
        &mut self,
        id: AppId,
        sim: &mut Simulator,
        f: impl FnOnce(&mut Application, AppId, &mut AppCtx<'_>),
    ) {
        let NetWorld {
            net,
            apps,
            sockets,
            timeline,
        } = self;
        let Some(app) = apps.get_mut(id.0) else {
            return;
        };
        let mut ctx = AppCtx {
            net,
            sockets,
            timeline,
            sim,
        };
        f(app, id, &mut ctx);
    }

    /// 数据报到达节点：本地地址则按端口分发给应用，否则继续转发
    #[tracing::instrument(skip(self, pkt, sim), fields(pkt_id = pkt.id, to = ?to))]
    pub fn deliver(&mut self, to: NodeId, pkt: Datagram, sim: &mut Simulator) {
        if !self.net.is_local(to, *pkt.dst.ip()) {
            debug!("未到达目的地，继续转发");
            let pkt_id = pkt.id;
            if let Err(e) = self.net.forward_from(to, pkt, sim) {
                self.timeline.record(
                    sim.now(),
                    to.0,
                    Some(pkt_id),
                    TimelineKind::Dropped {
                        reason: e.to_string(),
                    },
                );
            }
            return;
        }

        self.net.on_delivered(&pkt);
        let Some(app) = self.sockets.lookup(to, pkt.dst.port()) else {
            debug!(port = pkt.dst.port(), "端口无监听，丢弃");
            self.net.stats.dropped_pkts += 1;
            self.timeline.record(
                sim.now(),
                to.0,
                Some(pkt.id),
                TimelineKind::Dropped {
                    reason: format!("port {} unreachable", pkt.dst.port()),
                },
            );
            return;
        };
        trace!(app = app.0, "分发给应用");
        self.with_app(app, sim, |app, _id, ctx| app.on_datagram(pkt, ctx));
    }
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
