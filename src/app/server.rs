//! UDP 回显服务端

use std::net::SocketAddrV4;

use tracing::{info, warn};

use super::echo::echo_reply;
use super::{AppCtx, AppId, AppWindow};
use crate::net::{Datagram, NodeId};
use crate::timeline::{AppRole, TimelineKind};

/// 在活动窗口内把发到 `port` 的数据报原样回显给发送方
#[derive(Debug, Clone)]
pub struct UdpEchoServer {
    pub node: NodeId,
    pub port: u16,
    pub window: AppWindow,
    active: bool,
    received: u64,
}

impl UdpEchoServer {
    pub fn new(node: NodeId, port: u16, window: AppWindow) -> Self {
        Self {
            node,
            port,
            window,
            active: false,
            received: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// 已收到的数据报数
    pub fn received(&self) -> u64 {
        self.received
    }

    pub(crate) fn on_start(&mut self, id: AppId, ctx: &mut AppCtx<'_>) {
        if let Err(e) = ctx.sockets.bind(self.node, self.port, id) {
            warn!(error = %e, "服务端绑定端口失败，不启动");
            return;
        }
        self.active = true;
        ctx.timeline.record(
            ctx.sim.now(),
            self.node.0,
            None,
            TimelineKind::AppStarted {
                app: id.0,
                role: AppRole::Server,
            },
        );
        info!(node = ?self.node, port = self.port, "🛎️  回显服务端开始监听");
    }

    pub(crate) fn on_stop(&mut self, id: AppId, ctx: &mut AppCtx<'_>) {
        if !self.active {
            return;
        }
        self.active = false;
        ctx.sockets.unbind(self.node, self.port);
        ctx.timeline.record(
            ctx.sim.now(),
            self.node.0,
            None,
            TimelineKind::AppStopped {
                app: id.0,
                role: AppRole::Server,
            },
        );
    }

    #[tracing::instrument(skip(self, pkt, ctx), fields(node = ?self.node, pkt_id = pkt.id))]
    pub(crate) fn on_datagram(&mut self, pkt: Datagram, ctx: &mut AppCtx<'_>) {
        if !self.active {
            return;
        }
        let now = ctx.sim.now();
        self.received += 1;
        info!(
            t = %now,
            bytes = pkt.payload_len(),
            from = %pkt.src,
            "服务端收到数据报"
        );
        ctx.timeline.record(
            now,
            self.node.0,
            Some(pkt.id),
            TimelineKind::ServerReceived {
                bytes: pkt.payload_len(),
                from: pkt.src.to_string(),
            },
        );

        let local = SocketAddrV4::new(*pkt.dst.ip(), self.port);
        let mut reply = echo_reply(&pkt, local);
        reply.id = ctx.net.alloc_pkt_id();

        info!(t = %now, bytes = reply.payload_len(), to = %reply.dst, "服务端回显数据报");
        ctx.timeline.record(
            now,
            self.node.0,
            Some(reply.id),
            TimelineKind::ServerEchoed {
                bytes: reply.payload_len(),
                to: reply.dst.to_string(),
            },
        );

        let reply_id = reply.id;
        if let Err(e) = ctx.net.forward_from(self.node, reply, ctx.sim) {
            ctx.timeline.record(
                now,
                self.node.0,
                Some(reply_id),
                TimelineKind::Dropped {
                    reason: e.to_string(),
                },
            );
        }
    }
}
