//! UDP 回显客户端

use std::collections::HashMap;
use std::net::SocketAddrV4;

use tracing::{debug, info, warn};

use super::{AppCtx, AppId, AppWindow};
use crate::net::{Datagram, NetWorld, NodeId};
use crate::sim::{Event, EventId, SimTime, Simulator, World};
use crate::timeline::{AppRole, TimelineKind};

/// 向 `remote` 周期性发送固定大小的数据报，直到发满 `max_packets`
/// 或到达窗口末尾。不做重传：未收到回显只是一次未确认的发送。
#[derive(Debug, Clone)]
pub struct UdpEchoClient {
    pub node: NodeId,
    pub remote: SocketAddrV4,
    pub max_packets: u32,
    pub interval: SimTime,
    pub payload_size: u32,
    pub window: AppWindow,
    local: Option<SocketAddrV4>,
    sent: u32,
    received: u32,
    next_send: Option<EventId>,
    /// seq -> 发送时间，用于计算往返时延
    sent_at: HashMap<u64, SimTime>,
}

impl UdpEchoClient {
    pub fn new(
        node: NodeId,
        remote: SocketAddrV4,
        max_packets: u32,
        interval: SimTime,
        payload_size: u32,
        window: AppWindow,
    ) -> Self {
        Self {
            node,
            remote,
            max_packets,
            interval,
            payload_size,
            window,
            local: None,
            sent: 0,
            received: 0,
            next_send: None,
            sent_at: HashMap::new(),
        }
    }

    pub fn sent(&self) -> u32 {
        self.sent
    }

    /// 收到的回显数（完成的往返数）
    pub fn received(&self) -> u32 {
        self.received
    }

    pub fn local(&self) -> Option<SocketAddrV4> {
        self.local
    }

    pub(crate) fn on_start(&mut self, id: AppId, ctx: &mut AppCtx<'_>) {
        // 源地址取发往 remote 的出接口地址
        let Some(src_ip) = ctx
            .net
            .routes()
            .lookup(self.node, *self.remote.ip())
            .map(|e| e.iface_addr)
        else {
            warn!(node = ?self.node, remote = %self.remote, "客户端没有到服务端的路由，不启动");
            return;
        };
        let port = match ctx.sockets.bind_ephemeral(self.node, id) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "客户端绑定端口失败，不启动");
                return;
            }
        };
        self.local = Some(SocketAddrV4::new(src_ip, port));
        ctx.timeline.record(
            ctx.sim.now(),
            self.node.0,
            None,
            TimelineKind::AppStarted {
                app: id.0,
                role: AppRole::Client,
            },
        );
        info!(node = ?self.node, local = ?self.local, remote = %self.remote, "📤 回显客户端启动");

        self.next_send = Some(ctx.sim.schedule_in(SimTime::ZERO, ClientSend { app: id }));
    }

    pub(crate) fn on_stop(&mut self, id: AppId, ctx: &mut AppCtx<'_>) {
        let Some(local) = self.local.take() else {
            return;
        };
        if let Some(ev) = self.next_send.take() {
            ctx.sim.cancel(ev);
        }
        ctx.sockets.unbind(self.node, local.port());
        ctx.timeline.record(
            ctx.sim.now(),
            self.node.0,
            None,
            TimelineKind::AppStopped {
                app: id.0,
                role: AppRole::Client,
            },
        );
        debug!(sent = self.sent, received = self.received, "回显客户端停止");
    }

    #[tracing::instrument(skip(self, ctx), fields(node = ?self.node, seq = self.sent))]
    pub(crate) fn send(&mut self, id: AppId, ctx: &mut AppCtx<'_>) {
        self.next_send = None;
        let now = ctx.sim.now();
        let Some(local) = self.local else {
            return;
        };
        if self.sent >= self.max_packets || !self.window.contains(now) {
            return;
        }

        let seq = u64::from(self.sent);
        let pkt = ctx.net.make_datagram(
            local,
            self.remote,
            seq,
            vec![0u8; self.payload_size as usize],
        );
        let pkt_id = pkt.id;
        info!(t = %now, seq, bytes = self.payload_size, to = %self.remote, "客户端发送数据报");
        ctx.timeline.record(
            now,
            self.node.0,
            Some(pkt_id),
            TimelineKind::ClientSent {
                seq,
                bytes: self.payload_size,
                to: self.remote.to_string(),
            },
        );
        self.sent_at.insert(seq, now);
        self.sent += 1;

        if let Err(e) = ctx.net.forward_from(self.node, pkt, ctx.sim) {
            ctx.timeline.record(
                now,
                self.node.0,
                Some(pkt_id),
                TimelineKind::Dropped {
                    reason: e.to_string(),
                },
            );
        }

        if self.sent < self.max_packets {
            self.next_send = Some(ctx.sim.schedule_in(self.interval, ClientSend { app: id }));
        }
    }

    pub(crate) fn on_datagram(&mut self, pkt: Datagram, ctx: &mut AppCtx<'_>) {
        if self.local.is_none() {
            return;
        }
        let now = ctx.sim.now();
        let rtt = self
            .sent_at
            .get(&pkt.seq)
            .map(|t| now.saturating_sub(*t))
            .unwrap_or(SimTime::ZERO);
        self.received += 1;
        info!(
            t = %now,
            seq = pkt.seq,
            bytes = pkt.payload_len(),
            from = %pkt.src,
            rtt = ?rtt,
            "客户端收到回显"
        );
        ctx.timeline.record(
            now,
            self.node.0,
            Some(pkt.id),
            TimelineKind::ClientReceived {
                seq: pkt.seq,
                bytes: pkt.payload_len(),
                from: pkt.src.to_string(),
                rtt_ns: rtt.0,
            },
        );
    }
}

/// 事件：客户端发送下一个数据报
#[derive(Debug)]
pub struct ClientSend {
    pub app: AppId,
}

impl Event for ClientSend {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.with_app(self.app, sim, |app, id, ctx| {
            if let super::Application::Client(c) = app {
                c.send(id, ctx);
            }
        });
    }
}
