//! 数据报到达事件
//!
//! 定义网络模拟中的数据报到达事件。

use super::id::NodeId;
use super::net_world::NetWorld;
use super::packet::Datagram;
use crate::sim::{Event, Simulator, World};
use tracing::{debug, trace};

/// 事件：把一个数据报交给某个节点处理。
#[derive(Debug)]
pub struct DeliverPacket {
    pub to: NodeId,
    pub pkt: Datagram,
}

impl Event for DeliverPacket {
    #[tracing::instrument(skip(self, sim, world), fields(pkt_id = self.pkt.id, to = ?self.to))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPacket { to, pkt } = *self;

        debug!(
            pkt_id = pkt.id,
            wire_bytes = pkt.wire_bytes(),
            dst = %pkt.dst,
            hops_taken = pkt.hops_taken,
            now = ?sim.now(),
            "📨 数据报到达节点"
        );

        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        w.deliver(to, pkt, sim);

        trace!("DeliverPacket::execute 完成");
    }
}
