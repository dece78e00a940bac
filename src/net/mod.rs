//! 网络模拟模块
//!
//! 此模块包含网络模拟的核心组件，如节点、设备、链路、地址、路由与数据报。

// 子模块声明
mod addr;
mod deliver_packet;
mod id;
mod link;
mod net_world;
mod network;
mod node;
mod packet;
mod routing;
mod socket;
mod stats;

// 重新导出公共接口
pub use addr::{AddressAllocator, AddressError, Interface, Ipv4Range};
pub use deliver_packet::DeliverPacket;
pub use id::{DeviceId, LinkId, NodeId};
pub use link::{Link, LinkKind, LinkParams};
pub use net_world::NetWorld;
pub use network::{Network, TopologyError};
pub use node::{Device, Node};
pub use packet::{Datagram, UDP_IPV4_HEADER_BYTES};
pub use routing::{ForwardingEntry, RoutingError, RoutingTable};
pub use socket::{EPHEMERAL_PORT_START, SocketError, SocketTable};
pub use stats::Stats;
