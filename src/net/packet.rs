//! 数据报类型
//!
//! 定义在仿真网络中传输的 UDP 数据报。

use std::net::SocketAddrV4;

/// IPv4 头（20 字节）+ UDP 头（8 字节）
pub const UDP_IPV4_HEADER_BYTES: u32 = 28;

/// UDP 数据报
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub id: u64,
    pub src: SocketAddrV4,
    pub dst: SocketAddrV4,
    /// 客户端发送序号，回显时原样携带
    pub seq: u64,
    pub payload: Vec<u8>,
    pub hops_taken: u32,
}

impl Datagram {
    /// 载荷字节数
    pub fn payload_len(&self) -> u32 {
        u32::try_from(self.payload.len()).unwrap_or(u32::MAX)
    }

    /// 线上字节数（含 IPv4/UDP 头）
    pub fn wire_bytes(&self) -> u32 {
        self.payload_len().saturating_add(UDP_IPV4_HEADER_BYTES)
    }

    /// 前进一跳
    pub fn advance(mut self) -> Self {
        self.hops_taken += 1;
        self
    }
}
