//! 回显语义

use std::net::SocketAddrV4;

use crate::net::Datagram;

/// 由收到的数据报构造回显数据报：载荷与序号原样返回给发送方。
///
/// `local` 为收到该数据报的接口地址与端口，作为回显的源地址。
/// 返回值沿用原数据报 id，由调用方在发送前重新编号。
pub fn echo_reply(incoming: &Datagram, local: SocketAddrV4) -> Datagram {
    Datagram {
        id: incoming.id,
        src: local,
        dst: incoming.src,
        seq: incoming.seq,
        payload: incoming.payload.clone(),
        hops_taken: 0,
    }
}
