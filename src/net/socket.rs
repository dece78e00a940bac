//! UDP 端口绑定表
//!
//! 应用在活动窗口开始时绑定端口，结束时解绑；到达本地地址的数据报按
//! (节点, 目的端口) 分发给对应应用。

use std::collections::HashMap;

use thiserror::Error;

use super::id::NodeId;
use crate::app::AppId;

/// 临时端口起点（与常见协议栈一致）
pub const EPHEMERAL_PORT_START: u16 = 49153;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocketError {
    #[error("port {port} already bound on node {node:?}")]
    PortInUse { node: NodeId, port: u16 },
    #[error("no ephemeral port left on node {0:?}")]
    EphemeralExhausted(NodeId),
}

#[derive(Debug, Default, Clone)]
pub struct SocketTable {
    bound: HashMap<(NodeId, u16), AppId>,
    next_ephemeral: HashMap<NodeId, u16>,
}

impl SocketTable {
    pub fn bind(&mut self, node: NodeId, port: u16, app: AppId) -> Result<(), SocketError> {
        if self.bound.contains_key(&(node, port)) {
            return Err(SocketError::PortInUse { node, port });
        }
        self.bound.insert((node, port), app);
        Ok(())
    }

    /// 在节点上绑定一个未占用的临时端口
    pub fn bind_ephemeral(&mut self, node: NodeId, app: AppId) -> Result<u16, SocketError> {
        let start = *self.next_ephemeral.get(&node).unwrap_or(&EPHEMERAL_PORT_START);
        let port = (start..=u16::MAX)
            .find(|p| !self.bound.contains_key(&(node, *p)))
            .ok_or(SocketError::EphemeralExhausted(node))?;
        self.bound.insert((node, port), app);
        self.next_ephemeral.insert(node, port.saturating_add(1));
        Ok(port)
    }

    pub fn unbind(&mut self, node: NodeId, port: u16) -> Option<AppId> {
        self.bound.remove(&(node, port))
    }

    pub fn lookup(&self, node: NodeId, port: u16) -> Option<AppId> {
        self.bound.get(&(node, port)).copied()
    }
}
