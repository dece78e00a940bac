//! 节点与网络设备
//!
//! 节点拥有一组设备；每个设备挂接在唯一一条链路上。

use std::net::Ipv4Addr;

use super::id::{DeviceId, LinkId, NodeId};
use crate::sim::SimTime;

/// 网络节点
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    /// 按安装顺序排列的设备
    pub devices: Vec<DeviceId>,
}

impl Node {
    /// 创建新节点
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            devices: Vec::new(),
        }
    }

    /// 获取节点名称
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// 网络设备（网卡）
#[derive(Debug, Clone)]
pub struct Device {
    pub id: DeviceId,
    pub node: NodeId,
    pub link: LinkId,
    pub data_rate_bps: u64,
    /// 单向传播时延
    pub delay: SimTime,
    /// 地址分配后绑定的接口地址
    pub addr: Option<Ipv4Addr>,
}

impl Device {
    /// 计算发送指定字节数所需的时间
    pub fn tx_time(&self, bytes: u32) -> SimTime {
        // ceil(bytes*8 / bps) 秒 -> 纳秒
        if self.data_rate_bps == 0 {
            return SimTime(u64::MAX / 4);
        }
        let bits = (bytes as u128).saturating_mul(8);
        let nanos = (bits.saturating_mul(1_000_000_000u128)
            + (self.data_rate_bps as u128 - 1))
            / self.data_rate_bps as u128;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }

    /// 单跳时延：序列化时间 + 传播时延
    pub fn hop_delay(&self, bytes: u32) -> SimTime {
        self.tx_time(bytes).saturating_add(self.delay)
    }
}
