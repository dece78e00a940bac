//! 链路类型
//!
//! 共享网段（广播域）或点对点链路，各自拥有一个地址段。

use serde::{Deserialize, Serialize};

use super::addr::Ipv4Range;
use super::id::{DeviceId, LinkId};
use crate::sim::SimTime;

/// 链路种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// 共享广播网段
    Shared,
    /// 点对点链路（恰好两个设备）
    PointToPoint,
}

/// 链路参数：安装时复制到每个设备上
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkParams {
    pub data_rate_bps: u64,
    pub delay: SimTime,
}

impl LinkParams {
    pub fn new(data_rate_bps: u64, delay: SimTime) -> Self {
        Self {
            data_rate_bps,
            delay,
        }
    }
}

/// 网络链路
#[derive(Debug, Clone)]
pub struct Link {
    pub id: LinkId,
    pub kind: LinkKind,
    pub params: LinkParams,
    /// 按创建顺序排列的成员设备
    pub devices: Vec<DeviceId>,
    /// 分配给本链路的地址段
    pub range: Option<Ipv4Range>,
}

impl Link {
    /// 创建新链路
    pub fn new(id: LinkId, kind: LinkKind, params: LinkParams) -> Self {
        Self {
            id,
            kind,
            params,
            devices: Vec::new(),
            range: None,
        }
    }
}
