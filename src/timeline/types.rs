use serde::{Deserialize, Serialize};

use crate::sim::SimTime;

/// 应用角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppRole {
    Server,
    Client,
}

/// 时间线事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineKind {
    /// 应用进入活动窗口
    AppStarted { app: usize, role: AppRole },
    /// 应用离开活动窗口
    AppStopped { app: usize, role: AppRole },
    /// 客户端发出一个数据报
    ClientSent { seq: u64, bytes: u32, to: String },
    /// 服务端收到数据报
    ServerReceived { bytes: u32, from: String },
    /// 服务端回显数据报
    ServerEchoed { bytes: u32, to: String },
    /// 客户端收到回显：一次完整往返
    ClientReceived {
        seq: u64,
        bytes: u32,
        from: String,
        rtt_ns: u64,
    },
    /// 数据报被丢弃（无路由、无监听端口等）
    Dropped { reason: String },
}

/// 一条时间线记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// 仿真时间（纳秒，和 `SimTime.0` 同口径）
    pub t_ns: u64,
    pub node: usize,
    pub pkt_id: Option<u64>,
    #[serde(flatten)]
    pub kind: TimelineKind,
}

/// 时间线收集器（存内存，仿真结束写 JSON 文件）
#[derive(Debug, Default, Clone)]
pub struct Timeline {
    pub events: Vec<TimelineEvent>,
}

impl Timeline {
    pub fn push(&mut self, ev: TimelineEvent) {
        self.events.push(ev);
    }

    pub fn record(&mut self, at: SimTime, node: usize, pkt_id: Option<u64>, kind: TimelineKind) {
        self.push(TimelineEvent {
            t_ns: at.0,
            node,
            pkt_id,
            kind,
        });
    }

    /// 按谓词过滤
    pub fn filter<'a>(
        &'a self,
        pred: impl Fn(&TimelineKind) -> bool + 'a,
    ) -> impl Iterator<Item = &'a TimelineEvent> + 'a {
        self.events.iter().filter(move |e| pred(&e.kind))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
