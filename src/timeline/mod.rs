//! 仿真时间线（可观测输出）
//!
//! 以结构化事件记录应用层的发送、接收与回显，每条带仿真时间戳，
//! 仿真结束后可整体写成 JSON。

mod types;

pub use types::{AppRole, Timeline, TimelineEvent, TimelineKind};
