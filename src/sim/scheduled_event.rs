//! 调度事件
//!
//! 堆中的条目按 (时间, 事件句柄) 排序；句柄单调递增，同一时刻先调度者先执行。

use super::event::{Event, EventId};
use super::time::SimTime;
use std::cmp::Ordering;

/// 调度事件，包含执行时间、句柄和事件对象。
pub struct ScheduledEvent {
    pub(crate) at: SimTime,
    pub(crate) id: EventId,
    pub(crate) ev: Box<dyn Event>,
}

impl ScheduledEvent {
    fn key(&self) -> (SimTime, EventId) {
        (self.at, self.id)
    }
}

// BinaryHeap 是 max-heap：比较时交换左右两侧，得到最小 key 优先。
impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ScheduledEvent {}
