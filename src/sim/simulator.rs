//! 仿真器
//!
//! 定义事件驱动仿真器，维护当前时间与事件队列。

use super::event::{Event, EventId, World};
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use std::collections::{BinaryHeap, HashSet};
use thiserror::Error;
use tracing::{debug, info, trace};

/// 调度错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// 试图把事件调度到过去
    #[error("cannot schedule event at {at:?}: simulation time is already {now:?}")]
    InvalidTime { at: SimTime, now: SimTime },
}

/// 事件驱动仿真器：维护当前时间与事件队列。
///
/// 取消采用惰性删除：被取消事件仍留在堆中，但不再属于 `pending`，
/// 出队时直接丢弃。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
    pending: HashSet<EventId>,
    stop_requested: bool,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 尚未执行且未被取消的事件数
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// 调度事件在指定时间执行
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) -> Result<EventId, ScheduleError> {
        if at < self.now {
            return Err(ScheduleError::InvalidTime { at, now: self.now });
        }

        let id = self.push(at, Box::new(ev));
        debug!(seq = id.0, queue_size = self.pending.len(), "事件已加入队列");
        Ok(id)
    }

    /// 在当前时间之后 `delay` 处调度事件；相对时间不可能落在过去。
    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) -> EventId {
        let at = self.now.saturating_add(delay);
        let id = self.push(at, Box::new(ev));
        trace!(now = ?self.now, at = ?at, seq = id.0, "调度相对事件");
        id
    }

    fn push(&mut self, at: SimTime, ev: Box<dyn Event>) -> EventId {
        let id = EventId(self.next_seq);
        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(ScheduledEvent { at, id, ev });
        self.pending.insert(id);
        id
    }

    /// 取消尚未触发的事件。返回该事件此前是否仍在等待执行。
    pub fn cancel(&mut self, id: EventId) -> bool {
        let removed = self.pending.remove(&id);
        debug!(seq = id.0, removed, "取消事件");
        removed
    }

    /// 请求在当前事件执行完毕后停止运行。
    pub fn stop(&mut self) {
        debug!(now = ?self.now, "请求停止仿真");
        self.stop_requested = true;
    }

    /// 丢弃所有未执行事件（仿真结束时调用）。
    pub fn clear(&mut self) {
        self.q.clear();
        self.pending.clear();
    }

    /// 弹出下一个有效事件（跳过已取消的）。
    fn pop_live(&mut self, until: Option<SimTime>) -> Option<ScheduledEvent> {
        loop {
            let top = self.q.peek()?;
            if until.is_some_and(|u| top.at > u) {
                return None;
            }
            let item = self.q.pop().expect("peek then pop");
            if self.pending.remove(&item.id) {
                return Some(item);
            }
            trace!(seq = item.id.0, "跳过已取消事件");
        }
    }

    /// 运行直到事件队列为空、到达 `until` 或被请求停止。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) -> u64 {
        self.stop_requested = false;
        let mut event_count = 0;
        while let Some(item) = self.pop_live(Some(until)) {
            event_count += 1;
            self.now = item.at;
            item.ev.execute(self, world);
            world.on_tick(self);
            if self.stop_requested {
                return event_count;
            }
        }
        self.now = self.now.max(until);
        event_count
    }

    /// 运行所有事件直到队列为空或被请求停止，返回执行的事件数。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) -> u64 {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.pending.len(), "初始状态");
        self.stop_requested = false;

        let mut event_count = 0;
        while let Some(item) = self.pop_live(None) {
            event_count += 1;
            self.now = item.at;

            debug!(
                event_num = event_count,
                now = ?self.now,
                seq = item.id.0,
                remaining_queue = self.pending.len(),
                "执行事件"
            );

            item.ev.execute(self, world);
            world.on_tick(self);

            if self.stop_requested {
                info!(now = ?self.now, "⏹️  仿真被事件请求停止");
                break;
            }
        }

        info!(
            total_events = event_count,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
        event_count
    }
}
