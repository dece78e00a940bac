//! 事件与世界
//!
//! 事件由仿真器独占持有，执行时拿到仿真器本身（可继续调度/取消）
//! 和业务层的世界状态。

use super::simulator::Simulator;
use std::any::Any;

/// 事件：可被调度执行。使用 `self: Box<Self>` 以支持 move/所有权转移。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}

/// 仿真世界：由业务层实现（例如网络拓扑、应用、时间线）。
/// 事件通过 `as_any_mut` 向下转型拿到具体类型。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// 每个事件执行完毕后调用
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}

/// 事件句柄：由 `Simulator::schedule` 返回，可用于取消尚未触发的事件。
/// 句柄按调度顺序单调递增，兼作同一时刻的执行次序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u64);

/// 终止事件：触发时请求仿真器在本事件后停止运行。
#[derive(Debug)]
pub struct StopSimulation;

impl Event for StopSimulation {
    fn execute(self: Box<Self>, sim: &mut Simulator, _world: &mut dyn World) {
        sim.stop();
    }
}
