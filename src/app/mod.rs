//! 应用调度
//!
//! 在指定节点上安装 UDP 回显服务端与客户端，每个应用有活动窗口
//! `[start, stop)`；安装时把启动与停止事件放入仿真器队列。

mod client;
mod echo;
mod server;

pub use client::{ClientSend, UdpEchoClient};
pub use echo::echo_reply;
pub use server::UdpEchoServer;

use thiserror::Error;
use tracing::{debug, info};

use crate::net::{Datagram, NetWorld, Network, NodeId, SocketTable};
use crate::sim::{Event, ScheduleError, SimTime, Simulator, World};
use crate::timeline::{AppRole, Timeline};

/// 应用标识符（即安装顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppId(pub usize);

/// 活动窗口 `[start, stop)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppWindow {
    pub start: SimTime,
    pub stop: SimTime,
}

impl AppWindow {
    pub fn new(start: SimTime, stop: SimTime) -> Self {
        Self { start, stop }
    }

    pub fn contains(&self, t: SimTime) -> bool {
        self.start <= t && t < self.stop
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("application window is empty: start {start:?} >= stop {stop:?}")]
    InvalidWindow { start: SimTime, stop: SimTime },
    #[error("no such node {0:?}")]
    UnknownNode(NodeId),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// 应用运行时可访问的世界状态
pub struct AppCtx<'a> {
    pub net: &'a mut Network,
    pub sockets: &'a mut SocketTable,
    pub timeline: &'a mut Timeline,
    pub sim: &'a mut Simulator,
}

/// 已安装的应用
#[derive(Debug, Clone)]
pub enum Application {
    Server(UdpEchoServer),
    Client(UdpEchoClient),
}

impl Application {
    pub fn node(&self) -> NodeId {
        match self {
            Application::Server(s) => s.node,
            Application::Client(c) => c.node,
        }
    }

    pub fn window(&self) -> AppWindow {
        match self {
            Application::Server(s) => s.window,
            Application::Client(c) => c.window,
        }
    }

    pub fn role(&self) -> AppRole {
        match self {
            Application::Server(_) => AppRole::Server,
            Application::Client(_) => AppRole::Client,
        }
    }

    pub fn as_client(&self) -> Option<&UdpEchoClient> {
        match self {
            Application::Client(c) => Some(c),
            Application::Server(_) => None,
        }
    }

    pub fn as_server(&self) -> Option<&UdpEchoServer> {
        match self {
            Application::Server(s) => Some(s),
            Application::Client(_) => None,
        }
    }

    pub(crate) fn on_start(&mut self, id: AppId, ctx: &mut AppCtx<'_>) {
        match self {
            Application::Server(s) => s.on_start(id, ctx),
            Application::Client(c) => c.on_start(id, ctx),
        }
    }

    pub(crate) fn on_stop(&mut self, id: AppId, ctx: &mut AppCtx<'_>) {
        match self {
            Application::Server(s) => s.on_stop(id, ctx),
            Application::Client(c) => c.on_stop(id, ctx),
        }
    }

    pub(crate) fn on_datagram(&mut self, pkt: Datagram, ctx: &mut AppCtx<'_>) {
        match self {
            Application::Server(s) => s.on_datagram(pkt, ctx),
            Application::Client(c) => c.on_datagram(pkt, ctx),
        }
    }
}

/// 安装应用：校验窗口并调度启动/停止事件。
#[tracing::instrument(skip(world, sim, app), fields(role = ?app.role(), node = ?app.node()))]
pub fn install(
    world: &mut NetWorld,
    sim: &mut Simulator,
    app: Application,
) -> Result<AppId, AppError> {
    let window = app.window();
    if window.start >= window.stop {
        return Err(AppError::InvalidWindow {
            start: window.start,
            stop: window.stop,
        });
    }
    if app.node().0 >= world.net.nodes().len() {
        return Err(AppError::UnknownNode(app.node()));
    }

    let id = AppId(world.apps.len());
    sim.schedule(window.start, AppStart { app: id })?;
    sim.schedule(window.stop, AppStop { app: id })?;
    world.apps.push(app);

    info!(app = id.0, start = ?window.start, stop = ?window.stop, "📦 安装应用");
    Ok(id)
}

/// 事件：应用进入活动窗口
#[derive(Debug)]
pub struct AppStart {
    pub app: AppId,
}

impl Event for AppStart {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        debug!(app = self.app.0, now = ?sim.now(), "应用启动");
        w.with_app(self.app, sim, |app, id, ctx| app.on_start(id, ctx));
    }
}

/// 事件：应用离开活动窗口
#[derive(Debug)]
pub struct AppStop {
    pub app: AppId,
}

impl Event for AppStop {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        debug!(app = self.app.0, now = ?sim.now(), "应用停止");
        w.with_app(self.app, sim, |app, id, ctx| app.on_stop(id, ctx));
    }
}
