//! 双局域网桥接 UDP 回显仿真
//!
//! LAN A 的 a0 运行回显服务端，LAN B 的 b2 运行回显客户端，
//! 两个局域网经 a2 <-> b0 的点对点链路相连。

use clap::Parser;
use lanbridge_rs::scenario::{ScenarioSpec, run_scenario};
use lanbridge_rs::sim::SimTime;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    name = "bridged-lans",
    about = "两个局域网经点对点链路桥接，客户端向服务端发送 UDP 回显请求"
)]
struct Args {
    /// 场景 JSON 文件；缺省使用内置场景
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// 仿真运行到多少毫秒；缺省跑到事件队列为空
    #[arg(long)]
    until_ms: Option<u64>,

    /// 时间线 JSON 输出文件
    #[arg(long)]
    timeline_json: Option<PathBuf>,
}

fn main() -> ExitCode {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let spec = match &args.scenario {
        Some(path) => match ScenarioSpec::from_path(path) {
            Ok(s) => s,
            Err(e) => {
                error!(path = %path.display(), error = %e, "读取场景失败");
                return ExitCode::FAILURE;
            }
        },
        None => ScenarioSpec::default(),
    };

    let outcome = match run_scenario(&spec, args.until_ms.map(SimTime::from_millis)) {
        Ok(o) => o,
        Err(e) => {
            error!(error = %e, "场景运行失败");
            return ExitCode::FAILURE;
        }
    };

    for ev in &outcome.world.timeline.events {
        info!(t_ns = ev.t_ns, node = ev.node, pkt_id = ?ev.pkt_id, kind = ?ev.kind, "🕒 时间线");
    }

    let client = outcome.world.apps[outcome.client.0].as_client();
    println!(
        "done @ {:?}, events={}, sent={}, echoed={}, delivered_pkts={}, dropped_pkts={}",
        outcome.final_time,
        outcome.events,
        client.map(|c| c.sent()).unwrap_or(0),
        client.map(|c| c.received()).unwrap_or(0),
        outcome.world.net.stats.delivered_pkts,
        outcome.world.net.stats.dropped_pkts,
    );

    if let Some(path) = args.timeline_json {
        let json = match serde_json::to_string_pretty(&outcome.world.timeline.events) {
            Ok(j) => j,
            Err(e) => {
                error!(error = %e, "序列化时间线失败");
                return ExitCode::FAILURE;
            }
        };
        if let Err(e) = fs::write(&path, json) {
            error!(path = %path.display(), error = %e, "写入时间线失败");
            return ExitCode::FAILURE;
        }
        eprintln!("wrote timeline events to {}", path.display());
    }

    ExitCode::SUCCESS
}
