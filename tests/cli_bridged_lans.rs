use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "lanbridge-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(dir: &PathBuf, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

fn events_of_kind<'a>(events: &'a [Value], kind: &str) -> Vec<&'a Value> {
    events
        .iter()
        .filter(|e| e.get("kind").and_then(|k| k.as_str()) == Some(kind))
        .collect()
}

fn run_with_timeline(dir: &PathBuf, extra: &[&str]) -> (std::process::Output, Option<Vec<Value>>) {
    let out_json = dir.join("timeline.json");
    let mut args = vec!["--timeline-json", out_json.to_str().unwrap()];
    args.extend_from_slice(extra);
    let output = Command::new(env!("CARGO_BIN_EXE_bridged_lans"))
        .args(&args)
        .output()
        .expect("run bridged_lans");
    let events = fs::read_to_string(&out_json).ok().map(|raw| {
        let v: Value = serde_json::from_str(&raw).expect("parse timeline.json");
        v.as_array().expect("timeline.json must be a JSON array").clone()
    });
    (output, events)
}

#[test]
fn default_scenario_completes_one_round_trip() {
    let dir = unique_temp_dir("default");
    let (output, events) = run_with_timeline(&dir, &[]);
    assert!(
        output.status.success(),
        "bridged_lans failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sent=1, echoed=1"), "stdout={stdout}");

    let events = events.expect("timeline written");
    let sent = events_of_kind(&events, "client_sent");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].get("t_ns").and_then(|t| t.as_u64()), Some(1_000_000_000));
    assert_eq!(sent[0].get("bytes").and_then(|b| b.as_u64()), Some(1024));
    assert_eq!(events_of_kind(&events, "server_echoed").len(), 1);

    let received = events_of_kind(&events, "client_received");
    assert_eq!(received.len(), 1);
    let rtt = received[0].get("rtt_ns").and_then(|r| r.as_u64()).expect("rtt_ns");
    assert_eq!(
        received[0].get("t_ns").and_then(|t| t.as_u64()),
        Some(1_000_000_000 + rtt)
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn scenario_file_controls_packet_count_and_interval() {
    let dir = unique_temp_dir("three-packets");
    let scenario = write_file(
        &dir,
        "scenario.json",
        r#"
{
    "client": { "max_packets": 3, "interval_ms": 500, "start_ms": 1000, "stop_ms": 10000 }
}
        "#,
    );
    let (output, events) = run_with_timeline(&dir, &["--scenario", scenario.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "bridged_lans failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let events = events.expect("timeline written");
    let times = events_of_kind(&events, "client_sent")
        .iter()
        .map(|e| e.get("t_ns").and_then(|t| t.as_u64()).expect("t_ns"))
        .collect::<Vec<_>>();
    assert_eq!(times, vec![1_000_000_000, 1_500_000_000, 2_000_000_000]);
    assert_eq!(events_of_kind(&events, "client_received").len(), 3);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn overlapping_address_ranges_are_rejected() {
    let dir = unique_temp_dir("overlap");
    let scenario = write_file(
        &dir,
        "scenario.json",
        r#"
{
    "lan_a": { "nodes": 3, "range": { "network": "10.1.0.0", "mask": "255.255.0.0" } },
    "lan_b": { "nodes": 3, "range": { "network": "10.1.2.0", "mask": "255.255.255.0" } }
}
        "#,
    );
    let (output, events) = run_with_timeline(&dir, &["--scenario", scenario.to_str().unwrap()]);
    assert!(!output.status.success(), "overlapping ranges must fail");
    assert!(events.is_none(), "no timeline expected for a failed setup");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn until_ms_cuts_the_run_before_the_client_starts() {
    let dir = unique_temp_dir("until");
    let (output, events) = run_with_timeline(&dir, &["--until-ms", "500"]);
    assert!(output.status.success());

    let events = events.expect("timeline written");
    assert!(events_of_kind(&events, "client_sent").is_empty());
    assert_eq!(events_of_kind(&events, "app_started").len(), 1);

    let _ = fs::remove_dir_all(&dir);
}
