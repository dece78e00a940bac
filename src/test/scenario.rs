use crate::net::{Ipv4Range, UDP_IPV4_HEADER_BYTES};
use crate::scenario::{NodeRef, Scenario, ScenarioError, ScenarioSpec, Segment, run_scenario};
use crate::sim::SimTime;
use crate::timeline::{TimelineEvent, TimelineKind};
use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddrV4};

fn of_kind<'a>(events: &'a [TimelineEvent], pred: fn(&TimelineKind) -> bool) -> Vec<&'a TimelineEvent> {
    events.iter().filter(|e| pred(&e.kind)).collect()
}

#[test]
fn default_scenario_matches_the_bridged_echo_exchange() {
    let spec = ScenarioSpec::default();
    let scenario = Scenario::build(&spec).expect("build");
    let a0 = scenario.topo.lan_a[0];
    let b2 = scenario.topo.lan_b[2];
    let server_ip = Ipv4Addr::new(10, 1, 1, 1);
    let client_ip = Ipv4Addr::new(10, 1, 2, 3);
    let one_way = scenario.topo.net.path_delay(b2, server_ip, 1024).expect("b2 -> a0");
    let back = scenario.topo.net.path_delay(a0, client_ip, 1024).expect("a0 -> b2");
    assert_eq!(one_way, SimTime(3_864_640));
    assert_eq!(back, one_way);

    let outcome = run_scenario(&spec, None).expect("run");
    let events = &outcome.world.timeline.events;
    let start = SimTime::from_secs(1);

    let sent = of_kind(events, |k| matches!(k, TimelineKind::ClientSent { .. }));
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].t_ns, start.0);
    assert_eq!(sent[0].node, b2.0);
    assert_eq!(
        sent[0].kind,
        TimelineKind::ClientSent {
            seq: 0,
            bytes: 1024,
            to: "10.1.1.1:9".to_string()
        }
    );

    let received = of_kind(events, |k| matches!(k, TimelineKind::ServerReceived { .. }));
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].t_ns, start.saturating_add(one_way).0);
    assert_eq!(received[0].node, a0.0);

    let echoed = of_kind(events, |k| matches!(k, TimelineKind::ServerEchoed { .. }));
    assert_eq!(echoed.len(), 1);
    assert_eq!(echoed[0].t_ns, start.saturating_add(one_way).0);

    let round_trip = one_way.saturating_add(back);
    let back_at_client = of_kind(events, |k| matches!(k, TimelineKind::ClientReceived { .. }));
    assert_eq!(back_at_client.len(), 1);
    assert_eq!(back_at_client[0].t_ns, start.saturating_add(round_trip).0);
    assert_eq!(
        back_at_client[0].kind,
        TimelineKind::ClientReceived {
            seq: 0,
            bytes: 1024,
            from: "10.1.1.1:9".to_string(),
            rtt_ns: round_trip.0
        }
    );

    // 只发一个包：往返之后客户端不再有任何发送
    assert!(
        events
            .iter()
            .filter(|e| e.t_ns > back_at_client[0].t_ns)
            .all(|e| matches!(e.kind, TimelineKind::AppStopped { .. }))
    );
    assert_eq!(outcome.final_time, SimTime::from_secs(10));
    assert_eq!(outcome.world.net.stats.dropped_pkts, 0);
    assert_eq!(outcome.world.net.stats.delivered_pkts, 2);
}

#[test]
fn all_interfaces_get_unique_addresses_from_their_range() {
    for (m, n) in [(1, 1), (3, 3), (5, 2), (10, 7)] {
        let mut spec = ScenarioSpec::default();
        spec.lan_a.nodes = m;
        spec.lan_b.nodes = n;
        spec.bridge.a_index = m - 1;
        spec.bridge.b_index = 0;
        spec.server.node = NodeRef {
            segment: Segment::A,
            index: 0,
        };
        let scenario = Scenario::build(&spec).expect("build");
        let ifaces = scenario.topo.net.interfaces();
        assert_eq!(ifaces.len(), m + n + 2);

        let unique = ifaces.iter().map(|i| i.addr).collect::<HashSet<_>>();
        assert_eq!(unique.len(), ifaces.len());
        for iface in &ifaces {
            assert!(iface.range.contains(iface.addr));
            assert_eq!(scenario.topo.net.link(iface.link).range, Some(iface.range));
        }
    }
}

#[test]
fn repeated_setup_yields_identical_forwarding_tables() {
    let spec = ScenarioSpec::default();
    let first = Scenario::build(&spec).expect("first");
    let second = Scenario::build(&spec).expect("second");
    assert_eq!(first.topo.net.routes(), second.topo.net.routes());
    assert_eq!(first.topo.net.interfaces(), second.topo.net.interfaces());
}

#[test]
fn overlapping_ranges_abort_setup() {
    let mut spec = ScenarioSpec::default();
    spec.bridge.range = spec.lan_a.range;
    assert!(matches!(
        Scenario::build(&spec),
        Err(ScenarioError::Address(_))
    ));
}

#[test]
fn too_small_range_aborts_setup() {
    let mut spec = ScenarioSpec::default();
    spec.lan_b.nodes = 7;
    spec.lan_b.range = Ipv4Range::new(Ipv4Addr::new(10, 1, 2, 0), Ipv4Addr::new(255, 255, 255, 248))
        .expect("range");
    assert!(matches!(
        Scenario::build(&spec),
        Err(ScenarioError::Address(_))
    ));
}

#[test]
fn bad_bridge_index_aborts_setup() {
    let mut spec = ScenarioSpec::default();
    spec.bridge.b_index = 3;
    assert!(matches!(
        Scenario::build(&spec),
        Err(ScenarioError::Topology(_))
    ));
}

#[test]
fn unknown_client_node_is_reported() {
    let mut spec = ScenarioSpec::default();
    spec.client.node = NodeRef {
        segment: Segment::B,
        index: 9,
    };
    assert!(matches!(
        run_scenario(&spec, None),
        Err(ScenarioError::UnknownNode {
            segment: Segment::B,
            index: 9
        })
    ));
}

#[test]
fn run_until_stops_before_the_round_trip_completes() {
    let spec = ScenarioSpec::default();
    let outcome = run_scenario(&spec, Some(SimTime::from_millis(1_002))).expect("run");
    let events = &outcome.world.timeline.events;
    assert_eq!(of_kind(events, |k| matches!(k, TimelineKind::ClientSent { .. })).len(), 1);
    assert!(of_kind(events, |k| matches!(k, TimelineKind::ServerReceived { .. })).is_empty());
    assert_eq!(outcome.final_time, SimTime::from_millis(1_002));
}

#[test]
fn scenario_spec_parses_partial_json_with_defaults() {
    let raw = r#"
    {
        "lan_b": { "nodes": 4, "range": { "network": "10.2.0.0", "mask": "255.255.0.0" } },
        "client": { "node": { "segment": "b", "index": 3 }, "max_packets": 2, "target_port": 7 }
    }
    "#;
    let spec = ScenarioSpec::from_json_str(raw).expect("parse scenario");
    let defaults = ScenarioSpec::default();
    assert_eq!(spec.lan_a, defaults.lan_a);
    assert_eq!(spec.lan_b.nodes, 4);
    assert_eq!(spec.lan_b.link, defaults.lan_b.link);
    assert_eq!(spec.lan_b.range.prefix_len(), 16);
    assert_eq!(spec.bridge, defaults.bridge);
    assert_eq!(spec.client.node.index, 3);
    assert_eq!(spec.client.max_packets, 2);
    assert_eq!(spec.client.target_port, Some(7));
    assert_eq!(spec.client.payload_size, 1024);

    let scenario = Scenario::build(&spec).expect("build");
    assert_eq!(
        scenario.segment_addr(spec.client.target).expect("target"),
        SocketAddrV4::new(Ipv4Addr::new(10, 1, 1, 1), 0)
    );
}

#[test]
fn scenario_spec_rejects_malformed_json() {
    assert!(matches!(
        ScenarioSpec::from_json_str(r#"{ "lan_a": { "nodes": "three" } }"#),
        Err(ScenarioError::Json(_))
    ));
}

#[test]
fn wire_size_includes_udp_and_ipv4_headers() {
    assert_eq!(UDP_IPV4_HEADER_BYTES, 28);
}
