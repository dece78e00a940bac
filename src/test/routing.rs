use crate::net::{Ipv4Range, LinkKind, LinkParams, Network, RoutingError, RoutingTable};
use crate::sim::SimTime;
use crate::topo::bridged_lans::{BridgedLans, BridgedLansOpts, build_bridged_lans};
use std::net::Ipv4Addr;

fn slash24(a: u8, b: u8, c: u8) -> Ipv4Range {
    Ipv4Range::new(Ipv4Addr::new(a, b, c, 0), Ipv4Addr::new(255, 255, 255, 0)).expect("range")
}

fn addressed(opts: &BridgedLansOpts) -> BridgedLans {
    let mut topo = build_bridged_lans(opts).expect("build");
    topo.net
        .assign_addresses(topo.lan_a_link, slash24(10, 1, 1))
        .expect("lan a");
    topo.net
        .assign_addresses(topo.lan_b_link, slash24(10, 1, 2))
        .expect("lan b");
    topo.net
        .assign_addresses(topo.bridge_link, slash24(192, 168, 200))
        .expect("p2p");
    topo.net.populate_routes().expect("routes");
    topo
}

#[test]
fn every_node_has_one_entry_per_link() {
    let topo = addressed(&BridgedLansOpts::default());
    for node in topo.net.nodes() {
        let entries = topo.net.routes().entries(node.id);
        assert_eq!(entries.len(), 3, "node {}", node.name());
        let on_link = entries.iter().filter(|e| e.next_hop.is_none()).count();
        assert_eq!(on_link, node.devices.len(), "node {}", node.name());
    }
}

#[test]
fn first_hops_follow_the_bridge() {
    let topo = addressed(&BridgedLansOpts::default());
    let net = &topo.net;
    let (a0, a2) = (topo.lan_a[0], topo.lan_a[2]);
    let (b0, b2) = (topo.lan_b[0], topo.lan_b[2]);

    // a0 -> LAN B：经 LAN A 交给 a2
    let e = net.routes().lookup(a0, Ipv4Addr::new(10, 1, 2, 3)).expect("a0 -> b2");
    assert_eq!(net.device(e.device).link, topo.lan_a_link);
    assert_eq!(e.next_hop, Some(Ipv4Addr::new(10, 1, 1, 3)));
    assert_eq!(e.metric, 2);

    // b2 -> LAN A：经 LAN B 交给 b0
    let e = net.routes().lookup(b2, Ipv4Addr::new(10, 1, 1, 1)).expect("b2 -> a0");
    assert_eq!(net.device(e.device).link, topo.lan_b_link);
    assert_eq!(e.next_hop, Some(Ipv4Addr::new(10, 1, 2, 1)));

    // a2 -> LAN B：走点对点链路
    let e = net.routes().lookup(a2, Ipv4Addr::new(10, 1, 2, 2)).expect("a2 -> b1");
    assert_eq!(net.device(e.device).link, topo.bridge_link);
    assert_eq!(e.next_hop, Some(Ipv4Addr::new(192, 168, 200, 2)));
    assert_eq!(e.iface_addr, Ipv4Addr::new(192, 168, 200, 1));

    // b0 直连点对点网段
    let e = net.routes().lookup(b0, Ipv4Addr::new(192, 168, 200, 1)).expect("b0 -> a2");
    assert_eq!(e.next_hop, None);
}

#[test]
fn every_ordered_pair_routes_along_the_unique_path() {
    for (m, n, ai, bi) in [(3, 3, 2, 0), (1, 1, 0, 0), (4, 2, 0, 1), (2, 5, 1, 4)] {
        let mut opts = BridgedLansOpts::default();
        opts.lan_a.nodes = m;
        opts.lan_b.nodes = n;
        opts.bridge.a_index = ai;
        opts.bridge.b_index = bi;
        let topo = addressed(&opts);
        let net = &topo.net;
        let side_a = |id| topo.lan_a.contains(&id);

        for x in net.nodes() {
            for iface in net.interfaces() {
                if iface.node == x.id {
                    continue;
                }
                let path = net.path(x.id, iface.addr).expect("path");
                let hops = path.iter().map(|(n, _)| *n).collect::<Vec<_>>();
                assert_eq!(hops.first(), Some(&x.id));
                assert_eq!(hops.last(), Some(&iface.node));

                // 树形拓扑：同侧最多一跳，跨侧时必须经过两个桥接节点
                let crosses = side_a(x.id) != side_a(iface.node);
                if crosses {
                    assert!(hops.contains(&topo.bridge.0), "{hops:?}");
                    assert!(hops.contains(&topo.bridge.1), "{hops:?}");
                }
                assert!(hops.len() <= 4, "{hops:?}");

                let mut dedup = hops.clone();
                dedup.sort();
                dedup.dedup();
                assert_eq!(dedup.len(), hops.len(), "loop in {hops:?}");
            }
        }
    }
}

#[test]
fn populate_is_idempotent() {
    let mut topo = addressed(&BridgedLansOpts::default());
    let before = topo.net.routes().clone();
    topo.net.populate_routes().expect("second populate");
    assert_eq!(topo.net.routes(), &before);

    let again = addressed(&BridgedLansOpts::default());
    assert_eq!(again.net.routes(), &before);
}

#[test]
fn populate_requires_addresses() {
    let topo = build_bridged_lans(&BridgedLansOpts::default()).expect("build");
    assert_eq!(
        RoutingTable::populate(&topo.net),
        Err(RoutingError::Unaddressed {
            link: topo.lan_a_link
        })
    );
}

#[test]
fn disconnected_topology_is_unreachable() {
    let mut net = Network::default();
    let a = net.add_node("a");
    let b = net.add_node("b");
    let c = net.add_node("c");
    let d = net.add_node("d");
    let params = LinkParams::new(1_000_000, SimTime::from_millis(1));
    let l0 = net.add_link(LinkKind::Shared, params, &[a, b]).unwrap();
    let l1 = net.add_link(LinkKind::Shared, params, &[c, d]).unwrap();
    net.assign_addresses(l0, slash24(10, 0, 0)).unwrap();
    net.assign_addresses(l1, slash24(10, 0, 1)).unwrap();

    assert_eq!(
        net.populate_routes(),
        Err(RoutingError::Unreachable { node: a, link: l1 })
    );
}

#[test]
fn path_delay_sums_serialization_and_propagation() {
    let topo = addressed(&BridgedLansOpts::default());
    let b2 = topo.lan_b[2];
    // 1024 + 28 字节：两段 100 Mbps 局域网 + 一段 5 Mbps 点对点
    let lan_hop = 84_160 + 6_560;
    let p2p_hop = 1_683_200 + 2_000_000;
    assert_eq!(
        topo.net.path_delay(b2, Ipv4Addr::new(10, 1, 1, 1), 1024),
        Ok(SimTime(2 * lan_hop + p2p_hop))
    );
    assert_eq!(
        topo.net.path_delay(topo.lan_a[0], Ipv4Addr::new(10, 1, 2, 3), 1024),
        Ok(SimTime(2 * lan_hop + p2p_hop))
    );
}

#[test]
fn unknown_destination_has_no_route() {
    let topo = addressed(&BridgedLansOpts::default());
    let a0 = topo.lan_a[0];
    assert!(topo.net.routes().lookup(a0, Ipv4Addr::new(8, 8, 8, 8)).is_none());
    assert_eq!(
        topo.net.next_hop(a0, Ipv4Addr::new(8, 8, 8, 8)),
        Err(RoutingError::NoRoute {
            node: a0,
            dst: Ipv4Addr::new(8, 8, 8, 8)
        })
    );
}
