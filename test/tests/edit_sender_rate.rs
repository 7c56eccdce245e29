use voxnet_client::{ClientConfig, EditError, EditStatus};
use voxnet_server::ServerConfig;
use voxnet_shared::{JurisdictionMap, NodeRole, SpatialAddress};
use voxnet_test::{Harness, VoxelEdit};

fn init_logging() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .is_test(true)
        .try_init()
        .ok();
}

fn addr(digits: &[u8]) -> SpatialAddress {
    SpatialAddress::new(digits).expect("valid address")
}

fn harness_with_rate(packets_per_second: u32) -> Harness {
    let mut config = ClientConfig::default();
    config.replication.edit.packets_per_second = packets_per_second;
    let mut harness = Harness::new(config);
    harness.add_server(ServerConfig::default());
    harness.tick();
    assert_eq!(harness.client.registry().known_server_count(), 1);
    harness
}

/// Large enough that each packet carries a single record
fn bulky_edit(seed: u32) -> VoxelEdit {
    VoxelEdit::Paint {
        colors: vec![seed; 300],
    }
}

#[test]
fn burst_is_spread_over_time_at_the_configured_rate() {
    init_logging();
    let rate = 10;
    let mut harness = harness_with_rate(rate);

    for seed in 0..1_000u32 {
        let digits = [(seed % 8) as u8, (seed / 8 % 8) as u8];
        harness
            .client
            .queue_edit(addr(&digits), bulky_edit(seed))
            .expect("edit fits a packet");
    }

    let mut arrivals: Vec<(u64, usize)> = Vec::new();
    let mut elapsed = 0;
    while elapsed < 3_000 {
        harness.advance(10);
        elapsed += 10;
        harness.tick();
        let received = harness.servers[0].server.take_edits().len();
        if received > 0 {
            arrivals.push((elapsed, received));
        }
    }

    for (start, _) in &arrivals {
        let in_window: usize = arrivals
            .iter()
            .filter(|(at, _)| *at >= *start && *at < *start + 1_000)
            .map(|(_, count)| *count)
            .sum();
        assert!(
            in_window <= rate as usize,
            "{} packets in the second after {}ms",
            in_window,
            start
        );
    }

    let total: usize = arrivals.iter().map(|(_, count)| *count).sum();
    assert_eq!(total, 30);
    assert_eq!(harness.client.edit_sender().packets_sent(), 30);
    assert!(harness.client.edit_sender().queued_packet_count() > 900);
}

#[test]
fn small_edits_share_a_packet() {
    init_logging();
    let mut harness = harness_with_rate(10);

    for digit in 0..50u32 {
        harness
            .client
            .queue_edit(addr(&[(digit % 8) as u8]), VoxelEdit::paint(digit))
            .expect("edit fits a packet");
    }
    assert_eq!(harness.client.edit_sender().queued_packet_count(), 1);

    harness.advance(10);
    harness.tick();

    assert_eq!(harness.client.edit_sender().packets_sent(), 1);
    let edits = harness.servers[0].server.take_edits();
    assert_eq!(edits.len(), 50);
    for (digit, (_, entry)) in edits.iter().enumerate() {
        assert_eq!(entry.record, VoxelEdit::paint(digit as u32));
    }
}

#[test]
fn record_too_large_for_any_packet_is_refused() {
    init_logging();
    let mut harness = harness_with_rate(10);

    let result = harness.client.queue_edit(
        addr(&[1]),
        VoxelEdit::Paint {
            colors: vec![7; 400],
        },
    );

    match result {
        Err(EditError::RecordTooLarge {
            bits_needed,
            bits_free,
        }) => assert!(bits_needed > bits_free),
        other => panic!("expected RecordTooLarge, got {:?}", other),
    }
    assert_eq!(harness.client.edit_sender().edits_rejected(), 1);
    assert_eq!(harness.client.edit_sender().queued_packet_count(), 0);
}

#[test]
fn disabled_sender_drops_edits() {
    init_logging();
    let mut harness = harness_with_rate(10);
    harness.client.set_should_send(false);

    let status = harness
        .client
        .queue_edit(addr(&[1]), VoxelEdit::Erase)
        .expect("no error while disabled");
    assert_eq!(status, EditStatus::Disabled);

    harness.run_for(100, 10);
    assert!(harness.servers[0].server.take_edits().is_empty());

    harness.client.set_should_send(true);
    let status = harness
        .client
        .queue_edit(addr(&[1]), VoxelEdit::Erase)
        .expect("edit fits a packet");
    assert!(matches!(status, EditStatus::Queued(_)));
}

#[test]
fn edits_are_split_by_owning_server() {
    init_logging();
    let mut harness = Harness::new(ClientConfig::default());
    for root in [1u8, 2] {
        let mut config = ServerConfig::for_role(NodeRole::VoxelServer);
        config.jurisdiction =
            JurisdictionMap::new(NodeRole::VoxelServer, Some(addr(&[root])), Vec::new())
                .expect("valid jurisdiction");
        harness.add_server(config);
    }
    harness.tick();
    assert_eq!(harness.client.registry().known_server_count(), 2);

    for index in 0..6u8 {
        let root = 1 + index % 2;
        harness
            .client
            .queue_edit(addr(&[root, index]), VoxelEdit::Erase)
            .expect("edit fits a packet");
    }
    harness.advance(10);
    harness.tick();

    for (server, root) in [(0, 1u8), (1, 2)] {
        let edits = harness.servers[server].server.take_edits();
        assert_eq!(edits.len(), 3);
        assert!(edits
            .iter()
            .all(|(_, entry)| entry.address.digits()[0] == root));
    }
    assert_eq!(harness.client.edit_sender().packets_sent(), 2);
}

#[test]
fn lost_edit_packets_are_counted_by_the_server() {
    init_logging();
    let mut harness = harness_with_rate(100);
    let server_id = harness.server_id(0);

    for round in 0..4u32 {
        if round == 1 || round == 2 {
            harness.network.drop_next(server_id, 1);
        }
        harness
            .client
            .queue_edit(addr(&[3]), VoxelEdit::paint(round))
            .expect("edit fits a packet");
        harness.advance(20);
        harness.tick();
    }

    let server = &mut harness.servers[0].server;
    assert_eq!(server.take_edits().len(), 2);
    assert_eq!(server.edit_receiver().packets_lost(), 2);
}

#[test]
fn duplicated_edit_datagram_is_applied_once() {
    init_logging();
    let mut harness = harness_with_rate(100);
    let server_id = harness.server_id(0);

    harness
        .client
        .queue_edit(addr(&[2, 5]), VoxelEdit::paint(7))
        .expect("edit fits a packet");
    harness.advance(20);
    harness
        .client
        .update(&harness.now, &mut harness.directory, &mut harness.client_socket);

    // the transport hands every datagram over twice
    for (from, bytes) in harness.network.drain_inbox(&server_id) {
        harness.network.deliver(server_id, from, bytes.clone());
        harness.network.deliver(server_id, from, bytes);
    }
    harness.servers_tick();

    let server = &mut harness.servers[0].server;
    assert_eq!(server.take_edits().len(), 1);
    assert_eq!(server.edit_receiver().packets_discarded(), 1);
    assert_eq!(server.edit_receiver().packets_lost(), 0);
}

#[test]
fn packets_for_a_departed_server_wait_for_a_new_owner() {
    init_logging();
    let mut harness = harness_with_rate(1);

    for seed in 0..3 {
        harness
            .client
            .queue_edit(addr(&[4]), bulky_edit(seed))
            .expect("edit fits a packet");
    }
    harness.advance(10);
    harness.tick();
    assert_eq!(harness.client.edit_sender().packets_sent(), 1);

    harness.remove_server(0);
    harness.run_for(500, 10);

    // not flushed at the idle rate towards a server that is gone
    assert_eq!(harness.client.edit_sender().packets_sent(), 1);
    assert_eq!(harness.client.edit_sender().queued_packet_count(), 0);
    assert_eq!(harness.client.edit_sender().pending_count(), 2);

    harness.add_server(ServerConfig::default());
    harness.run_for(3_000, 10);
    assert_eq!(harness.client.edit_sender().pending_count(), 0);
    assert_eq!(harness.client.edit_sender().packets_sent(), 3);
    assert_eq!(harness.servers[0].server.take_edits().len(), 2);
}
