//! Deletion notices reaching viewers that disconnect, reconnect or go quiet.

use voxnet_client::ClientConfig;
use voxnet_server::ServerConfig;
use voxnet_shared::{SpatialAddress, TreeNodeId};
use voxnet_test::Harness;

fn init_logging() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

fn addr(digits: &[u8]) -> SpatialAddress {
    SpatialAddress::new(digits).expect("valid address")
}

/// A viewer holding nodes 1 through 8
fn synced_harness() -> Harness {
    let mut harness = Harness::new(ClientConfig::default());
    harness.add_server(ServerConfig::default());
    harness.connect_viewer(0);
    for id in 1..=8u64 {
        harness.servers[0]
            .tree
            .set_node(id, addr(&[(id - 1) as u8]), id as u32);
    }
    harness.tick();
    harness.run_for(50, 10);
    assert_eq!(harness.replica.len(), 8);
    harness
}

fn delete(harness: &mut Harness, id: u64, stamp: u64) {
    harness.servers[0].tree.remove_node(id);
    harness.servers[0]
        .server
        .record_deletion(TreeNodeId(id), stamp);
}

#[test]
fn reconnecting_viewer_gets_missed_deletions_in_one_notice() {
    init_logging();
    let mut harness = synced_harness();
    let viewer = harness.client_id();

    delete(&mut harness, 1, 5);
    delete(&mut harness, 2, 7);
    harness.run_for(50, 10);
    assert!(harness.replica.node(1).is_none());
    assert!(harness.replica.node(2).is_none());
    let connection = harness.servers[0].server.viewer(&viewer).expect("viewer");
    assert_eq!(connection.needs_deletions_from(), 8);

    // disconnects at t=10
    harness.disconnect_viewer(0);
    delete(&mut harness, 3, 8);
    delete(&mut harness, 4, 9);
    delete(&mut harness, 5, 12);
    delete(&mut harness, 6, 15);
    delete(&mut harness, 7, 18);
    harness.run_for(500, 50);

    // nothing the viewer still needs was pruned
    let server = &harness.servers[0].server;
    assert_eq!(server.ledger().oldest(), Some(8));
    assert_eq!(server.ledger().len(), 5);
    assert_eq!(server.ledger().deletions_since(8).len(), 5);
    let notices_before = server.diagnostics().deletion_notices_sent;
    assert!(harness.replica.node(3).is_some());

    // reconnects at t=20
    harness.connect_viewer(0);
    harness.servers_tick();
    harness.client_receive();

    let server = &harness.servers[0].server;
    assert_eq!(server.diagnostics().deletion_notices_sent, notices_before + 1);
    for id in 3..=7 {
        assert!(harness.replica.node(id).is_none(), "node {} survived", id);
    }
    assert!(harness.replica.node(8).is_some());

    harness.run_for(50, 10);
    let server = &harness.servers[0].server;
    assert!(server.ledger().is_empty());
    let connection = server.viewer(&viewer).expect("viewer");
    assert_eq!(connection.needs_deletions_from(), 19);
    assert!(harness.replica.matches(&harness.servers[0].tree));
}

#[test]
fn viewer_gone_too_long_is_forgotten() {
    init_logging();
    let mut harness = synced_harness();
    let viewer = harness.client_id();

    harness.disconnect_viewer(0);
    delete(&mut harness, 1, 100);
    delete(&mut harness, 2, 101);

    harness.advance(10_000);
    harness.servers_tick();
    assert!(harness.servers[0].server.viewer(&viewer).is_some());
    assert_eq!(harness.servers[0].server.ledger().len(), 2);

    harness.advance(21_000);
    harness.servers_tick();
    let server = &harness.servers[0].server;
    assert!(server.viewer(&viewer).is_none());
    assert!(server.ledger().is_empty());

    // back as a new viewer, brought up to date by full state
    harness.connect_viewer(0);
    harness.tick();
    let connection = harness.servers[0].server.viewer(&viewer).expect("viewer");
    assert_eq!(connection.needs_deletions_from(), 102);
    assert!(harness.replica.matches(&harness.servers[0].tree));
}

#[test]
fn silent_connected_viewer_is_resynced_instead_of_holding_the_ledger() {
    init_logging();
    let mut harness = synced_harness();
    let viewer = harness.client_id();

    delete(&mut harness, 1, 100);
    harness.advance(31_000);
    harness.servers_tick();

    let server = &harness.servers[0].server;
    assert!(server.ledger().is_empty());
    let connection = server.viewer(&viewer).expect("viewer");
    assert!(connection.is_connected());
    assert_eq!(connection.needs_deletions_from(), 101);

    harness.run_for(100, 10);
    assert!(harness.replica.node(1).is_none());
    assert!(harness.replica.matches(&harness.servers[0].tree));
}

#[test]
fn unacknowledged_notice_is_resent() {
    init_logging();
    let mut harness = synced_harness();
    let client_id = harness.client_id();

    // the delta for the removal and the notice
    delete(&mut harness, 4, 40);
    harness.network.drop_next(client_id, 2);
    harness.advance(10);
    harness.tick();
    assert!(harness.replica.node(4).is_some());

    harness.advance(100);
    harness.tick();
    assert!(harness.replica.node(4).is_some());
    assert_eq!(
        harness.servers[0].server.diagnostics().deletion_notices_sent,
        1
    );

    harness.run_for(300, 50);
    assert!(harness.replica.node(4).is_none());
    assert_eq!(
        harness.servers[0].server.diagnostics().deletion_notices_sent,
        2
    );
    assert_eq!(harness.client.diagnostics().deletions_applied, 1);
}

#[test]
fn duplicate_notice_is_applied_once() {
    init_logging();
    let mut harness = synced_harness();
    let client_id = harness.client_id();

    // ledger only, so the notice is the sole packet
    harness.servers[0]
        .server
        .record_deletion(TreeNodeId(6), 60);
    harness.advance(10);
    harness.servers_tick();

    let inbox = harness.network.drain_inbox(&client_id);
    assert_eq!(inbox.len(), 1);
    for (from, bytes) in inbox.iter().chain(inbox.iter()) {
        harness.network.deliver(client_id, *from, bytes.clone());
    }
    harness.client_receive();

    assert!(harness.replica.node(6).is_none());
    assert_eq!(harness.client.diagnostics().deletions_applied, 1);
    assert_eq!(harness.recorder.changes.last().map(Vec::len), Some(1));
}

#[test]
fn wall_clock_stamps_follow_host_stamps() {
    let mut harness = synced_harness();
    let server = &mut harness.servers[0].server;

    let first = server
        .record_deletion_now(TreeNodeId(1))
        .expect("clock after epoch");
    let second = server
        .record_deletion_now(TreeNodeId(2))
        .expect("clock after epoch");
    // a host stamp from the past still lands after them
    let third = server.record_deletion(TreeNodeId(3), 5);

    assert!(second > first);
    assert_eq!(third, second + 1);
    assert_eq!(server.ledger().deletions_since(first).len(), 3);
}
