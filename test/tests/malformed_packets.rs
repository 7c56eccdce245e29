//! Undecodable datagrams are dropped and counted, and the session carries on.

use voxnet_client::ClientConfig;
use voxnet_server::ServerConfig;
use voxnet_shared::{
    BitWriter, JurisdictionRequest, NodeRole, PacketBuilder, PacketType, Serde, SessionId,
    SpatialAddress, StandardHeader, UnsignedVariableInteger,
};
use voxnet_test::{Harness, VoxelEdit};

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

fn deliver_to_server(harness: &mut Harness, bytes: Vec<u8>) {
    let server = harness.server_id(0);
    let client = harness.client_id();
    harness.network.deliver(server, client, bytes);
    harness.servers_tick();
}

#[test]
fn server_counts_garbage_and_keeps_serving() {
    init_logging();
    let mut harness = Harness::new(ClientConfig::default());
    harness.add_server(ServerConfig::default());
    let client = harness.client_id();

    // empty, unknown type, header cut short
    deliver_to_server(&mut harness, Vec::new());
    deliver_to_server(&mut harness, vec![99; 20]);
    let request = PacketBuilder::single(
        StandardHeader::new(PacketType::JurisdictionRequest, client),
        1_400,
        &JurisdictionRequest {
            role: NodeRole::VoxelServer,
        },
    )
    .expect("request fits");
    deliver_to_server(&mut harness, request[..5].to_vec());

    assert_eq!(
        harness.servers[0].server.diagnostics().malformed_from(&client),
        3
    );

    harness.tick();
    assert_eq!(harness.client.registry().known_server_count(), 1);
}

#[test]
fn header_sender_must_match_transport_sender() {
    init_logging();
    let mut harness = Harness::new(ClientConfig::default());
    harness.add_server(ServerConfig::default());
    let client = harness.client_id();
    let impostor = SessionId::generate();

    let packet = PacketBuilder::single(
        StandardHeader::new(PacketType::JurisdictionRequest, impostor),
        1_400,
        &JurisdictionRequest {
            role: NodeRole::VoxelServer,
        },
    )
    .expect("request fits");
    deliver_to_server(&mut harness, packet);

    let server = &harness.servers[0].server;
    assert_eq!(server.diagnostics().malformed_from(&client), 1);
    assert_eq!(server.diagnostics().jurisdiction_responses, 0);
}

#[test]
fn edit_records_with_bad_record_are_dropped_whole() {
    init_logging();
    let mut harness = Harness::new(ClientConfig::default());
    harness.add_server(ServerConfig::default());
    let client = harness.client_id();

    let header = StandardHeader::sequenced(PacketType::EditRecords, client, 1);
    let mut writer = BitWriter::new();
    header.write(&mut writer);
    // one complete entry, then one whose color list claims more than is left
    true.ser(&mut writer);
    addr(&[1]).ser(&mut writer);
    VoxelEdit::Erase.ser(&mut writer);
    true.ser(&mut writer);
    addr(&[2]).ser(&mut writer);
    true.ser(&mut writer);
    UnsignedVariableInteger::<7>::new(1_000).ser(&mut writer);
    deliver_to_server(&mut harness, writer.to_bytes());

    let server = &mut harness.servers[0].server;
    assert!(server.take_edits().is_empty());
    assert_eq!(server.diagnostics().malformed_from(&client), 1);
}

#[test]
fn client_counts_invalid_jurisdiction_and_truncated_delta() {
    init_logging();
    let mut harness = Harness::new(ClientConfig::default());
    harness.add_server(ServerConfig::default());
    let server = harness.server_id(0);
    let client = harness.client_id();

    // a delegated address outside the root fails validation on decode
    let header = StandardHeader::new(PacketType::JurisdictionMap, server);
    let mut writer = BitWriter::new();
    header.write(&mut writer);
    NodeRole::VoxelServer.ser(&mut writer);
    Some(addr(&[1])).ser(&mut writer);
    vec![addr(&[2])].ser(&mut writer);
    harness.network.deliver(client, server, writer.to_bytes());

    harness.connect_viewer(0);
    harness.servers[0].tree.set_node(1, addr(&[4]), 40);
    harness.servers_tick();
    let mut inbox = harness.network.drain_inbox(&client);
    let (_, delta) = inbox.pop().expect("delta sent");
    for (from, bytes) in inbox {
        harness.network.deliver(client, from, bytes);
    }
    harness
        .network
        .deliver(client, server, delta[..delta.len() / 2].to_vec());
    harness.client_receive();

    assert_eq!(harness.client.diagnostics().malformed_from(&server), 2);
    assert!(harness.replica.is_empty());

    // the server's next full state still lands
    harness.run_for(1_500, 50);
    assert!(harness.replica.matches(&harness.servers[0].tree));
    assert_eq!(harness.client.registry().known_server_count(), 1);
}
