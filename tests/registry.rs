#![cfg(not(loom))]

// Tests touching the process-global registry (enable flag, the OnceLock'd
// stream stats store) are serialized: the store initializes once per process,
// so every test goes through the same idempotent init path and drains the
// store before making assertions about its contents.

use serial_test::serial;

use rpcprof::{
    init, init_stats, is_enabled, set_enabled, stream_stats, wire, ProfilingConfig,
    ProfilingService, Stat,
};

const TEST_CAPACITY: u32 = 256;

fn init_for_test() {
    init_stats(TEST_CAPACITY).expect("init failed");
    // Clear anything a previous test left behind.
    if let Some(buffer) = stream_stats() {
        let _ = buffer.drain();
    }
}

#[test]
#[serial]
fn init_is_idempotent() {
    init_for_test();
    let capacity = stream_stats().expect("initialized").capacity();

    // Later inits with different (even invalid) capacities are no-ops.
    init_stats(1024).expect("repeat init failed");
    init_stats(0).expect("repeat init failed");
    assert_eq!(stream_stats().expect("initialized").capacity(), capacity);
}

#[test]
#[serial]
fn enable_flag_round_trips() {
    set_enabled(true);
    assert!(is_enabled());
    set_enabled(false);
    assert!(!is_enabled());
}

#[test]
#[serial]
fn service_init_applies_enabled_last() {
    init(&ProfilingConfig {
        enabled: true,
        sample_count: TEST_CAPACITY,
    })
    .expect("service init failed");
    assert!(is_enabled());
    assert!(stream_stats().is_some());
    set_enabled(false);
}

#[test]
#[serial]
fn push_collect_roundtrip() {
    init_for_test();
    let buffer = stream_stats().expect("initialized");

    for i in 0..3u8 {
        let mut stat = Stat::new("server/unary").with_metadata(vec![i]);
        let index = stat.begin_timer("message/encoding");
        stat.end_timer(index);
        buffer.push(Box::new(stat));
    }

    let service = ProfilingService::new();
    let frames = service.collect_stream_stats();
    assert_eq!(frames.len(), 3);

    for (i, frame) in frames.iter().enumerate() {
        let stat = wire::decode_stat(frame).expect("frame must decode");
        assert_eq!(stat.tag, "server/unary");
        assert_eq!(stat.metadata, vec![i as u8]);
        assert_eq!(stat.timers.len(), 1);
    }

    // Drained: a second collection starts empty.
    assert!(service.collect_stream_stats().is_empty());
}

#[test]
#[serial]
fn collect_restores_previous_enabled_state() {
    init_for_test();
    let service = ProfilingService::new();

    set_enabled(true);
    let _ = service.collect_stream_stats();
    assert!(is_enabled());

    set_enabled(false);
    let _ = service.collect_stream_stats();
    assert!(!is_enabled());
}

#[test]
#[serial]
fn service_set_enabled_applies() {
    let service = ProfilingService::new();
    assert!(service.set_enabled(true));
    assert!(is_enabled());
    assert!(service.set_enabled(false));
    assert!(!is_enabled());
}

#[test]
#[serial]
fn snapshot_from_drained_stats() {
    init_for_test();
    let buffer = stream_stats().expect("initialized");

    let mut stat = Stat::new("client/unary");
    let index = stat.begin_timer("message/transport");
    stat.end_timer(index);
    buffer.push(Box::new(stat));

    let service = ProfilingService::new();
    let snapshot = rpcprof::Snapshot {
        stream_stats: service.drain_stream_stats(),
    };
    assert_eq!(snapshot.stream_stats.len(), 1);

    let path = std::env::temp_dir().join(format!("rpcprof-registry-test-{}.json", std::process::id()));
    snapshot.save(&path).expect("save failed");
    let loaded = rpcprof::Snapshot::load(&path).expect("load failed");
    let _ = std::fs::remove_file(&path);
    assert_eq!(loaded.stream_stats[0].tag, "client/unary");
}

#[test]
#[serial]
fn connection_ids_increase() {
    let a = rpcprof::registry::next_server_connection_id();
    let b = rpcprof::registry::next_server_connection_id();
    assert!(b > a);

    let a = rpcprof::registry::next_client_connection_id();
    let b = rpcprof::registry::next_client_connection_id();
    assert!(b > a);
}
