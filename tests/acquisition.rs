//! End-to-end acquisition tests against an in-process fixture meter.
//!
//! The fixture binds an ephemeral TCP port, accepts one connection, parses
//! the FC03 request just enough to echo the transaction id, and answers
//! with canned registers (or an exception). No real meter required.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use voltage_pqm::{
    AcquisitionCycle, LinkConfig, LinkError, LinkState, MeterLink, SampleStore, Simulator, Source,
    TelemetryLink,
};

/// FC03 request frame length: MBAP header (7) + fc + address + quantity
const REQUEST_LEN: usize = 12;

/// Serve one FC03 request with the given register values.
async fn spawn_fixture_meter(registers: Vec<u16>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = [0u8; REQUEST_LEN];
        stream.read_exact(&mut request).await.unwrap();

        let mut frame = Vec::with_capacity(9 + 2 * registers.len());
        frame.extend_from_slice(&request[0..2]); // echo transaction id
        frame.extend_from_slice(&[0x00, 0x00]); // protocol id
        frame.extend_from_slice(&((3 + 2 * registers.len()) as u16).to_be_bytes());
        frame.push(request[6]); // echo unit id
        frame.push(0x03);
        frame.push((2 * registers.len()) as u8);
        for value in &registers {
            frame.extend_from_slice(&value.to_be_bytes());
        }
        stream.write_all(&frame).await.unwrap();
    });

    addr
}

/// Serve one FC03 request with an exception response.
async fn spawn_faulting_meter(exception_code: u8) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = [0u8; REQUEST_LEN];
        stream.read_exact(&mut request).await.unwrap();

        let mut frame = Vec::with_capacity(9);
        frame.extend_from_slice(&request[0..2]);
        frame.extend_from_slice(&[0x00, 0x00]);
        frame.extend_from_slice(&3u16.to_be_bytes());
        frame.push(request[6]);
        frame.push(0x83);
        frame.push(exception_code);
        stream.write_all(&frame).await.unwrap();
    });

    addr
}

fn test_link(addr: SocketAddr) -> MeterLink {
    MeterLink::new(
        LinkConfig::new(addr.to_string())
            .with_register_count(6)
            .with_connect_timeout(Duration::from_secs(1))
            .with_response_timeout(Duration::from_secs(1)),
    )
}

#[tokio::test]
async fn live_reading_flows_end_to_end() {
    let addr = spawn_fixture_meter(vec![2301, 512, 1180, 0, 0, 0]).await;
    let dir = tempfile::tempdir().unwrap();
    let store = SampleStore::open(dir.path().join("samples.csv")).unwrap();

    let mut cycle = AcquisitionCycle::new(test_link(addr), Simulator::new(), store);
    let reading = cycle.run_once().await.unwrap();

    assert_eq!(reading.source, Source::Live);
    assert_eq!(reading.voltage, 230.1);
    assert_eq!(reading.current, 5.12);
    assert_eq!(reading.power, 1180.0);
    assert_eq!(cycle.store().recent(1), vec![reading]);
}

#[tokio::test]
async fn unreachable_meter_yields_persisted_simulated_reading() {
    // A zero connect budget can never succeed, even against a live port
    let addr = spawn_fixture_meter(vec![2301, 512, 1180]).await;
    let link = MeterLink::new(
        LinkConfig::new(addr.to_string()).with_connect_timeout(Duration::ZERO),
    );
    let dir = tempfile::tempdir().unwrap();
    let store = SampleStore::open(dir.path().join("samples.csv")).unwrap();
    let mut cycle = AcquisitionCycle::new(link, Simulator::new(), store);

    let started = Instant::now();
    let reading = cycle.run_once().await.unwrap();

    // Bounded: nowhere near the default five-second budget
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(reading.source, Source::Simulated);
    assert!((210.0..=240.0).contains(&reading.voltage));
    assert!((0.0..=20.0).contains(&reading.current));
    assert_eq!(cycle.store().recent(1), vec![reading]);
}

#[tokio::test]
async fn device_exception_maps_to_read_failed() {
    let addr = spawn_faulting_meter(0x02).await;
    let mut link = test_link(addr);

    let err = link.acquire().await.unwrap_err();
    match err {
        LinkError::ReadFailed { reason } => {
            assert!(reason.contains("Illegal Data Address"), "{reason}")
        }
        other => panic!("expected ReadFailed, got {other:?}"),
    }
    // Even a faulting transaction must leave the link closed
    assert_eq!(link.state(), LinkState::Disconnected);
}

#[tokio::test]
async fn link_is_disconnected_after_success() {
    let addr = spawn_fixture_meter(vec![2301, 512, 1180, 0, 0, 0]).await;
    let mut link = test_link(addr);

    let reading = link.acquire().await.unwrap();
    assert_eq!(reading.source, Source::Live);
    assert_eq!(link.state(), LinkState::Disconnected);

    let stats = link.stats();
    assert_eq!(stats.cycles, 1);
    assert_eq!(stats.failures, 0);
    assert_eq!(stats.requests_sent, 1);
    assert_eq!(stats.responses_received, 1);
}

#[tokio::test]
async fn history_spans_cycles_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("samples.csv");

    {
        let addr = spawn_fixture_meter(vec![2305, 310, 715]).await;
        let link = MeterLink::new(
            LinkConfig::new(addr.to_string())
                .with_register_count(3)
                .with_connect_timeout(Duration::from_secs(1))
                .with_response_timeout(Duration::from_secs(1)),
        );
        let store = SampleStore::open(&path).unwrap();
        let mut cycle = AcquisitionCycle::new(link, Simulator::new(), store);

        let live = cycle.run_once().await.unwrap();
        assert_eq!(live.source, Source::Live);
        cycle.close().unwrap();
    }

    // A later process sees the same history, provenance intact
    let store = SampleStore::open(&path).unwrap();
    assert_eq!(store.len(), 1);
    let reloaded = &store.recent(1)[0];
    assert_eq!(reloaded.source, Source::Live);
    assert_eq!(reloaded.voltage, 230.5);
    assert_eq!(reloaded.current, 3.1);
    assert_eq!(reloaded.power, 715.0);
}
