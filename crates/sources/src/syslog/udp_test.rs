//! Tests for Syslog UDP Source

use std::io;
use std::sync::Arc;
use std::time::Duration;

use syslens_pipeline::Ingestor;
use syslens_protocol::{Facility, ParseStatus, Severity};
use syslens_store::{Query, RetentionPolicy};
use syslens_tap::TapConfig;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::common::SourceMetricsProvider;
use crate::syslog::udp::{
    SyslogUdpSource, SyslogUdpSourceConfig, SyslogUdpSourceError, SyslogUdpSourceMetrics,
};

fn ingestor() -> Arc<Ingestor> {
    Arc::new(Ingestor::new(RetentionPolicy::default(), TapConfig::default()).unwrap())
}

fn local_config(num_workers: usize) -> SyslogUdpSourceConfig {
    SyslogUdpSourceConfig {
        id: "test_syslog_udp".into(),
        address: "127.0.0.1".into(),
        port: 0,
        num_workers,
        ..Default::default()
    }
}

/// Poll until the buffer holds `n` records
async fn wait_for_records(ingestor: &Ingestor, n: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while ingestor.buffer().len() < n {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {n} records, have {}",
            ingestor.buffer().len()
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Start a source on an OS-assigned port; returns its address
async fn start(
    source: Arc<SyslogUdpSource>,
    cancel: CancellationToken,
) -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
    let sockets = source.bind().unwrap();
    let addr = sockets[0].local_addr().unwrap();
    let handle = tokio::spawn(async move { source.serve(sockets, cancel).await });
    (addr, handle)
}

async fn client() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").await.unwrap()
}

// =============================================================================
// Configuration and metrics
// =============================================================================

#[test]
fn test_config_defaults() {
    let config = SyslogUdpSourceConfig::default();

    assert_eq!(config.port, 514);
    assert_eq!(config.address, "0.0.0.0");
    assert_eq!(config.max_message_size, 8192);
    assert_eq!(config.num_workers, 4);
}

#[test]
fn test_config_with_port() {
    let config = SyslogUdpSourceConfig::with_port(1514);
    assert_eq!(config.port, 1514);
    assert_eq!(config.bind_address(), "0.0.0.0:1514");
}

#[test]
fn test_metrics_tracking() {
    let metrics = SyslogUdpSourceMetrics::new();

    metrics.worker_started();
    metrics.worker_started();
    metrics.packet_received(100);
    metrics.packet_received(200);
    metrics.packet_empty();
    metrics.message_truncated();
    metrics.worker_error();
    metrics.worker_stopped();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.workers_active, 1);
    assert_eq!(snapshot.workers_total, 2);
    assert_eq!(snapshot.packets_received, 2);
    assert_eq!(snapshot.bytes_received, 300);
    assert_eq!(snapshot.packets_empty, 1);
    assert_eq!(snapshot.messages_truncated, 1);
    assert_eq!(snapshot.worker_errors, 1);
    assert_eq!(snapshot.errors, 1);
}

#[test]
fn test_error_display() {
    let bind_err = SyslogUdpSourceError::Bind {
        address: "0.0.0.0:514".into(),
        source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
    };
    assert!(bind_err.to_string().contains("0.0.0.0:514"));

    let worker_err = SyslogUdpSourceError::WorkerCreation {
        worker_id: 2,
        source: io::Error::other("test"),
    };
    assert!(worker_err.to_string().contains("worker 2"));
}

#[tokio::test]
async fn test_invalid_bind_address() {
    let config = SyslogUdpSourceConfig {
        address: "not an address".into(),
        ..Default::default()
    };
    let source = SyslogUdpSource::new(config, ingestor());
    assert!(matches!(
        source.bind(),
        Err(SyslogUdpSourceError::Bind { .. })
    ));
}

#[tokio::test]
async fn test_source_creation() {
    let source = SyslogUdpSource::new(local_config(1), ingestor());

    assert!(!source.is_running());
    assert_eq!(source.metrics().snapshot().workers_total, 0);
    assert_eq!(source.metrics_handle().source_type(), "syslog_udp");
    assert_eq!(source.metrics_handle().source_id(), "test_syslog_udp");
}

// =============================================================================
// Receiving
// =============================================================================

#[tokio::test]
async fn test_datagram_becomes_record() {
    let ingestor = ingestor();
    let source = Arc::new(SyslogUdpSource::new(local_config(1), Arc::clone(&ingestor)));
    let cancel = CancellationToken::new();
    let (addr, handle) = start(Arc::clone(&source), cancel.clone()).await;

    let client = client().await;
    client
        .send_to(b"<34>Jan  1 00:00:00 host app: hello", addr)
        .await
        .unwrap();
    wait_for_records(&ingestor, 1).await;

    let record = &ingestor.query_service().recent(1)[0];
    assert_eq!(record.severity, Some(Severity::Critical));
    assert_eq!(record.facility, Some(Facility::Auth));
    assert_eq!(record.message, "hello");
    assert_eq!(record.source, client.local_addr().unwrap());
    assert!(source.is_running());

    cancel.cancel();
    handle.await.unwrap();
    assert!(!source.is_running());
    assert_eq!(source.metrics().snapshot().workers_active, 0);
}

#[tokio::test]
async fn test_each_datagram_is_one_record() {
    let ingestor = ingestor();
    let source = Arc::new(SyslogUdpSource::new(local_config(1), Arc::clone(&ingestor)));
    let cancel = CancellationToken::new();
    let (addr, handle) = start(Arc::clone(&source), cancel.clone()).await;

    let client = client().await;
    for i in 0..10 {
        let message = format!("<13>1 2024-01-01T00:00:00Z host app - - - message {i}");
        client.send_to(message.as_bytes(), addr).await.unwrap();
    }
    wait_for_records(&ingestor, 10).await;

    let snapshot = source.metrics().snapshot();
    assert_eq!(snapshot.packets_received, 10);
    assert_eq!(snapshot.messages_received, 10);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_garbage_datagram_is_retained_malformed() {
    let ingestor = ingestor();
    let source = Arc::new(SyslogUdpSource::new(local_config(1), Arc::clone(&ingestor)));
    let cancel = CancellationToken::new();
    let (addr, handle) = start(Arc::clone(&source), cancel.clone()).await;

    let garbage = [0xde, 0xad, 0x00, 0xbe, 0xef];
    let client = client().await;
    client.send_to(&garbage, addr).await.unwrap();
    wait_for_records(&ingestor, 1).await;

    let record = &ingestor.query_service().recent(1)[0];
    assert_eq!(record.status, ParseStatus::Malformed);
    assert_eq!(record.message, String::from_utf8_lossy(&garbage));

    // The listener keeps going
    client.send_to(b"<13>still here", addr).await.unwrap();
    wait_for_records(&ingestor, 2).await;

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_every_datagram_yields_one_record() {
    let ingestor = ingestor();
    let source = Arc::new(SyslogUdpSource::new(local_config(1), Arc::clone(&ingestor)));
    let cancel = CancellationToken::new();
    let (addr, handle) = start(Arc::clone(&source), cancel.clone()).await;

    let sent: [&[u8]; 5] = [
        &[0xde, 0xad, 0xbe, 0x0d, 0x0a],
        b"",
        b"\r\n",
        b"<13>after\r\n",
        b"<13>marker",
    ];
    let client = client().await;
    for datagram in sent {
        client.send_to(datagram, addr).await.unwrap();
    }
    wait_for_records(&ingestor, sent.len()).await;

    let records = ingestor
        .query_service()
        .query(&Query::new().chronological());
    assert_eq!(records.len(), sent.len());
    for (record, datagram) in records.iter().zip(sent) {
        assert_eq!(&record.raw[..], datagram);
    }

    assert_eq!(records[0].status, ParseStatus::Malformed);
    assert_eq!(records[0].message, String::from_utf8_lossy(&sent[0][..3]));
    assert_eq!(records[1].status, ParseStatus::Malformed);
    assert_eq!(records[1].message, "");
    assert_eq!(records[2].status, ParseStatus::Malformed);
    assert_eq!(records[2].message, "");
    assert_eq!(records[3].message, "after");
    assert_eq!(records[4].message, "marker");
    assert_eq!(source.metrics().snapshot().packets_empty, 2);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_oversized_datagram_is_truncated() {
    let ingestor = ingestor();
    let config = SyslogUdpSourceConfig {
        max_message_size: 64,
        ..local_config(1)
    };
    let source = Arc::new(SyslogUdpSource::new(config, Arc::clone(&ingestor)));
    let cancel = CancellationToken::new();
    let (addr, handle) = start(Arc::clone(&source), cancel.clone()).await;

    let message = format!("<13>{}", "x".repeat(500));
    client().await.send_to(message.as_bytes(), addr).await.unwrap();
    wait_for_records(&ingestor, 1).await;

    let record = &ingestor.query_service().recent(1)[0];
    assert_eq!(record.raw.len(), 64);
    assert_eq!(source.metrics().snapshot().messages_truncated, 1);

    cancel.cancel();
    handle.await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_multiple_workers_share_port() {
    let ingestor = ingestor();
    let source = Arc::new(SyslogUdpSource::new(local_config(3), Arc::clone(&ingestor)));
    let cancel = CancellationToken::new();

    let sockets = source.bind().unwrap();
    assert_eq!(sockets.len(), 3);
    let addr = sockets[0].local_addr().unwrap();
    for socket in &sockets {
        assert_eq!(socket.local_addr().unwrap().port(), addr.port());
    }

    let handle = {
        let source = Arc::clone(&source);
        let cancel = cancel.clone();
        tokio::spawn(async move { source.serve(sockets, cancel).await })
    };

    let client = client().await;
    for i in 0..20 {
        client
            .send_to(format!("<13>message {i}").as_bytes(), addr)
            .await
            .unwrap();
    }
    wait_for_records(&ingestor, 20).await;
    assert_eq!(source.metrics().snapshot().workers_total, 3);

    cancel.cancel();
    handle.await.unwrap();
}
