// Collector smoke tests against the live system

use dashcore::collector::Collector;

#[tokio::test]
async fn read_once_returns_populated_snapshot() {
    let collector = Collector::new();
    let snap = collector.read_once().await.expect("read_once");
    assert!(snap.timestamp > 0);
    assert!(snap.cpu.cores > 0);
    assert_eq!(snap.cpu.per_core_percent.len(), snap.cpu.cores);
    assert!(snap.mem.total > 0);
    assert!(snap.mem.used <= snap.mem.total);
}

#[tokio::test]
async fn consecutive_reads_advance_the_clock() {
    let collector = Collector::new();
    let first = collector.read_once().await.expect("first read");
    tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    let second = collector.read_once().await.expect("second read");
    assert!(second.timestamp >= first.timestamp);
}
