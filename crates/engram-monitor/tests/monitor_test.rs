//! Integration tests: sampling loop, ring buffer, emergency dispatch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use engram_core::config::MonitorConfig;
use engram_core::metrics::{CpuMetrics, MemoryMetrics, ProcessMetrics};
use engram_core::{PressureLevel, ResourceMetrics};
use engram_monitor::{CleanupHandler, ResourceMonitor};

fn synthetic(memory_util: f64) -> ResourceMetrics {
    let total = 16 * 1024 * 1024 * 1024u64;
    ResourceMetrics {
        timestamp: Utc::now(),
        memory: MemoryMetrics::sanitized(total, (total as f64 * memory_util) as u64),
        cpu: CpuMetrics {
            cores: 8,
            utilization: 0.1,
            load_avg: [0.1, 0.1, 0.1],
        },
        process: ProcessMetrics {
            pid: 1,
            rss: 1024,
            heap_used: 1024,
            heap_total: 4096,
            uptime_secs: 10,
        },
        disk: None,
    }
}

fn counting_handler(counter: Arc<AtomicUsize>) -> CleanupHandler {
    Arc::new(move |_analysis| {
        let counter = counter.clone();
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    })
}

#[tokio::test]
async fn loop_collects_immediately_and_periodically() {
    let config = MonitorConfig {
        monitoring_interval_ms: 20,
        history_size: 10,
        ..Default::default()
    };
    let monitor = ResourceMonitor::new(config).unwrap();
    monitor.start();
    tokio::time::sleep(Duration::from_millis(120)).await;
    monitor.stop();

    let history = monitor.history();
    assert!(history.len() >= 2, "expected several samples, got {}", history.len());
    // Timestamp-nondecreasing delivery.
    for pair in history.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }

    let perf = monitor.perf_counters();
    assert!(perf.total_collections >= 2);
    assert!(perf.max_collection_time_ms >= perf.avg_collection_time_ms);
}

#[tokio::test]
async fn history_ring_is_bounded() {
    let config = MonitorConfig {
        history_size: 3,
        ..Default::default()
    };
    let monitor = ResourceMonitor::new(config).unwrap();
    for _ in 0..10 {
        monitor.ingest_sample(synthetic(0.1)).await;
    }
    assert_eq!(monitor.history().len(), 3);
}

#[tokio::test]
async fn emergency_invokes_handlers_once_within_cooldown() {
    let config = MonitorConfig {
        alert_cooldown_ms: 60_000,
        ..Default::default()
    };
    let monitor = ResourceMonitor::new(config).unwrap();
    let invocations = Arc::new(AtomicUsize::new(0));
    monitor.register_cleanup_handler(counting_handler(invocations.clone()));
    monitor.register_cleanup_handler(counting_handler(invocations.clone()));

    // 16 GiB total, 0.05 GiB free: well past the 0.95 emergency line.
    let free = (0.05 * 1024.0 * 1024.0 * 1024.0) as u64;
    let total = 16 * 1024 * 1024 * 1024u64;
    let mut snapshot = synthetic(0.0);
    snapshot.memory = MemoryMetrics::sanitized(total, total - free);

    let analysis = monitor.ingest_sample(snapshot.clone()).await;
    assert_eq!(analysis.overall, PressureLevel::Emergency);
    assert_eq!(invocations.load(Ordering::SeqCst), 2);

    // Refire inside the cooldown window is suppressed.
    monitor.ingest_sample(snapshot).await;
    assert_eq!(invocations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn handler_panic_is_swallowed() {
    let monitor = ResourceMonitor::new(MonitorConfig::default()).unwrap();
    let invocations = Arc::new(AtomicUsize::new(0));
    monitor.register_cleanup_handler(Arc::new(|_| {
        Box::pin(async { panic!("handler blew up") })
    }));
    monitor.register_cleanup_handler(counting_handler(invocations.clone()));

    let analysis = monitor.ingest_sample(synthetic(0.99)).await;
    assert_eq!(analysis.overall, PressureLevel::Emergency);
    // The panicking handler did not stop the second one.
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn normal_pressure_never_dispatches() {
    let monitor = ResourceMonitor::new(MonitorConfig::default()).unwrap();
    let invocations = Arc::new(AtomicUsize::new(0));
    monitor.register_cleanup_handler(counting_handler(invocations.clone()));

    let analysis = monitor.ingest_sample(synthetic(0.2)).await;
    assert_eq!(analysis.overall, PressureLevel::Normal);
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn update_config_restarts_running_loop() {
    let config = MonitorConfig {
        monitoring_interval_ms: 50,
        ..Default::default()
    };
    let monitor = ResourceMonitor::new(config.clone()).unwrap();
    monitor.start();
    assert!(monitor.is_running());

    let faster = MonitorConfig {
        monitoring_interval_ms: 10,
        ..config
    };
    monitor.update_config(faster).unwrap();
    assert!(monitor.is_running());
    monitor.stop();
    assert!(!monitor.is_running());
}

#[tokio::test]
async fn invalid_runtime_update_is_rejected() {
    let monitor = ResourceMonitor::new(MonitorConfig::default()).unwrap();
    let bad = MonitorConfig {
        monitoring_interval_ms: -5,
        ..Default::default()
    };
    assert!(monitor.update_config(bad).is_err());
}
