//! ResourceMonitor — the sampling loop and emergency dispatch.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use engram_core::config::MonitorConfig;
use engram_core::{EngramResult, PressureLevel, ResourceMetrics};

use crate::collector::Collector;
use crate::pressure::{analyze, PressureAnalysis};
use crate::validation::validate_config;

/// Async cleanup handler invoked on EMERGENCY pressure. Failures are
/// swallowed by the monitor loop.
pub type CleanupHandler = Arc<dyn Fn(PressureAnalysis) -> BoxFuture<'static, ()> + Send + Sync>;

/// Collection performance counters, updated on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerfCounters {
    pub total_collections: u64,
    pub avg_collection_time_ms: f64,
    pub max_collection_time_ms: f64,
    pub collection_errors: u64,
}

struct Inner {
    config: RwLock<MonitorConfig>,
    collector: Mutex<Collector>,
    history: Mutex<VecDeque<ResourceMetrics>>,
    handlers: Mutex<Vec<CleanupHandler>>,
    perf: Mutex<PerfCounters>,
    last_alert: Mutex<Option<Instant>>,
}

/// The resource monitor. `start` takes an immediate sample and then one
/// per interval; samples land in a bounded ring, newest last.
pub struct ResourceMonitor {
    inner: Arc<Inner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ResourceMonitor {
    /// Construct with a validated config.
    pub fn new(config: MonitorConfig) -> EngramResult<Self> {
        validate_config(&config)?;
        let simple_mode = config.simple_mode;
        Ok(Self {
            inner: Arc::new(Inner {
                config: RwLock::new(config),
                collector: Mutex::new(Collector::new(simple_mode)),
                history: Mutex::new(VecDeque::new()),
                handlers: Mutex::new(Vec::new()),
                perf: Mutex::new(PerfCounters::default()),
                last_alert: Mutex::new(None),
            }),
            task: Mutex::new(None),
        })
    }

    /// Register an emergency cleanup handler.
    pub fn register_cleanup_handler(&self, handler: CleanupHandler) {
        if let Ok(mut handlers) = self.inner.handlers.lock() {
            handlers.push(handler);
        }
    }

    /// Start the sampling loop. No-op when already running.
    pub fn start(&self) {
        let mut task = match self.task.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let inner = self.inner.clone();
        *task = Some(tokio::spawn(async move {
            let period = inner
                .config
                .read()
                .map(|config| Duration::from_millis(config.monitoring_interval_ms.max(1) as u64))
                .unwrap_or(Duration::from_millis(5_000));
            // The first tick completes immediately.
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                Self::tick(&inner).await;
            }
        }));
    }

    /// Stop the sampling loop. Idempotent.
    pub fn stop(&self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }

    /// Whether the loop is currently running.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .map(|t| t.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Re-validate and swap the config. A changed interval restarts the
    /// loop if it is running.
    pub fn update_config(&self, config: MonitorConfig) -> EngramResult<()> {
        validate_config(&config)?;
        let interval_changed = {
            let mut current = self
                .inner
                .config
                .write()
                .map_err(|_| engram_core::EngramError::internal("config lock poisoned"))?;
            let changed = current.monitoring_interval_ms != config.monitoring_interval_ms;
            *current = config;
            changed
        };
        if interval_changed && self.is_running() {
            self.stop();
            self.start();
        }
        Ok(())
    }

    /// One collection tick: sample, ingest, dispatch.
    async fn tick(inner: &Arc<Inner>) {
        let started = Instant::now();
        let metrics = match inner.collector.lock() {
            Ok(mut collector) => collector.sample(),
            Err(_) => {
                if let Ok(mut perf) = inner.perf.lock() {
                    perf.collection_errors += 1;
                }
                return;
            }
        };
        let elapsed = started.elapsed();
        Self::record_perf(inner, elapsed);
        Self::ingest(inner, metrics).await;
    }

    fn record_perf(inner: &Inner, elapsed: Duration) {
        let Ok(mut perf) = inner.perf.lock() else {
            return;
        };
        let elapsed_ms = elapsed.as_secs_f64() * 1_000.0;
        let n = perf.total_collections as f64;
        perf.avg_collection_time_ms = (perf.avg_collection_time_ms * n + elapsed_ms) / (n + 1.0);
        perf.max_collection_time_ms = perf.max_collection_time_ms.max(elapsed_ms);
        perf.total_collections += 1;
    }

    /// Append a snapshot to the ring, analyze it, and fire the emergency
    /// path when warranted. Public so callers (and tests) can inject
    /// synthetic snapshots.
    pub async fn ingest_sample(&self, metrics: ResourceMetrics) -> PressureAnalysis {
        Self::ingest(&self.inner, metrics).await
    }

    async fn ingest(inner: &Arc<Inner>, metrics: ResourceMetrics) -> PressureAnalysis {
        let config = match inner.config.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        if let Ok(mut history) = inner.history.lock() {
            history.push_back(metrics.clone());
            while history.len() > config.history_size.max(1) {
                history.pop_front();
            }
        }

        let analysis = analyze(&metrics, &config);
        if analysis.overall == PressureLevel::Emergency && config.emergency_cleanup {
            Self::dispatch_emergency(inner, &config, analysis.clone()).await;
        }
        analysis
    }

    async fn dispatch_emergency(inner: &Arc<Inner>, config: &MonitorConfig, analysis: PressureAnalysis) {
        // Cooldown gate.
        {
            let Ok(mut last_alert) = inner.last_alert.lock() else {
                return;
            };
            let cooldown = Duration::from_millis(config.alert_cooldown_ms);
            if last_alert.is_some_and(|t| t.elapsed() < cooldown) {
                debug!("emergency refire suppressed by cooldown");
                return;
            }
            *last_alert = Some(Instant::now());
        }

        let handlers: Vec<CleanupHandler> = match inner.handlers.lock() {
            Ok(handlers) => handlers.clone(),
            Err(_) => return,
        };
        warn!(
            memory = ?analysis.memory,
            cpu = ?analysis.cpu,
            handlers = handlers.len(),
            "EMERGENCY pressure, invoking cleanup handlers"
        );
        for handler in handlers {
            // Isolate each handler; a panic must not kill the loop.
            let future = handler(analysis.clone());
            if tokio::spawn(future).await.is_err() {
                warn!("cleanup handler panicked");
            }
        }
    }

    /// Retained snapshots, oldest first.
    pub fn history(&self) -> Vec<ResourceMetrics> {
        self.inner
            .history
            .lock()
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Collection performance counters.
    pub fn perf_counters(&self) -> PerfCounters {
        self.inner.perf.lock().map(|p| *p).unwrap_or_default()
    }

    /// Map the current pressure onto the health check contract.
    pub fn health(&self) -> EngramResult<engram_core::health::HealthCheckResult> {
        use engram_core::health::HealthCheckResult;
        let analysis = self.analyze_now()?;
        let result = match analysis.overall {
            PressureLevel::Normal => HealthCheckResult::healthy(),
            PressureLevel::Warning => HealthCheckResult::degraded("resource pressure: warning"),
            PressureLevel::Critical => HealthCheckResult::degraded("resource pressure: critical"),
            PressureLevel::Emergency => HealthCheckResult::unhealthy("resource pressure: emergency"),
        };
        Ok(result)
    }

    /// Take a snapshot and analyze it outside the loop.
    pub fn analyze_now(&self) -> EngramResult<PressureAnalysis> {
        let metrics = self
            .inner
            .collector
            .lock()
            .map(|mut c| c.sample())
            .map_err(|_| engram_core::EngramError::internal("collector lock poisoned"))?;
        let config = self
            .inner
            .config
            .read()
            .map_err(|_| engram_core::EngramError::internal("config lock poisoned"))?;
        Ok(analyze(&metrics, &config))
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
