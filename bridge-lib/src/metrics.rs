use crate::template_cache::TemplateCache;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A snapshot of the bridge metrics as plain counters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BridgeMetricsSnapshot {
    /// Templates fetched from the node
    pub templates_fetched: u64,
    /// Templates published to the sink
    pub templates_published: u64,
    /// Poll cycles skipped because the fetch failed
    pub fetch_failures: u64,
    /// Templates that could not be serialized
    pub encode_failures: u64,
    /// Publishes that failed at the sink
    pub publish_failures: u64,
}

impl Display for BridgeMetricsSnapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Bridge Metrics Snapshot:")?;
        writeln!(f, "  Templates fetched: {}", self.templates_fetched)?;
        writeln!(f, "  Templates published: {}", self.templates_published)?;
        writeln!(f, "  Fetch failures: {}", self.fetch_failures)?;
        writeln!(f, "  Encode failures: {}", self.encode_failures)?;
        write!(f, "  Publish failures: {}", self.publish_failures)
    }
}

/// Atomic counters shared between the poll loop and the status reporter.
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    pub templates_fetched: AtomicU64,
    pub templates_published: AtomicU64,
    pub fetch_failures: AtomicU64,
    pub encode_failures: AtomicU64,
    pub publish_failures: AtomicU64,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BridgeMetricsSnapshot {
        BridgeMetricsSnapshot {
            templates_fetched: self.templates_fetched.load(Ordering::Relaxed),
            templates_published: self.templates_published.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
        }
    }

    pub fn increment_templates_fetched(&self) {
        self.templates_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_templates_published(&self) {
        self.templates_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_fetch_failures(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_encode_failures(&self) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_publish_failures(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }
}

/// Shared metrics instance for use across tasks
pub type SharedMetrics = Arc<BridgeMetrics>;

pub fn create_shared_metrics() -> SharedMetrics {
    Arc::new(BridgeMetrics::new())
}

/// Periodically logs a metrics snapshot. The only reader of the template
/// cache besides tests; the health path does its own probing instead.
pub async fn run_status_reporter<T>(
    mut shutdown: tokio::sync::oneshot::Receiver<()>,
    cache: TemplateCache<T>,
    metrics: SharedMetrics,
    interval: Duration,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            biased;
            shutdown_result = &mut shutdown => {
                shutdown_result
                    .inspect(|_| info!("Shutdown signal received, stopping status reporter"))
                    .inspect_err(|e| warn!("Shutdown receiver error: {}", e))?;
                return Ok(());
            }
            _ = ticker.tick() => {
                if cache.load().is_none() {
                    info!("No block template fetched yet");
                } else {
                    info!("{}", metrics.snapshot());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let metrics = BridgeMetrics::new();
        metrics.increment_templates_fetched();
        metrics.increment_templates_fetched();
        metrics.increment_templates_published();
        metrics.increment_fetch_failures();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.templates_fetched, 2);
        assert_eq!(snapshot.templates_published, 1);
        assert_eq!(snapshot.fetch_failures, 1);
        assert_eq!(snapshot.encode_failures, 0);
        assert_eq!(snapshot.publish_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn status_reporter_stops_on_shutdown() {
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let cache: TemplateCache<u64> = TemplateCache::new();
        let handle = tokio::spawn(run_status_reporter(
            shutdown_rx,
            cache,
            create_shared_metrics(),
            Duration::from_secs(5),
        ));

        tokio::time::sleep(Duration::from_secs(11)).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
