use crate::metrics::SharedMetrics;
use crate::publisher::TemplateSink;
use crate::template_cache::TemplateCache;
use crate::template_source::TemplateSource;
use kaspa_addresses::Address;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// The polling loop: fetch a template, cache it, serialize it, publish it,
/// wait one interval, repeat until shutdown.
///
/// Every failure mode skips the rest of its cycle and nothing more. The
/// cadence is fixed on purpose: the node's template-change rate is bounded,
/// so a missed cycle is cheap and backoff would only add latency.
#[derive(bon::Builder)]
pub struct TemplatePoller<N, S>
where
    N: TemplateSource,
    S: TemplateSink,
{
    source: N,
    sink: S,
    cache: TemplateCache<N::Template>,
    mining_address: Address,
    extra_data: Vec<u8>,
    channel: String,
    poll_interval: Duration,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
    metrics: SharedMetrics,
}

impl<N, S> TemplatePoller<N, S>
where
    N: TemplateSource,
    S: TemplateSink,
{
    pub async fn task(mut self) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        // A slow cycle delays the next tick instead of bursting to catch up.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                shutdown_result = &mut self.shutdown_rx => {
                    shutdown_result
                        .inspect(|_| info!("Shutdown signal received, stopping template poller"))
                        .inspect_err(|e| warn!("Shutdown receiver error: {}", e))?;
                    return Ok(());
                }
                _ = ticker.tick() => self.poll_once().await,
            }
        }
    }

    async fn poll_once(&self) {
        let template = match self
            .source
            .fetch_template(&self.mining_address, &self.extra_data)
            .await
        {
            Ok(template) => Arc::new(template),
            Err(err) => {
                self.metrics.increment_fetch_failures();
                warn!("error fetching block template: {err}");
                return;
            }
        };

        self.cache.store(template.clone());
        self.metrics.increment_templates_fetched();

        let payload = match serde_json::to_vec(template.as_ref()) {
            Ok(payload) => payload,
            Err(err) => {
                self.metrics.increment_encode_failures();
                error!("error serializing template to JSON: {err}");
                return;
            }
        };

        match self.sink.publish(&self.channel, payload).await {
            Ok(()) => {
                self.metrics.increment_templates_published();
                debug!(channel = %self.channel, "template published");
            }
            Err(err) => {
                // The template stays cached; the next cycle overwrites it.
                self.metrics.increment_publish_failures();
                error!("error publishing template to {}: {err}", self.channel);
            }
        }
    }
}
