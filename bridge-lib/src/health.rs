use crate::error::ProbeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// A dependency the service cannot live without, checked on demand.
///
/// Probes return typed results instead of relying on panic recovery; the
/// checker still contains the residual panic case so a broken probe can never
/// take the health endpoint down with it.
pub trait DependencyProbe: Clone + Send + Sync + 'static {
    /// Key under which this dependency appears in the health report.
    fn name(&self) -> &'static str;

    fn probe(&self) -> impl Future<Output = Result<(), ProbeError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub enum ServiceStatus {
    Ok,
    Fail,
}

/// Aggregate health of the bridge: overall status plus a per-dependency
/// breakdown, mirroring what gets serialized on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct HealthReport {
    pub status: ServiceStatus,
    pub services: BTreeMap<String, ServiceStatus>,
}

impl HealthReport {
    pub fn is_ok(&self) -> bool {
        self.status == ServiceStatus::Ok
    }
}

/// Re-checks connectivity to the node and the sink on every call. No caching:
/// a health query reports what is true now, not what was true when the poll
/// loop last ran.
#[derive(Clone)]
pub struct HealthChecker<N, S> {
    node: N,
    sink: S,
    probe_timeout: Duration,
}

impl<N, S> HealthChecker<N, S>
where
    N: DependencyProbe,
    S: DependencyProbe,
{
    pub fn new(node: N, sink: S, probe_timeout: Duration) -> Self {
        Self {
            node,
            sink,
            probe_timeout,
        }
    }

    /// Probes both dependencies concurrently. Overall status is `ok` iff every
    /// probe came back `ok`.
    pub async fn check(&self) -> HealthReport {
        let (node_outcome, sink_outcome) = tokio::join!(
            run_probe(self.node.clone(), self.probe_timeout),
            run_probe(self.sink.clone(), self.probe_timeout),
        );

        let mut services = BTreeMap::new();
        let mut status = ServiceStatus::Ok;
        for (name, outcome) in [
            (self.node.name(), node_outcome),
            (self.sink.name(), sink_outcome),
        ] {
            let service_status = match outcome {
                Ok(()) => ServiceStatus::Ok,
                Err(err) => {
                    warn!(dependency = name, "dependency probe failed: {err}");
                    status = ServiceStatus::Fail;
                    ServiceStatus::Fail
                }
            };
            services.insert(name.to_string(), service_status);
        }

        HealthReport { status, services }
    }
}

/// Runs one probe under a bounded timeout, on its own task so that a
/// panicking probe surfaces as a failed outcome instead of unwinding through
/// the health query.
async fn run_probe<P: DependencyProbe>(
    probe: P,
    limit: Duration,
) -> Result<(), ProbeError> {
    let outcome = tokio::spawn(async move { tokio::time::timeout(limit, probe.probe()).await }).await;
    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(_elapsed)) => Err(ProbeError::Timeout(limit)),
        Err(join_err) if join_err.is_panic() => Err(ProbeError::Panicked),
        Err(join_err) => Err(ProbeError::Failed(join_err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    enum Behavior {
        Ok,
        Fail,
        Panic,
        Hang,
    }

    #[derive(Clone)]
    struct FakeProbe {
        name: &'static str,
        behavior: Behavior,
    }

    impl FakeProbe {
        fn new(name: &'static str, behavior: Behavior) -> Self {
            Self { name, behavior }
        }
    }

    impl DependencyProbe for FakeProbe {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn probe(&self) -> Result<(), ProbeError> {
            match self.behavior {
                Behavior::Ok => Ok(()),
                Behavior::Fail => Err(ProbeError::Failed("connection refused".to_string())),
                Behavior::Panic => panic!("probe blew up"),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }
            }
        }
    }

    fn checker(node: Behavior, sink: Behavior) -> HealthChecker<FakeProbe, FakeProbe> {
        HealthChecker::new(
            FakeProbe::new("kaspa_rpc", node),
            FakeProbe::new("redis", sink),
            Duration::from_millis(100),
        )
    }

    #[tokio::test]
    async fn ok_when_both_probes_succeed() {
        let report = checker(Behavior::Ok, Behavior::Ok).check().await;
        assert!(report.is_ok());
        assert_eq!(report.services["kaspa_rpc"], ServiceStatus::Ok);
        assert_eq!(report.services["redis"], ServiceStatus::Ok);
    }

    #[tokio::test]
    async fn failing_node_probe_flips_overall_only() {
        let report = checker(Behavior::Fail, Behavior::Ok).check().await;
        assert!(!report.is_ok());
        assert_eq!(report.services["kaspa_rpc"], ServiceStatus::Fail);
        assert_eq!(report.services["redis"], ServiceStatus::Ok);
    }

    #[tokio::test]
    async fn failing_sink_probe_flips_overall_only() {
        let report = checker(Behavior::Ok, Behavior::Fail).check().await;
        assert!(!report.is_ok());
        assert_eq!(report.services["kaspa_rpc"], ServiceStatus::Ok);
        assert_eq!(report.services["redis"], ServiceStatus::Fail);
    }

    #[tokio::test]
    async fn panicking_probe_reports_fail_without_crashing_the_query() {
        let report = checker(Behavior::Panic, Behavior::Ok).check().await;
        assert!(!report.is_ok());
        assert_eq!(report.services["kaspa_rpc"], ServiceStatus::Fail);
        assert_eq!(report.services["redis"], ServiceStatus::Ok);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_probe_is_bounded_by_the_timeout() {
        let report = checker(Behavior::Ok, Behavior::Hang).check().await;
        assert!(!report.is_ok());
        assert_eq!(report.services["redis"], ServiceStatus::Fail);
    }

    #[test]
    fn report_serializes_to_the_wire_format() {
        let report = HealthReport {
            status: ServiceStatus::Fail,
            services: BTreeMap::from([
                ("kaspa_rpc".to_string(), ServiceStatus::Ok),
                ("redis".to_string(), ServiceStatus::Fail),
            ]),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"{"status":"fail","services":{"kaspa_rpc":"ok","redis":"fail"}}"#
        );
    }
}
