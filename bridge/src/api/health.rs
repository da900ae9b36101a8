use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bridge_lib::health::{DependencyProbe, HealthChecker, HealthReport};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "All dependencies reachable", body = HealthReport),
        (status = 503, description = "One or more dependencies failing", body = HealthReport)
    )
)]
pub async fn get_health<N, S>(
    State(checker): State<HealthChecker<N, S>>,
) -> impl IntoResponse
where
    N: DependencyProbe,
    S: DependencyProbe,
{
    let report = checker.check().await;
    let code = if report.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use bridge_lib::error::ProbeError;
    use std::time::Duration;
    use tower::ServiceExt;

    #[derive(Clone)]
    struct StaticProbe {
        name: &'static str,
        ok: bool,
    }

    impl DependencyProbe for StaticProbe {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn probe(&self) -> Result<(), ProbeError> {
            if self.ok {
                Ok(())
            } else {
                Err(ProbeError::Failed("connection refused".to_string()))
            }
        }
    }

    fn test_router(node_ok: bool, sink_ok: bool) -> Router {
        let checker = HealthChecker::new(
            StaticProbe {
                name: "kaspa_rpc",
                ok: node_ok,
            },
            StaticProbe {
                name: "redis",
                ok: sink_ok,
            },
            Duration::from_millis(100),
        );
        Router::new()
            .route("/health", get(get_health::<StaticProbe, StaticProbe>))
            .with_state(checker)
    }

    async fn get_health_response(app: Router) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn healthy_dependencies_return_200() {
        let (status, body) = get_health_response(test_router(true, true)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["services"]["kaspa_rpc"], "ok");
        assert_eq!(body["services"]["redis"], "ok");
    }

    #[tokio::test]
    async fn failing_sink_returns_503_with_accurate_breakdown() {
        let (status, body) = get_health_response(test_router(true, false)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "fail");
        assert_eq!(body["services"]["kaspa_rpc"], "ok");
        assert_eq!(body["services"]["redis"], "fail");
    }

    #[tokio::test]
    async fn failing_node_returns_503_with_accurate_breakdown() {
        let (status, body) = get_health_response(test_router(false, true)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "fail");
        assert_eq!(body["services"]["kaspa_rpc"], "fail");
        assert_eq!(body["services"]["redis"], "ok");
    }
}
