use axum::routing::get;
use axum::Router;
use bridge_lib::health::{DependencyProbe, HealthChecker, HealthReport, ServiceStatus};
use futures_util::FutureExt;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing::error;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod health;

#[derive(OpenApi)]
#[openapi(
    paths(health::get_health),
    components(schemas(HealthReport, ServiceStatus)),
    tags(
        (name = "Kaspa Template Bridge API", description = "Kaspa block template bridge API")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct Api<N, S>
where
    N: DependencyProbe,
    S: DependencyProbe,
{
    checker: HealthChecker<N, S>,
}

impl<N, S> Api<N, S>
where
    N: DependencyProbe,
    S: DependencyProbe,
{
    pub fn new(checker: HealthChecker<N, S>) -> Self {
        Self { checker }
    }

    pub async fn serve(
        self,
        bind_address: &str,
        shutdown: tokio::sync::oneshot::Receiver<()>,
    ) -> anyhow::Result<()> {
        let addr: SocketAddr = bind_address.parse()?;
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Starting API server on {}", addr);
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown.map(|v| {
                _ = v.inspect_err(|_err| error!("shutdown receive error"));
            }))
            .await?;
        Ok(())
    }

    fn router(&self) -> Router {
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .route("/health", get(health::get_health::<N, S>))
            .layer(CorsLayer::permissive())
            .with_state(self.checker.clone())
    }
}
