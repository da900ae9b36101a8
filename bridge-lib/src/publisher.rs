use crate::error::{ProbeError, PublishError};
use crate::health::DependencyProbe;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::future::Future;
use tracing::info;

/// Sink for serialized templates. One call, one write to the broker; a failed
/// publish is the caller's problem.
pub trait TemplateSink: Send + Sync {
    fn publish(
        &self,
        channel: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;
}

/// Publishes templates on a Redis pub/sub channel.
///
/// The multiplexed connection is cheap to clone and safe for concurrent use,
/// so the poll loop and the health probes share one connection.
#[derive(Clone)]
pub struct RedisPublisher {
    connection: MultiplexedConnection,
}

impl RedisPublisher {
    /// Opens the connection and verifies it with a PING. Failure here is a
    /// startup error, the caller is expected to abort.
    pub async fn connect(redis_url: &str) -> Result<Self, PublishError> {
        let client = redis::Client::open(redis_url)?;
        let mut connection = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut connection).await?;
        info!("Connected to Redis");
        Ok(Self { connection })
    }
}

impl TemplateSink for RedisPublisher {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        let mut connection = self.connection.clone();
        let _: () = connection.publish(channel, payload).await?;
        Ok(())
    }
}

impl DependencyProbe for RedisPublisher {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn probe(&self) -> Result<(), ProbeError> {
        let mut connection = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(|err| ProbeError::Failed(err.to_string()))?;
        Ok(())
    }
}
