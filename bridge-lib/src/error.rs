use std::time::Duration;
use thiserror::Error;

/// Failure of a single template fetch. The poller owns the retry policy,
/// the source never retries on its own.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("template request failed: {0}")]
    Rpc(#[from] kaspa_rpc_core::RpcError),
    #[error("node is not connected")]
    Disconnected,
}

/// Failure of a single publish. Surfaced to the caller, never retried here.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Outcome of a health probe that did not come back `ok`.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe failed: {0}")]
    Failed(String),
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("probe task panicked")]
    Panicked,
}
