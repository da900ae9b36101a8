pub mod error;
pub mod health;
pub mod metrics;
pub mod poller;
pub mod publisher;
pub mod template_cache;
pub mod template_source;
