//! The downstream delivery seam.

use std::future::Future;

use async_trait::async_trait;

/// Receives one coalesced payload per settled burst.
///
/// Failures are opaque to the engine: they are logged and counted, never
/// retried. Implementations doing I/O are cancelled by dropping the
/// returned future.
#[async_trait]
pub trait Consumer: Send + Sync {
    async fn deliver(&self, payload: String, key: String) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> Consumer for F
where
    F: Fn(String, String) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn deliver(&self, payload: String, key: String) -> anyhow::Result<()> {
        (self)(payload, key).await
    }
}
