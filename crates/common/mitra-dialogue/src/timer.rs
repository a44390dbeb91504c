//! Source of the simulated response latency.

use async_trait::async_trait;
use tokio::time::Instant;

/// Waits until a delivery deadline. Swapped out in tests to drive time by hand.
#[async_trait]
pub trait Timer: Send + Sync {
    async fn sleep_until(&self, deadline: Instant);
}

/// Timer backed by the Tokio clock. Honors `tokio::time::pause`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    async fn sleep_until(&self, deadline: Instant) {
        tokio::time::sleep_until(deadline).await;
    }
}
