use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{sleep_until, Instant};

const MIN_SPACING: Duration = Duration::from_millis(50);

pub struct RateLimiter {
    spacing: Duration,
    next_slot: AsyncMutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn per_second(qps: u32) -> Self {
        let spacing = Duration::from_secs(1) / qps.max(1);
        Self {
            spacing: spacing.max(MIN_SPACING),
            next_slot: AsyncMutex::new(None),
        }
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Holds the caller until its slot opens. Callers queue on the lock, so
    /// concurrent geocodes go out in arrival order.
    pub async fn wait(&self) {
        let mut next_slot = self.next_slot.lock().await;
        if let Some(slot) = *next_slot {
            sleep_until(slot).await;
        }
        *next_slot = Some(Instant::now() + self.spacing);
    }
}
