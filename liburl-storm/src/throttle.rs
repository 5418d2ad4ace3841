use tokio::time::sleep;

use crate::types::ThrottleConfig;

/// Pauses the dispatcher between dispatch intervals.
pub struct Throttle {
    config: ThrottleConfig,
    dispatched: u32,
}

impl Throttle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            dispatched: 0,
        }
    }

    /// Called before each dispatch: sleeps first when the count so far sits
    /// on the interval boundary, then records the new dispatch. A run that
    /// ends exactly on the boundary stops without a trailing sleep.
    pub async fn tick(&mut self) {
        if self.config.every > 0 && self.dispatched > 0 && self.dispatched % self.config.every == 0
        {
            tracing::debug!(
                "Throttling for {:?} after {} dispatches",
                self.config.pause,
                self.dispatched
            );
            sleep(self.config.pause).await;
        }
        self.dispatched += 1;
    }
}
