use std::time::Duration;

use num_craze_core::RoundId;

/// The single round countdown. The world holds at most one.
#[derive(Clone, Debug)]
pub(crate) struct Countdown {
    round: RoundId,
    period: Duration,
    accumulated: Duration,
}

impl Countdown {
    pub(crate) fn start(round: RoundId, period: Duration) -> Self {
        Self {
            round,
            period,
            accumulated: Duration::ZERO,
        }
    }

    pub(crate) fn round(&self) -> RoundId {
        self.round
    }

    /// Accumulates `dt` and returns how many whole periods elapsed.
    pub(crate) fn advance(&mut self, dt: Duration) -> u32 {
        if self.period.is_zero() {
            return 0;
        }

        self.accumulated = self.accumulated.saturating_add(dt);
        let mut elapsed = 0;
        while self.accumulated >= self.period {
            self.accumulated -= self.period;
            elapsed += 1;
        }
        elapsed
    }
}
