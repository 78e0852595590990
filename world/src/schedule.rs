use std::time::Duration;

use num_craze_core::RoundId;

/// Work deferred until a delay elapses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Deferred {
    /// Ask for round parameters, or ask again if the last request went unanswered.
    RequestRound,
    /// The round is ready; start its countdown.
    StartCountdown(RoundId),
    /// The win celebration is over; leave the round.
    FinishRound(RoundId),
    /// The level-complete interlude is over; start the next level.
    AdvanceLevel,
}

/// The single pending delayed transition. Replacing it cancels the previous one.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Pending {
    action: Deferred,
    remaining: Duration,
}

impl Pending {
    pub(crate) fn after(delay: Duration, action: Deferred) -> Self {
        Self {
            action,
            remaining: delay,
        }
    }

    pub(crate) fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Consumes up to `dt` of the delay. Returns the action and the unused time once due.
    pub(crate) fn consume(&mut self, dt: Duration) -> Option<(Deferred, Duration)> {
        if dt < self.remaining {
            self.remaining -= dt;
            None
        } else {
            let leftover = dt - self.remaining;
            self.remaining = Duration::ZERO;
            Some((self.action, leftover))
        }
    }
}
