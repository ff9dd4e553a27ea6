//! Bounded retry primitives.
//!
//! Every retry in the session is an explicit attempt counter with a ceiling
//! and a defined terminal outcome. Nothing here re-arms itself.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Result of [`poll_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The probe succeeded on the given attempt (1-based).
    Ready { attempts: u32 },
    /// The ceiling was reached without success.
    Exhausted { attempts: u32 },
    /// The token was cancelled before the probe succeeded.
    Cancelled,
}

/// Polls `probe` every `interval`, at most `max_attempts` times.
///
/// The first probe runs after one interval. Cancellation is checked while
/// waiting between probes.
///
/// # Arguments
/// * `label` - Name used in log lines
/// * `interval` - Wait before each probe
/// * `max_attempts` - Hard ceiling on probes
/// * `cancel` - Stops polling early
/// * `probe` - Returns `true` once the awaited condition holds
pub async fn poll_until<F>(
    label: &str,
    interval: Duration,
    max_attempts: u32,
    cancel: &CancellationToken,
    mut probe: F,
) -> PollOutcome
where
    F: FnMut() -> bool,
{
    for attempt in 1..=max_attempts {
        tokio::select! {
            _ = cancel.cancelled() => {
                log::debug!("[Retry] {} polling cancelled after {} attempt(s)", label, attempt - 1);
                return PollOutcome::Cancelled;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        if probe() {
            log::debug!("[Retry] {} ready after {} attempt(s)", label, attempt);
            return PollOutcome::Ready { attempts: attempt };
        }
    }

    log::warn!(
        "[Retry] {} still not ready after {} attempts ({}ms apart)",
        label,
        max_attempts,
        interval.as_millis()
    );
    PollOutcome::Exhausted {
        attempts: max_attempts,
    }
}

/// Attempt counter with a fixed ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    used: u32,
    ceiling: u32,
}

impl RetryBudget {
    pub const fn new(ceiling: u32) -> Self {
        Self { used: 0, ceiling }
    }

    /// Consumes one attempt. Returns `false` once the ceiling is reached.
    pub fn try_consume(&mut self) -> bool {
        if self.used >= self.ceiling {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test(start_paused = true)]
    async fn poll_stops_at_ceiling() {
        let calls = Cell::new(0);
        let cancel = CancellationToken::new();
        let started = tokio::time::Instant::now();

        let outcome = poll_until("test", Duration::from_millis(100), 5, &cancel, || {
            calls.set(calls.get() + 1);
            false
        })
        .await;

        assert_eq!(outcome, PollOutcome::Exhausted { attempts: 5 });
        assert_eq!(calls.get(), 5);
        assert_eq!(started.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_reports_successful_attempt() {
        let calls = Cell::new(0);
        let cancel = CancellationToken::new();

        let outcome = poll_until("test", Duration::from_millis(10), 100, &cancel, || {
            calls.set(calls.get() + 1);
            calls.get() == 3
        })
        .await;

        assert_eq!(outcome, PollOutcome::Ready { attempts: 3 });
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_stops_polling() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = poll_until("test", Duration::from_millis(10), 100, &cancel, || {
            panic!("probe must not run after cancellation")
        })
        .await;

        assert_eq!(outcome, PollOutcome::Cancelled);
    }

    #[test]
    fn budget_allows_exactly_ceiling_attempts() {
        let mut budget = RetryBudget::new(1);
        assert!(budget.try_consume());
        assert!(!budget.try_consume());
        assert_eq!(budget.used(), 1);
        budget.reset();
        assert!(budget.try_consume());
    }
}
