//! Convergence poller — bounded blocking wait with exponential backoff.
//!
//! Cloud mutations (instance start/stop, provisioning) are eventually
//! consistent: the API acknowledges the request long before the state is
//! observable. Every "wait until the fleet reaches state X" in this crate
//! goes through [`Poller::wait`], which evaluates a caller-supplied predicate
//! in a backoff loop. The poller is stateless and side-effect-free;
//! predicates are responsible for refreshing whatever state they inspect
//! before testing it.
//!
//! Unlike the classic unbounded poll loop, the wait carries an explicit
//! timeout and reports a distinguishable [`WaitOutcome`], so a predicate that
//! never becomes true cannot hang the process.

use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Delay schedule: `base * 2^min(i, max_exponent)`.
///
/// With the defaults this yields 0.25s, 0.5s, 1s, 2s, 4s, 8s, then 8s
/// forever — the delay saturates from the 6th retry onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max_exponent: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff {
            base: Duration::from_millis(250),
            max_exponent: 5,
        }
    }
}

impl Backoff {
    pub fn new(base: Duration, max_exponent: u32) -> Self {
        Backoff { base, max_exponent }
    }

    /// The delay before retry `iteration` (0-indexed: the delay after the
    /// first failed evaluation is `delay(0)`).
    pub fn delay(&self, iteration: u32) -> Duration {
        self.base * 2u32.pow(iteration.min(self.max_exponent))
    }
}

/// How a bounded wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The predicate returned true on the `attempts`-th evaluation.
    Converged { attempts: u32 },
    /// The timeout elapsed with the predicate still false.
    TimedOut { attempts: u32, waited: Duration },
}

impl WaitOutcome {
    pub fn converged(&self) -> bool {
        matches!(self, WaitOutcome::Converged { .. })
    }
}

/// Bounded blocking wait on a predicate.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    backoff: Backoff,
    timeout: Duration,
}

impl Default for Poller {
    /// Default: 10 minute timeout, standard backoff schedule.
    fn default() -> Self {
        Poller {
            backoff: Backoff::default(),
            timeout: Duration::from_secs(600),
        }
    }
}

impl Poller {
    pub fn new(timeout: Duration) -> Self {
        Poller {
            backoff: Backoff::default(),
            timeout,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Block until `predicate()` returns true or the timeout elapses.
    ///
    /// The predicate is evaluated at iteration 0, before any delay. On false
    /// the poller sleeps the backoff delay and retries. No sleep follows the
    /// final (true or timed-out) evaluation.
    pub fn wait<F>(&self, predicate: F) -> WaitOutcome
    where
        F: FnMut() -> bool,
    {
        self.wait_with_sleep(predicate, std::thread::sleep)
    }

    /// Like [`Poller::wait`], mapping a timeout to [`Error::StuckConvergence`]
    /// labelled with `what`.
    pub fn wait_or_err<F>(&self, what: &str, predicate: F) -> Result<()>
    where
        F: FnMut() -> bool,
    {
        match self.wait(predicate) {
            WaitOutcome::Converged { .. } => Ok(()),
            WaitOutcome::TimedOut { attempts, waited } => Err(Error::StuckConvergence {
                what: what.to_string(),
                waited,
                attempts,
            }),
        }
    }

    /// Loop body with the sleep injected, so tests can record the schedule
    /// instead of actually sleeping.
    pub(crate) fn wait_with_sleep<F, S>(&self, mut predicate: F, mut sleep: S) -> WaitOutcome
    where
        F: FnMut() -> bool,
        S: FnMut(Duration),
    {
        let started = Instant::now();
        let mut attempts = 0u32;
        for i in 0u32.. {
            attempts += 1;
            if predicate() {
                return WaitOutcome::Converged { attempts };
            }

            let waited = started.elapsed();
            if waited >= self.timeout {
                return WaitOutcome::TimedOut { attempts, waited };
            }

            sleep(self.backoff.delay(i));
        }
        unreachable!("iteration counter exhausted")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_base() {
        let b = Backoff::default();
        assert_eq!(b.delay(0), Duration::from_millis(250));
        assert_eq!(b.delay(1), Duration::from_millis(500));
        assert_eq!(b.delay(2), Duration::from_millis(1000));
        assert_eq!(b.delay(3), Duration::from_millis(2000));
        assert_eq!(b.delay(4), Duration::from_millis(4000));
    }

    #[test]
    fn backoff_saturates_at_max_exponent() {
        let b = Backoff::default();
        assert_eq!(b.delay(5), Duration::from_secs(8));
        assert_eq!(b.delay(6), Duration::from_secs(8));
        assert_eq!(b.delay(100), Duration::from_secs(8));
    }

    #[test]
    fn converges_on_third_evaluation_with_two_sleeps() {
        let poller = Poller::default();
        let mut evaluations = 0;
        let mut sleeps = Vec::new();

        let outcome = poller.wait_with_sleep(
            || {
                evaluations += 1;
                evaluations == 3
            },
            |d| sleeps.push(d),
        );

        assert_eq!(outcome, WaitOutcome::Converged { attempts: 3 });
        assert_eq!(evaluations, 3);
        // Sleeps between evaluations only: none after the final, true one.
        assert_eq!(
            sleeps,
            vec![Duration::from_millis(250), Duration::from_millis(500)]
        );
    }

    #[test]
    fn immediate_truth_never_sleeps() {
        let poller = Poller::default();
        let mut sleeps = Vec::new();

        let outcome = poller.wait_with_sleep(|| true, |d| sleeps.push(d));

        assert_eq!(outcome, WaitOutcome::Converged { attempts: 1 });
        assert!(sleeps.is_empty());
    }

    #[test]
    fn zero_timeout_reports_timed_out() {
        let poller = Poller::new(Duration::ZERO);
        let outcome = poller.wait(|| false);
        assert!(matches!(
            outcome,
            WaitOutcome::TimedOut { attempts: 1, .. }
        ));
    }

    #[test]
    fn wait_or_err_maps_timeout_to_stuck_convergence() {
        let poller = Poller::new(Duration::ZERO);
        let err = poller.wait_or_err("instances to start", || false).unwrap_err();
        match err {
            Error::StuckConvergence { what, attempts, .. } => {
                assert_eq!(what, "instances to start");
                assert_eq!(attempts, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn wait_or_err_ok_on_convergence() {
        let poller = Poller::default();
        assert!(poller.wait_or_err("anything", || true).is_ok());
    }
}
