//! Pause policies: how a workload's timed suspension interacts with cancellation.

use super::CancellationSignal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Default slice length for [`PausePolicy::Poll`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Governs the cancellation latency of [`WorkerContext::pause`](crate::worker::WorkerContext::pause).
///
/// The policy never shortens a pause for any reason other than a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PausePolicy {
    /// Sleep for the full duration. Requests made during the pause are only
    /// seen after it ends, so latency is bounded by the pause itself.
    Fixed,
    /// Sleep in slices of `interval`, checking the signal between slices.
    /// Latency is bounded by `interval`. A zero interval uses
    /// [`DEFAULT_POLL_INTERVAL`].
    Poll {
        /// Length of each sleep slice.
        #[serde(with = "duration_ms")]
        interval: Duration,
    },
    /// Block on the signal's condition variable and wake as soon as a stop is
    /// requested.
    Interruptible,
}

impl Default for PausePolicy {
    fn default() -> Self {
        Self::Poll {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl fmt::Display for PausePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Poll { interval } => write!(f, "poll({}ms)", interval.as_millis()),
            Self::Interruptible => write!(f, "interruptible"),
        }
    }
}

impl PausePolicy {
    /// Polls the signal every `interval`. A zero interval falls back to the default.
    #[must_use]
    pub fn poll(interval: Duration) -> Self {
        Self::Poll {
            interval: nonzero_interval(interval),
        }
    }

    /// Suspends the calling thread for `duration` under this policy.
    ///
    /// Returns whether cancellation had been requested when the pause ended.
    pub fn pause(&self, signal: &CancellationSignal, duration: Duration) -> bool {
        match *self {
            Self::Fixed => {
                std::thread::sleep(duration);
            }
            Self::Poll { interval } => {
                let interval = nonzero_interval(interval);
                // `None` means the pause outlasts any representable instant: wait for a stop.
                let deadline = Instant::now().checked_add(duration);
                while !signal.is_requested() {
                    let slice = match deadline {
                        Some(deadline) => {
                            let remaining = deadline.saturating_duration_since(Instant::now());
                            if remaining.is_zero() {
                                break;
                            }
                            remaining.min(interval)
                        }
                        None => interval,
                    };
                    std::thread::sleep(slice);
                }
            }
            Self::Interruptible => {
                signal.wait_timeout(duration);
            }
        }
        signal.is_requested()
    }
}

fn nonzero_interval(interval: Duration) -> Duration {
    if interval.is_zero() {
        DEFAULT_POLL_INTERVAL
    } else {
        interval
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::thread;

    fn request_after(signal: &Arc<CancellationSignal>, delay: Duration) -> thread::JoinHandle<()> {
        let signal = Arc::clone(signal);
        thread::spawn(move || {
            thread::sleep(delay);
            signal.request();
        })
    }

    #[test]
    fn test_default_is_poll_10ms() {
        assert_eq!(
            PausePolicy::default(),
            PausePolicy::Poll {
                interval: Duration::from_millis(10)
            }
        );
    }

    #[test]
    fn test_poll_zero_interval_uses_default() {
        assert_eq!(PausePolicy::poll(Duration::ZERO), PausePolicy::default());
    }

    #[test]
    fn test_display() {
        assert_eq!(PausePolicy::Fixed.to_string(), "fixed");
        assert_eq!(PausePolicy::default().to_string(), "poll(10ms)");
        assert_eq!(PausePolicy::Interruptible.to_string(), "interruptible");
    }

    #[test]
    fn test_fixed_ignores_request_during_pause() {
        let signal = Arc::new(CancellationSignal::new());
        let requester = request_after(&signal, Duration::from_millis(10));

        let start = Instant::now();
        let observed = PausePolicy::Fixed.pause(&signal, Duration::from_millis(150));
        assert!(start.elapsed() >= Duration::from_millis(150));
        assert!(observed);
        requester.join().unwrap();
    }

    #[test]
    fn test_poll_returns_within_interval() {
        let signal = Arc::new(CancellationSignal::new());
        let requester = request_after(&signal, Duration::from_millis(20));

        let start = Instant::now();
        let observed = PausePolicy::poll(Duration::from_millis(5)).pause(&signal, Duration::from_secs(5));
        assert!(observed);
        assert!(start.elapsed() < Duration::from_secs(2));
        requester.join().unwrap();
    }

    #[test]
    fn test_interruptible_wakes_on_request() {
        let signal = Arc::new(CancellationSignal::new());
        let requester = request_after(&signal, Duration::from_millis(20));

        let start = Instant::now();
        assert!(PausePolicy::Interruptible.pause(&signal, Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(2));
        requester.join().unwrap();
    }

    #[test]
    fn test_pause_without_request_runs_full_duration() {
        let signal = CancellationSignal::new();
        for policy in [PausePolicy::Fixed, PausePolicy::default(), PausePolicy::Interruptible] {
            let start = Instant::now();
            assert!(!policy.pause(&signal, Duration::from_millis(20)));
            assert!(start.elapsed() >= Duration::from_millis(20), "{policy} returned early");
        }
    }

    #[test]
    fn test_unbounded_pause_ends_on_request() {
        for policy in [PausePolicy::default(), PausePolicy::Interruptible] {
            let signal = Arc::new(CancellationSignal::new());
            let requester = request_after(&signal, Duration::from_millis(30));

            let start = Instant::now();
            assert!(policy.pause(&signal, Duration::MAX), "{policy} missed the stop");
            assert!(start.elapsed() < Duration::from_secs(5));
            requester.join().unwrap();
        }
    }

    #[test]
    fn test_zero_interval_variant_does_not_spin() {
        let signal = Arc::new(CancellationSignal::new());
        let requester = request_after(&signal, Duration::from_millis(30));

        let policy = PausePolicy::Poll {
            interval: Duration::ZERO,
        };
        assert!(policy.pause(&signal, Duration::MAX));
        requester.join().unwrap();
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(PausePolicy::poll(Duration::from_millis(25))).unwrap();
        assert_eq!(json, serde_json::json!({ "mode": "poll", "interval": 25 }));

        let parsed: PausePolicy = serde_json::from_str(r#"{"mode":"interruptible"}"#).unwrap();
        assert_eq!(parsed, PausePolicy::Interruptible);
    }
}
