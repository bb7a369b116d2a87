use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// How often a sleeping poller looks at the token
const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// Shared stop flag, set from the Ctrl+C handler and checked by the polling loop
#[derive(Clone, Default)]
pub struct CancellationToken {
    canceled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    /// Sleep for `duration`, waking early once canceled. Returns true if canceled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;

        while !self.is_canceled() {
            let now = Instant::now();

            if now >= deadline {
                return false;
            }

            thread::sleep(CANCEL_CHECK_INTERVAL.min(deadline - now));
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();

        assert!(!token.is_canceled());
        clone.cancel();
        assert!(token.is_canceled());
    }

    #[test]
    fn sleep_wakes_on_cancel() {
        let token = CancellationToken::new();
        let clone = token.clone();
        let canceler = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            clone.cancel();
        });
        let start = Instant::now();

        assert!(token.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));
        canceler.join().unwrap();
    }

    #[test]
    fn sleep_runs_to_completion() {
        let token = CancellationToken::new();

        assert!(!token.sleep(Duration::from_millis(15)));
    }
}
