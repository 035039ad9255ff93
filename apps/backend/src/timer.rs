//! Cancelable, restartable deadline callbacks.
//!
//! A [`ManagedTimer`] runs its callback once, after a fixed delay, unless
//! canceled first. Cancel is idempotent and, together with restart, is a
//! no-op once the callback has fired. Callers that race a timer against an
//! early trigger must additionally guard the callback body with a
//! generation check: a cancel issued in the same instant the deadline
//! expires cannot retract a callback that is already running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub struct ManagedTimer {
    delay: Duration,
    callback: Arc<dyn Fn() + Send + Sync>,
    token: CancellationToken,
    fired: Arc<AtomicBool>,
    deadline_unix_ms: i64,
}

impl ManagedTimer {
    /// Schedule `callback` to run once, `delay` from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(delay: Duration, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let callback: Arc<dyn Fn() + Send + Sync> = Arc::new(callback);
        let token = CancellationToken::new();
        let fired = Arc::new(AtomicBool::new(false));
        spawn_wait(
            Instant::now() + delay,
            token.clone(),
            fired.clone(),
            callback.clone(),
        );
        Self {
            delay,
            callback,
            token,
            fired,
            deadline_unix_ms: unix_ms_after(delay),
        }
    }

    /// Prevent the callback from firing. Idempotent; a no-op after expiry.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel any pending instance and reschedule with the original delay.
    /// A no-op if the callback has already fired.
    pub fn restart(&mut self) {
        if self.fired.load(Ordering::SeqCst) {
            return;
        }
        self.token.cancel();
        self.token = CancellationToken::new();
        self.fired = Arc::new(AtomicBool::new(false));
        self.deadline_unix_ms = unix_ms_after(self.delay);
        spawn_wait(
            Instant::now() + self.delay,
            self.token.clone(),
            self.fired.clone(),
            self.callback.clone(),
        );
    }

    /// Absolute fire time as unix milliseconds, for client countdowns.
    pub fn deadline_unix_ms(&self) -> i64 {
        self.deadline_unix_ms
    }
}

impl Drop for ManagedTimer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn unix_ms_after(delay: Duration) -> i64 {
    let now_ms = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
    now_ms + delay.as_millis() as i64
}

fn spawn_wait(
    deadline: Instant,
    token: CancellationToken,
    fired: Arc<AtomicBool>,
    callback: Arc<dyn Fn() + Send + Sync>,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep_until(deadline) => {
                fired.store(true, Ordering::SeqCst);
                callback();
            }
        }
    });
}
