use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Scoped deadline for a single call
///
/// Arming the guard spawns a timer task that cancels a fresh token once
/// `timeout` elapses. Dropping the guard aborts the timer, so it can never
/// fire after the call that owns it has returned, whatever the exit path.
///
/// # Examples
///
/// ```no_run
/// use echoprobe::transport::TimeoutGuard;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let guard = TimeoutGuard::arm(Duration::from_secs(10));
///     let token = guard.token();
///     // hand `token` to the transport...
///     drop(guard);
///     assert!(!token.is_cancelled());
/// }
/// ```
#[derive(Debug)]
pub struct TimeoutGuard {
    token: CancellationToken,
    timeout: Duration,
    timer: JoinHandle<()>,
}

impl TimeoutGuard {
    /// Starts the timer. Must be called inside a Tokio runtime.
    pub fn arm(timeout: Duration) -> Self {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            trigger.cancel();
        });

        Self {
            token,
            timeout,
            timer,
        }
    }

    /// Token to pass into the transport call
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the deadline elapsed before the guard was dropped
    pub fn fired(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        self.timer.abort();
    }
}
