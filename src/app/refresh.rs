use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Periodic background refresh with explicit teardown.
///
/// The task runs immediately, then once per period, until `cancel` is called
/// or the handle is dropped. Replaces fixed-interval polling scattered at
/// call sites with one owned, cancellable resource.
pub struct ScheduledRefresh {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScheduledRefresh {
    pub fn spawn<F, Fut>(period: Duration, mut task: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let token = CancellationToken::new();
        let child = token.child_token();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => task().await,
                }
            }
        });

        Self { token, handle }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for ScheduledRefresh {
    fn drop(&mut self) {
        self.token.cancel();
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_refresh_fires_immediately_then_periodically() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);

        let refresh = ScheduledRefresh::spawn(Duration::from_millis(20), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(70)).await;
        let seen = ticks.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected several ticks, saw {seen}");
        drop(refresh);
    }

    #[tokio::test]
    async fn test_cancel_stops_future_ticks() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);

        let refresh = ScheduledRefresh::spawn(Duration::from_millis(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(25)).await;
        refresh.cancel();
        assert!(refresh.is_cancelled());
        let at_cancel = ticks.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(40)).await;
        let after = ticks.load(Ordering::SeqCst);
        // One tick may already have been in flight when cancel landed.
        assert!(after <= at_cancel + 1, "ticks kept firing after cancel");
    }

    #[tokio::test]
    async fn test_drop_is_teardown() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);

        let refresh = ScheduledRefresh::spawn(Duration::from_millis(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(15)).await;
        drop(refresh);
        let at_drop = ticks.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(ticks.load(Ordering::SeqCst) <= at_drop + 1);
    }
}
