//! Per-product serialized delivery of remote wishlist actions.
//!
//! Every (customer, product) pair gets its own "lane": a worker task draining
//! an unbounded channel one action at a time. Actions are enqueued
//! synchronously, so two rapid toggles of the same product reach the backend
//! in click order rather than network-arrival order. Different products, and
//! different customers' actions on the same product, sync concurrently.
//!
//! Delivery is at-most-once. A failed action is logged and dropped; nothing
//! is retried and no error reaches the caller.
//!
//! Lanes shut down after sitting idle for the configured period. The lane map
//! lock is held both while enqueueing and while a worker decides to exit, so
//! an action can never be sent to a lane that is going away.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sentia_core::{CustomerId, ProductId, WishlistAction};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::remote::RemoteWishlist;

/// Result of one delivered (or dropped) action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The backend accepted the action.
    Applied,
    /// The request failed; the failure was logged.
    Failed,
}

/// Completion handle for a dispatched action.
///
/// Dropping the handle is the fire-and-forget path; awaiting
/// [`SyncHandle::finished`] waits for the attempt.
#[derive(Debug)]
pub struct SyncHandle {
    rx: oneshot::Receiver<SyncOutcome>,
}

impl SyncHandle {
    /// Wait until the action has been attempted.
    ///
    /// Returns [`SyncOutcome::Failed`] if the lane went away before running it.
    pub async fn finished(self) -> SyncOutcome {
        self.rx.await.unwrap_or(SyncOutcome::Failed)
    }
}

struct SyncJob {
    action: WishlistAction,
    done: oneshot::Sender<SyncOutcome>,
}

type LaneKey = (CustomerId, ProductId);

type Lanes = Arc<Mutex<HashMap<LaneKey, mpsc::UnboundedSender<SyncJob>>>>;

/// Dispatcher for remote wishlist actions.
///
/// Cheap to clone; clones share lanes. Must be used inside a Tokio runtime.
pub struct SyncQueue<R> {
    remote: Arc<R>,
    lanes: Lanes,
    idle_timeout: Duration,
}

impl<R> Clone for SyncQueue<R> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            lanes: Arc::clone(&self.lanes),
            idle_timeout: self.idle_timeout,
        }
    }
}

impl<R: RemoteWishlist> SyncQueue<R> {
    /// Create a queue delivering to `remote`.
    #[must_use]
    pub fn new(remote: R, idle_timeout: Duration) -> Self {
        Self::from_shared(Arc::new(remote), idle_timeout)
    }

    /// Create a queue around an already shared remote client.
    #[must_use]
    pub fn from_shared(remote: Arc<R>, idle_timeout: Duration) -> Self {
        Self {
            remote,
            lanes: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// The remote client actions are delivered to.
    #[must_use]
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Number of lanes currently alive.
    #[must_use]
    pub fn active_lanes(&self) -> usize {
        self.lanes.lock().map_or(0, |lanes| lanes.len())
    }

    /// Enqueue an action for `customer`'s `product`. Returns immediately.
    pub fn dispatch(
        &self,
        customer: CustomerId,
        product: ProductId,
        action: WishlistAction,
    ) -> SyncHandle {
        let (done, rx) = oneshot::channel();
        let job = SyncJob { action, done };
        let key = (customer, product);

        let Ok(mut lanes) = self.lanes.lock() else {
            warn!(product_id = %product, %action, "Sync lanes unavailable, dropping action");
            let _ = job.done.send(SyncOutcome::Failed);
            return SyncHandle { rx };
        };

        let job = match lanes.get(&key) {
            Some(sender) => match sender.send(job) {
                Ok(()) => return SyncHandle { rx },
                // Worker already exited without deregistering; start a new lane
                Err(mpsc::error::SendError(job)) => job,
            },
            None => job,
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        // The receiver is alive, so this send cannot fail
        let _ = sender.send(job);
        lanes.insert(key.clone(), sender);
        drop(lanes);

        debug!(customer_id = %key.0, product_id = %product, "Starting sync lane");
        tokio::spawn(run_lane(
            Arc::clone(&self.remote),
            Arc::clone(&self.lanes),
            key,
            receiver,
            self.idle_timeout,
        ));

        SyncHandle { rx }
    }
}

async fn run_lane<R: RemoteWishlist>(
    remote: Arc<R>,
    lanes: Lanes,
    key: LaneKey,
    mut receiver: mpsc::UnboundedReceiver<SyncJob>,
    idle_timeout: Duration,
) {
    let (customer, product) = &key;
    let product = *product;
    loop {
        match tokio::time::timeout(idle_timeout, receiver.recv()).await {
            Ok(Some(job)) => {
                let outcome = match remote.apply(customer, product, job.action).await {
                    Ok(()) => {
                        debug!(product_id = %product, action = %job.action, "Wishlist action synced");
                        SyncOutcome::Applied
                    }
                    Err(e) => {
                        warn!(
                            product_id = %product,
                            action = %job.action,
                            error = %e,
                            "Wishlist sync error"
                        );
                        SyncOutcome::Failed
                    }
                };
                let _ = job.done.send(outcome);
            }
            Ok(None) => break,
            Err(_) => {
                let Ok(mut guard) = lanes.lock() else {
                    break;
                };
                if receiver.is_empty() {
                    guard.remove(&key);
                    debug!(product_id = %product, "Closing idle sync lane");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::wishlist::remote::RemoteError;

    /// Recording fake backend shared with the store tests.
    #[derive(Debug, Default)]
    pub struct FakeRemote {
        pub remote_ids: Mutex<Vec<ProductId>>,
        pub calls: Mutex<Vec<(ProductId, WishlistAction)>>,
        pub fail_fetch: bool,
        pub fail_apply: bool,
        pub apply_delay: Option<Duration>,
    }

    impl FakeRemote {
        pub fn with_ids(ids: &[i64]) -> Self {
            Self {
                remote_ids: Mutex::new(ids.iter().copied().map(ProductId::new).collect()),
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<(ProductId, WishlistAction)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RemoteWishlist for FakeRemote {
        async fn fetch_all(&self, _customer: &CustomerId) -> Result<Vec<ProductId>, RemoteError> {
            if self.fail_fetch {
                return Err(RemoteError::Status(503));
            }
            Ok(self.remote_ids.lock().unwrap().clone())
        }

        async fn apply(
            &self,
            _customer: &CustomerId,
            product: ProductId,
            action: WishlistAction,
        ) -> Result<(), RemoteError> {
            if let Some(delay) = self.apply_delay {
                tokio::time::sleep(delay).await;
            }
            self.calls.lock().unwrap().push((product, action));
            if self.fail_apply {
                return Err(RemoteError::Status(500));
            }
            Ok(())
        }
    }

    fn customer() -> CustomerId {
        CustomerId::parse("6021").unwrap()
    }

    fn other_customer() -> CustomerId {
        CustomerId::parse("7310").unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_applies_action() {
        let queue = SyncQueue::new(FakeRemote::default(), Duration::from_secs(5));
        let outcome = queue
            .dispatch(customer(), ProductId::new(1), WishlistAction::Add)
            .finished()
            .await;
        assert_eq!(outcome, SyncOutcome::Applied);
        assert_eq!(
            queue.remote().calls(),
            vec![(ProductId::new(1), WishlistAction::Add)]
        );
    }

    #[tokio::test]
    async fn test_failures_are_reported_not_raised() {
        let remote = FakeRemote {
            fail_apply: true,
            ..FakeRemote::default()
        };
        let queue = SyncQueue::new(remote, Duration::from_secs(5));
        let outcome = queue
            .dispatch(customer(), ProductId::new(1), WishlistAction::Remove)
            .finished()
            .await;
        assert_eq!(outcome, SyncOutcome::Failed);
    }

    #[tokio::test]
    async fn test_same_product_actions_keep_dispatch_order() {
        let remote = FakeRemote {
            apply_delay: Some(Duration::from_millis(20)),
            ..FakeRemote::default()
        };
        let queue = SyncQueue::new(remote, Duration::from_secs(5));
        let id = ProductId::new(7);

        let first = queue.dispatch(customer(), id, WishlistAction::Add);
        let second = queue.dispatch(customer(), id, WishlistAction::Remove);
        let third = queue.dispatch(customer(), id, WishlistAction::Add);
        third.finished().await;
        first.finished().await;
        second.finished().await;

        assert_eq!(
            queue.remote().calls(),
            vec![
                (id, WishlistAction::Add),
                (id, WishlistAction::Remove),
                (id, WishlistAction::Add),
            ]
        );
        assert_eq!(queue.active_lanes(), 1);
    }

    #[tokio::test]
    async fn test_idle_lanes_close() {
        let queue = SyncQueue::new(FakeRemote::default(), Duration::from_millis(20));
        queue
            .dispatch(customer(), ProductId::new(1), WishlistAction::Add)
            .finished()
            .await;
        assert_eq!(queue.active_lanes(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(queue.active_lanes(), 0);

        // A new action after shutdown starts a fresh lane
        let outcome = queue
            .dispatch(customer(), ProductId::new(1), WishlistAction::Remove)
            .finished()
            .await;
        assert_eq!(outcome, SyncOutcome::Applied);
    }

    #[tokio::test]
    async fn test_customers_do_not_share_lanes() {
        let remote = FakeRemote {
            apply_delay: Some(Duration::from_millis(300)),
            ..FakeRemote::default()
        };
        let queue = SyncQueue::new(remote, Duration::from_secs(5));
        let id = ProductId::new(1);

        let first = queue.dispatch(customer(), id, WishlistAction::Add);
        let started = std::time::Instant::now();
        let outcome = queue
            .dispatch(other_customer(), id, WishlistAction::Add)
            .finished()
            .await;

        assert_eq!(outcome, SyncOutcome::Applied);
        // One delayed apply, not two back to back
        assert!(started.elapsed() < Duration::from_millis(550));
        assert_eq!(queue.active_lanes(), 2);
        assert_eq!(first.finished().await, SyncOutcome::Applied);
    }
}
