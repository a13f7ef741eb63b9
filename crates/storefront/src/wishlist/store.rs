//! The wishlist store.
//!
//! Every operation is a read-modify-write against a single storage key; no
//! in-memory copy survives between calls. Remote sync goes through the
//! [`SyncQueue`] and only happens for logged-in customers.

use sentia_core::{CustomerId, ProductId, WishlistAction};
use tracing::{debug, info, instrument, warn};

use super::controls::ToggleControl;
use super::remote::RemoteWishlist;
use super::set::WishlistSet;
use super::storage::WishlistStorage;
use super::sync::{SyncHandle, SyncOutcome, SyncQueue};

/// Result of [`WishlistStore::toggle`].
#[derive(Debug)]
pub struct ToggleOutcome {
    /// Membership before the toggle.
    pub was_active: bool,
    /// Membership after the toggle.
    pub now_active: bool,
    /// Pending remote sync, if a customer is logged in.
    pub sync: Option<SyncHandle>,
    /// The listing view is mounted and must be rendered again.
    pub rerender_listing: bool,
}

/// Summary of a login reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Size of the local set before merging.
    pub local_count: usize,
    /// Size of the remote set (zero when the fetch failed).
    pub remote_count: usize,
    /// Whether the remote fetch failed and was treated as empty.
    pub remote_fetch_failed: bool,
    /// The union now persisted locally.
    pub merged: WishlistSet,
    /// Number of `add` actions the backend accepted.
    pub pushed: usize,
    /// Number of `add` actions that failed.
    pub failed: usize,
}

/// Local half of a login reconciliation: the union is already persisted and
/// waits to be re-published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginMerge {
    customer: CustomerId,
    local_count: usize,
    remote_count: usize,
    remote_fetch_failed: bool,
    merged: WishlistSet,
}

impl LoginMerge {
    #[must_use]
    pub const fn customer(&self) -> &CustomerId {
        &self.customer
    }

    /// The union now persisted locally.
    #[must_use]
    pub const fn merged(&self) -> &WishlistSet {
        &self.merged
    }

    #[must_use]
    pub const fn remote_fetch_failed(&self) -> bool {
        self.remote_fetch_failed
    }

    /// Push every merged ID as an `add`, one at a time, awaiting each.
    ///
    /// IDs missing remotely are never removed.
    #[instrument(skip(self, sync), fields(customer_id = %self.customer, merged = self.merged.len()))]
    pub async fn publish<R: RemoteWishlist>(self, sync: &SyncQueue<R>) -> ReconcileReport {
        let mut pushed = 0;
        let mut failed = 0;
        for id in self.merged.iter() {
            match sync
                .dispatch(self.customer.clone(), id, WishlistAction::Add)
                .finished()
                .await
            {
                SyncOutcome::Applied => pushed += 1,
                SyncOutcome::Failed => failed += 1,
            }
        }

        info!(
            local = self.local_count,
            remote = self.remote_count,
            merged = self.merged.len(),
            pushed,
            failed,
            "Wishlist fully synchronized"
        );

        ReconcileReport {
            local_count: self.local_count,
            remote_count: self.remote_count,
            remote_fetch_failed: self.remote_fetch_failed,
            merged: self.merged,
            pushed,
            failed,
        }
    }
}

/// Result of [`WishlistStore::load_server_wishlist_if_needed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// No customer is logged in.
    Guest,
    /// The local set already has entries; nothing was pulled.
    LocalNotEmpty,
    /// The remote set was adopted verbatim.
    Adopted(usize),
    /// The remote fetch failed; local state is unchanged.
    Unavailable,
}

/// Wishlist store bound to one storage backend and one (optional) customer.
pub struct WishlistStore<S, R> {
    storage: S,
    key: String,
    customer: Option<CustomerId>,
    sync: SyncQueue<R>,
    listing_mounted: bool,
}

impl<S: WishlistStorage, R: RemoteWishlist> WishlistStore<S, R> {
    /// Create a store. `customer` is `None` for guests, which disables all
    /// remote traffic.
    pub fn new(
        storage: S,
        key: impl Into<String>,
        customer: Option<CustomerId>,
        sync: SyncQueue<R>,
    ) -> Self {
        Self {
            storage,
            key: key.into(),
            customer,
            sync,
            listing_mounted: false,
        }
    }

    /// Mark whether a wishlist listing view is mounted for this page.
    #[must_use]
    pub const fn with_listing(mut self, mounted: bool) -> Self {
        self.listing_mounted = mounted;
        self
    }

    #[must_use]
    pub const fn customer(&self) -> Option<&CustomerId> {
        self.customer.as_ref()
    }

    #[must_use]
    pub const fn listing_mounted(&self) -> bool {
        self.listing_mounted
    }

    /// The queue remote actions go through.
    #[must_use]
    pub const fn sync_queue(&self) -> &SyncQueue<R> {
        &self.sync
    }

    // =========================================================================
    // Local set
    // =========================================================================

    /// Read the persisted set. Missing, unreadable or corrupt values yield
    /// the empty set.
    pub async fn get_all(&self) -> WishlistSet {
        match self.storage.read(&self.key).await {
            Ok(raw) => WishlistSet::decode(raw.as_deref()),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Wishlist storage unreadable, using empty set");
                WishlistSet::new()
            }
        }
    }

    /// Persist `set` verbatim. Write failures are logged.
    pub async fn set_local(&self, set: &WishlistSet) {
        if let Err(e) = self.storage.write(&self.key, set.encode()).await {
            warn!(key = %self.key, error = %e, "Failed to persist wishlist");
        }
    }

    pub async fn contains(&self, id: ProductId) -> bool {
        self.get_all().await.contains(id)
    }

    /// Add `id` locally. Returns `false` (and writes nothing) if already present.
    pub async fn add(&self, id: ProductId) -> bool {
        let mut set = self.get_all().await;
        if !set.insert(id) {
            return false;
        }
        self.set_local(&set).await;
        true
    }

    /// Remove `id` locally, then sync the removal remotely.
    pub async fn remove(&self, id: ProductId) -> Option<SyncHandle> {
        self.remove_local(id).await;
        self.sync_action(id, WishlistAction::Remove)
    }

    async fn remove_local(&self, id: ProductId) -> bool {
        let mut set = self.get_all().await;
        let removed = set.remove(id);
        self.set_local(&set).await;
        removed
    }

    /// Flip membership of `id` and sync the change.
    ///
    /// The control's active flag is set from the pre-toggle state
    /// (`!was_active`).
    #[instrument(skip(self, control), fields(product_id = %id))]
    pub async fn toggle(&self, id: ProductId, control: Option<&mut ToggleControl>) -> ToggleOutcome {
        let was_active = self.contains(id).await;

        let sync = if was_active {
            self.remove_local(id).await;
            self.sync_action(id, WishlistAction::Remove)
        } else {
            self.add(id).await;
            self.sync_action(id, WishlistAction::Add)
        };

        if let Some(control) = control {
            control.active = !was_active;
        }

        debug!(now_active = !was_active, "Toggled wishlist membership");

        ToggleOutcome {
            was_active,
            now_active: !was_active,
            sync,
            rerender_listing: self.listing_mounted,
        }
    }

    /// Fire a remote action. No-op for guests.
    pub fn sync_action(&self, id: ProductId, action: WishlistAction) -> Option<SyncHandle> {
        let customer = self.customer.clone()?;
        Some(self.sync.dispatch(customer, id, action))
    }

    // =========================================================================
    // Remote reconciliation
    // =========================================================================

    /// Merge local and remote sets after login and re-publish the union.
    ///
    /// [`Self::merge_after_login`] followed by [`LoginMerge::publish`].
    /// Returns `None` for guests.
    pub async fn full_sync_after_login(&self) -> Option<ReconcileReport> {
        let merge = self.merge_after_login().await?;
        Some(merge.publish(&self.sync).await)
    }

    /// Fetch the remote set, union it with the local set and persist the
    /// union. Nothing is pushed yet.
    ///
    /// A failed remote fetch counts as an empty remote set. Returns `None`
    /// for guests.
    #[instrument(skip(self))]
    pub async fn merge_after_login(&self) -> Option<LoginMerge> {
        let customer = self.customer.clone()?;

        let local = self.get_all().await;
        let (remote, remote_fetch_failed) = match self.sync.remote().fetch_all(&customer).await {
            Ok(ids) => (WishlistSet::from_ids(ids), false),
            Err(e) => {
                warn!(error = %e, "Failed to fetch server wishlist");
                (WishlistSet::new(), true)
            }
        };

        let merged = local.union(&remote);
        self.set_local(&merged).await;

        Some(LoginMerge {
            customer,
            local_count: local.len(),
            remote_count: remote.len(),
            remote_fetch_failed,
            merged,
        })
    }

    /// Adopt the remote set when the local set is empty.
    ///
    /// Never merges; [`Self::full_sync_after_login`] covers that case.
    #[instrument(skip(self))]
    pub async fn load_server_wishlist_if_needed(&self) -> PullOutcome {
        let Some(customer) = self.customer.as_ref() else {
            return PullOutcome::Guest;
        };
        if !self.get_all().await.is_empty() {
            return PullOutcome::LocalNotEmpty;
        }

        match self.sync.remote().fetch_all(customer).await {
            Ok(ids) => {
                let set = WishlistSet::from_ids(ids);
                self.set_local(&set).await;
                debug!(count = set.len(), "Adopted server wishlist");
                PullOutcome::Adopted(set.len())
            }
            Err(e) => {
                warn!(error = %e, "Failed to load server wishlist");
                PullOutcome::Unavailable
            }
        }
    }

    /// Page-load entry point: for logged-in customers, reconcile then pull.
    pub async fn init(&self) -> Option<ReconcileReport> {
        let report = self.full_sync_after_login().await?;
        self.load_server_wishlist_if_needed().await;
        Some(report)
    }
}
