//! Ordered, duplicate-free set of product IDs.

use indexmap::IndexSet;
use sentia_core::ProductId;

/// The wishlist contents.
///
/// Membership is all that matters; insertion order is kept only so the
/// persisted array and the rendered listing are stable. Encoded as a plain
/// JSON array of integers.
/// Equality ignores order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WishlistSet {
    ids: IndexSet<ProductId>,
}

impl WishlistSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: IndexSet::new(),
        }
    }

    /// Build a set from IDs, keeping the first occurrence of duplicates.
    pub fn from_ids(ids: impl IntoIterator<Item = ProductId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Decode a persisted value.
    ///
    /// Absent, malformed or non-integer content decodes to the empty set.
    #[must_use]
    pub fn decode(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::new();
        };
        match serde_json::from_str::<Option<Vec<ProductId>>>(raw) {
            Ok(ids) => Self::from_ids(ids.unwrap_or_default()),
            Err(e) => {
                tracing::debug!(error = %e, "Discarding unparseable wishlist value");
                Self::new()
            }
        }
    }

    /// Encode for persistence as a JSON array.
    #[must_use]
    pub fn encode(&self) -> String {
        let ids: Vec<i64> = self.ids.iter().copied().map(ProductId::as_i64).collect();
        serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string())
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.ids.contains(&id)
    }

    /// Insert an ID. Returns `false` if it was already present.
    pub fn insert(&mut self, id: ProductId) -> bool {
        self.ids.insert(id)
    }

    /// Remove an ID. Returns `false` if it was not present.
    pub fn remove(&mut self, id: ProductId) -> bool {
        self.ids.shift_remove(&id)
    }

    /// Set union: this set's IDs first, then the other set's new IDs.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            ids: self.ids.union(&other.ids).copied().collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.ids.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The IDs in insertion order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<ProductId> {
        self.iter().collect()
    }
}

impl FromIterator<ProductId> for WishlistSet {
    fn from_iter<T: IntoIterator<Item = ProductId>>(iter: T) -> Self {
        Self::from_ids(iter)
    }
}

impl IntoIterator for WishlistSet {
    type Item = ProductId;
    type IntoIter = indexmap::set::IntoIter<ProductId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[i64]) -> Vec<ProductId> {
        values.iter().copied().map(ProductId::new).collect()
    }

    #[test]
    fn test_from_ids_collapses_duplicates() {
        let set = WishlistSet::from_ids(ids(&[3, 1, 3, 2, 1]));
        assert_eq!(set.to_vec(), ids(&[3, 1, 2]));
    }

    #[test]
    fn test_decode_absent_is_empty() {
        assert!(WishlistSet::decode(None).is_empty());
    }

    #[test]
    fn test_decode_garbage_is_empty() {
        assert!(WishlistSet::decode(Some("not json")).is_empty());
        assert!(WishlistSet::decode(Some("{\"a\":1}")).is_empty());
        assert!(WishlistSet::decode(Some("[\"x\"]")).is_empty());
        assert!(WishlistSet::decode(Some("[1.5]")).is_empty());
    }

    #[test]
    fn test_decode_null_is_empty() {
        assert!(WishlistSet::decode(Some("null")).is_empty());
    }

    #[test]
    fn test_encode_is_plain_array() {
        let set = WishlistSet::from_ids(ids(&[7_891_234_567_890, 2]));
        assert_eq!(set.encode(), "[7891234567890,2]");
        assert_eq!(WishlistSet::decode(Some(&set.encode())), set);
    }

    #[test]
    fn test_union_keeps_left_order_and_dedups() {
        let local = WishlistSet::from_ids(ids(&[1, 2, 3]));
        let remote = WishlistSet::from_ids(ids(&[3, 4, 5]));
        let combined = local.union(&remote);
        assert_eq!(combined.to_vec(), ids(&[1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_insert_and_remove_report_changes() {
        let mut set = WishlistSet::new();
        assert!(set.insert(ProductId::new(9)));
        assert!(!set.insert(ProductId::new(9)));
        assert!(set.remove(ProductId::new(9)));
        assert!(!set.remove(ProductId::new(9)));
    }

    #[test]
    fn test_remove_keeps_order_of_the_rest() {
        let mut set = WishlistSet::from_ids(ids(&[4, 5, 6, 7]));
        set.remove(ProductId::new(5));
        assert_eq!(set.to_vec(), ids(&[4, 6, 7]));
    }

    #[test]
    fn test_equality_ignores_order() {
        assert_eq!(
            WishlistSet::from_ids(ids(&[1, 2])),
            WishlistSet::from_ids(ids(&[2, 1]))
        );
    }

    #[test]
    fn test_large_union_stays_duplicate_free() {
        let evens = WishlistSet::from_ids((0..20_000).step_by(2).map(ProductId::new));
        let all = WishlistSet::from_ids((0..20_000).map(ProductId::new));
        let combined = evens.union(&all);
        assert_eq!(combined.len(), 20_000);
        assert_eq!(combined.iter().next(), Some(ProductId::new(0)));
        assert_eq!(combined.iter().nth(10_000), Some(ProductId::new(1)));
    }
}
