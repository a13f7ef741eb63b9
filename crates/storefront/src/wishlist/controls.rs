//! Toggle controls and their binding registry.
//!
//! A control is any element that toggles one product's membership (a heart
//! button on a card, a product page, a carousel slide). Controls are bound
//! once: binding an already-known control is a no-op. After each listing
//! render the renderer notifies its [`RenderListener`]s so freshly rendered
//! controls get bound and their states refreshed.

use std::collections::HashMap;

use sentia_core::ProductId;

use super::render::RenderedWishlist;
use super::set::WishlistSet;

/// Opaque handle of a rendered control element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlId(String);

impl ControlId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Handle of the heart button on a listing card.
    #[must_use]
    pub fn for_card(product: ProductId) -> Self {
        Self(format!("wishlist-card-{product}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ControlId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A wishlist toggle and its visual "active" state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleControl {
    pub id: ControlId,
    pub product: ProductId,
    pub active: bool,
}

impl ToggleControl {
    /// A new, inactive control.
    #[must_use]
    pub const fn new(id: ControlId, product: ProductId) -> Self {
        Self {
            id,
            product,
            active: false,
        }
    }
}

/// Receives the "render completed" notification of the listing view.
pub trait RenderListener {
    fn render_completed(&mut self, rendered: &RenderedWishlist);
}

/// Registry of bound controls, keyed by element handle.
#[derive(Debug, Default)]
pub struct ControlRegistry {
    controls: HashMap<ControlId, ToggleControl>,
}

impl ControlRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a control. Returns `false` if its handle was already bound, in
    /// which case the existing binding is kept.
    pub fn bind(&mut self, control: ToggleControl) -> bool {
        if self.controls.contains_key(&control.id) {
            return false;
        }
        self.controls.insert(control.id.clone(), control);
        true
    }

    /// Set every control's active flag from current membership.
    pub fn update_states(&mut self, set: &WishlistSet) {
        for control in self.controls.values_mut() {
            control.active = set.contains(control.product);
        }
    }

    #[must_use]
    pub fn is_active(&self, id: &ControlId) -> bool {
        self.controls.get(id).is_some_and(|c| c.active)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.controls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

impl RenderListener for ControlRegistry {
    fn render_completed(&mut self, rendered: &RenderedWishlist) {
        for card in rendered.cards() {
            let id = ControlId::for_card(card.id);
            let mut control = ToggleControl::new(id.clone(), card.id);
            control.active = card.active;
            if !self.bind(control)
                && let Some(existing) = self.controls.get_mut(&id)
            {
                existing.active = card.active;
            }
        }
    }
}
