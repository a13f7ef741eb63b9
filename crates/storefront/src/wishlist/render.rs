//! Wishlist listing rendering.
//!
//! Rendering walks the whole `/products.json` catalog and keeps the products
//! whose IDs are wishlisted, so its cost grows with the catalog, not the
//! wishlist. Markup comes from Askama templates (auto-escaped).

use askama::Template;
use sentia_core::{CurrencyCode, Price, ProductId};
use tracing::{error, instrument};

use super::catalog::{CatalogProduct, ProductCatalog, fetch_all_products};
use super::controls::RenderListener;
use super::set::WishlistSet;

/// Message shown when nothing wishlisted is in the catalog.
pub const EMPTY_MESSAGE: &str = "Your wishlist is empty";

/// Message shown when the catalog could not be loaded.
pub const ERROR_MESSAGE: &str = "Failed to load wishlist items.";

/// Presentation settings for listing cards.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Currency used to format prices.
    pub currency: CurrencyCode,
    /// Image used when a product has none.
    pub placeholder_image: Option<String>,
    /// Public path prefix of the wishlist routes, used in control links.
    pub route_prefix: String,
}

/// Display data for one listing card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WishlistCard {
    pub id: ProductId,
    pub url: String,
    pub image: String,
    pub title: String,
    pub price: String,
    /// Whether the card's heart button shows as active.
    pub active: bool,
}

impl WishlistCard {
    /// Build a card from a catalog product.
    ///
    /// URL falls back from `url` to `/products/<handle>` to `#`; the image
    /// from the first product image to the placeholder; the price from the
    /// first variant to the product price to zero.
    #[must_use]
    pub fn from_product(product: &CatalogProduct, options: &RenderOptions, active: bool) -> Self {
        let url = product
            .url
            .clone()
            .or_else(|| product.handle.as_ref().map(|h| format!("/products/{h}")))
            .unwrap_or_else(|| "#".to_string());

        let image = product
            .images
            .first()
            .map(|img| img.src.clone())
            .or_else(|| options.placeholder_image.clone())
            .unwrap_or_default();

        let raw_price = product
            .variants
            .first()
            .and_then(|v| v.price.as_ref())
            .or(product.price.as_ref())
            .map_or_else(|| "0".to_string(), price_text);

        Self {
            id: product.id,
            url,
            image,
            title: product.title.clone(),
            price: Price::parse_lossy(&raw_price, options.currency).display_whole(),
            active,
        }
    }
}

fn price_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Result of one listing render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedWishlist {
    /// Nothing to show.
    Empty,
    /// One card per wishlisted catalog product, in catalog order.
    Items(Vec<WishlistCard>),
    /// The catalog could not be loaded.
    Failed,
}

impl RenderedWishlist {
    #[must_use]
    pub fn cards(&self) -> &[WishlistCard] {
        match self {
            Self::Items(cards) => cards,
            Self::Empty | Self::Failed => &[],
        }
    }

    /// Render the listing container's inner HTML.
    ///
    /// # Errors
    ///
    /// Returns error if template rendering fails.
    pub fn to_html(&self, options: &RenderOptions) -> askama::Result<String> {
        WishlistItemsTemplate::new(self, &options.route_prefix).render()
    }

    /// Tell every listener the render has completed.
    pub fn notify(&self, listeners: &mut [&mut dyn RenderListener]) {
        for listener in listeners.iter_mut() {
            listener.render_completed(self);
        }
    }
}

/// Listing container contents.
#[derive(Template)]
#[template(path = "wishlist/items.html")]
pub struct WishlistItemsTemplate<'a> {
    pub cards: &'a [WishlistCard],
    pub failed: bool,
    pub empty_message: &'a str,
    pub error_message: &'a str,
    pub route_prefix: &'a str,
}

impl<'a> WishlistItemsTemplate<'a> {
    #[must_use]
    pub fn new(rendered: &'a RenderedWishlist, route_prefix: &'a str) -> Self {
        Self {
            cards: rendered.cards(),
            failed: matches!(rendered, RenderedWishlist::Failed),
            empty_message: EMPTY_MESSAGE,
            error_message: ERROR_MESSAGE,
            route_prefix,
        }
    }
}

/// Render the listing for `set`.
///
/// An empty set renders the placeholder without touching the catalog. A
/// catalog failure is logged and renders the error message.
#[instrument(skip(set, catalog, options), fields(wishlist_size = set.len()))]
pub async fn render_wishlist<C: ProductCatalog>(
    set: &WishlistSet,
    catalog: &C,
    options: &RenderOptions,
) -> RenderedWishlist {
    if set.is_empty() {
        return RenderedWishlist::Empty;
    }

    let products = match fetch_all_products(catalog).await {
        Ok(products) => products,
        Err(e) => {
            error!(error = %e, "Wishlist load error");
            return RenderedWishlist::Failed;
        }
    };

    let cards: Vec<WishlistCard> = products
        .iter()
        .filter(|p| set.contains(p.id))
        .map(|p| WishlistCard::from_product(p, options, true))
        .collect();

    if cards.is_empty() {
        RenderedWishlist::Empty
    } else {
        RenderedWishlist::Items(cards)
    }
}
