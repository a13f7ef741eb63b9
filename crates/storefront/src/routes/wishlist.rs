//! Wishlist route handlers.
//!
//! These routes sit behind the Shopify app proxy and speak HTMX: every
//! mutation answers with `HX-Trigger: wishlist-updated` so other fragments
//! on the page (count badges, listing containers) refresh themselves.
//!
//! The per-browser wishlist lives in the session. For logged-in customers the
//! first request of a session merges it with the wishlist backend; the merged
//! set is re-published in the background.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::State,
    response::{AppendHeaders, Html, IntoResponse, Response},
};
use sentia_core::{CustomerId, ProductId};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{Instrument, debug, info_span, instrument};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalCustomer;
use crate::models::session_keys;
use crate::state::AppState;
use crate::wishlist::{
    ControlId, HttpRemoteWishlist, SessionStorage, ToggleControl, WishlistStore, render_wishlist,
};

/// HTMX event fired after any wishlist mutation.
pub const WISHLIST_UPDATED_EVENT: &str = "wishlist-updated";

type RequestStore = WishlistStore<SessionStorage, HttpRemoteWishlist>;

// =============================================================================
// Templates
// =============================================================================

/// Full listing section.
#[derive(Template, WebTemplate)]
#[template(path = "wishlist/page.html")]
pub struct WishlistPageTemplate {
    /// Pre-rendered listing container contents.
    pub items: String,
    pub route_prefix: String,
}

/// A standalone toggle button (product page, carousel).
#[derive(Template, WebTemplate)]
#[template(path = "wishlist/button.html")]
pub struct WishlistButtonTemplate {
    pub control_id: String,
    pub product_id: ProductId,
    pub active: bool,
    pub route_prefix: String,
}

/// Header count badge.
#[derive(Template, WebTemplate)]
#[template(path = "wishlist/count.html")]
pub struct WishlistCountTemplate {
    pub count: usize,
}

// =============================================================================
// Forms
// =============================================================================

/// Toggle form data.
#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    pub product_id: String,
    /// Set by buttons inside the listing view.
    #[serde(default)]
    pub listing: bool,
    /// Element ID of the clicked button, echoed back in the fragment.
    #[serde(default)]
    pub control_id: Option<String>,
}

/// Remove form data.
#[derive(Debug, Deserialize)]
pub struct RemoveForm {
    pub product_id: String,
}

/// JSON body of `GET /wishlist/ids`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WishlistIds {
    pub wishlist: Vec<ProductId>,
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_product_id(raw: &str) -> Result<ProductId> {
    raw.parse()
        .map_err(|e: sentia_core::ParseIdError| AppError::BadRequest(e.to_string()))
}

/// Build the store for this request, reconciling first if needed.
async fn open_store(
    state: &AppState,
    session: &Session,
    customer: Option<CustomerId>,
) -> Result<RequestStore> {
    let store = WishlistStore::new(
        SessionStorage::new(session.clone()),
        state.config().wishlist.storage_key.clone(),
        customer,
        state.sync().clone(),
    );
    reconcile_once(&store, session).await?;
    Ok(store)
}

/// Run login reconciliation once per session and customer.
///
/// The request waits for the merge to be persisted in the session; the
/// sequential re-publish of the union runs on a detached task.
async fn reconcile_once(store: &RequestStore, session: &Session) -> Result<()> {
    let Some(customer) = store.customer() else {
        return Ok(());
    };

    let reconciled_for: Option<String> = session.get(session_keys::WISHLIST_RECONCILED_FOR).await?;
    if reconciled_for.as_deref() == Some(customer.as_str()) {
        return Ok(());
    }

    let Some(merge) = store.merge_after_login().await else {
        return Ok(());
    };
    store.load_server_wishlist_if_needed().await;
    session
        .insert(session_keys::WISHLIST_RECONCILED_FOR, customer.as_str())
        .await?;

    debug!(merged = merge.merged().len(), "Session wishlist merged");
    let sync = store.sync_queue().clone();
    let span = info_span!("wishlist_publish", customer_id = %customer);
    tokio::spawn(
        async move {
            let report = merge.publish(&sync).await;
            debug!(
                pushed = report.pushed,
                failed = report.failed,
                "Session wishlist reconciled"
            );
        }
        .instrument(span),
    );
    Ok(())
}

/// Render the listing container contents for the store's current set.
async fn render_listing(state: &AppState, store: &RequestStore) -> Result<String> {
    let set = store.get_all().await;
    let rendered = render_wishlist(&set, state.catalog(), state.render_options()).await;
    Ok(rendered.to_html(state.render_options())?)
}

fn route_prefix(state: &AppState) -> String {
    state.render_options().route_prefix.clone()
}

// =============================================================================
// Handlers
// =============================================================================

/// Wishlist page section.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
) -> Result<WishlistPageTemplate> {
    let store = open_store(&state, &session, customer).await?;
    Ok(WishlistPageTemplate {
        items: render_listing(&state, &store).await?,
        route_prefix: route_prefix(&state),
    })
}

/// Listing container contents (HTMX refresh target).
#[instrument(skip(state, session))]
pub async fn items(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
) -> Result<Html<String>> {
    let store = open_store(&state, &session, customer).await?;
    Ok(Html(render_listing(&state, &store).await?))
}

/// Toggle a product.
///
/// Inside the listing the whole container is re-rendered; elsewhere only the
/// clicked button comes back.
#[instrument(skip(state, session, form), fields(product_id = %form.product_id))]
pub async fn toggle(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
    Form(form): Form<ToggleForm>,
) -> Result<Response> {
    let product = parse_product_id(&form.product_id)?;
    let store = open_store(&state, &session, customer)
        .await?
        .with_listing(form.listing);

    let control_id = form
        .control_id
        .filter(|id| !id.trim().is_empty())
        .map_or_else(|| ControlId::new(format!("wishlist-{product}")), ControlId::new);
    let mut control = ToggleControl::new(control_id, product);

    let outcome = store.toggle(product, Some(&mut control)).await;

    let product_str = product.to_string();
    add_breadcrumb(
        "wishlist",
        if outcome.now_active {
            "Added to wishlist"
        } else {
            "Removed from wishlist"
        },
        Some(&[("product_id", product_str.as_str())]),
    );

    let trigger = AppendHeaders([("HX-Trigger", WISHLIST_UPDATED_EVENT)]);

    if outcome.rerender_listing {
        let html = render_listing(&state, &store).await?;
        return Ok((trigger, Html(html)).into_response());
    }

    Ok((
        trigger,
        WishlistButtonTemplate {
            control_id: control.id.to_string(),
            product_id: product,
            active: control.active,
            route_prefix: route_prefix(&state),
        },
    )
        .into_response())
}

/// Remove a product and return the refreshed listing.
#[instrument(skip(state, session, form), fields(product_id = %form.product_id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
    Form(form): Form<RemoveForm>,
) -> Result<Response> {
    let product = parse_product_id(&form.product_id)?;
    let store = open_store(&state, &session, customer).await?;

    // Fire-and-forget: the sync lane completes without us
    drop(store.remove(product).await);

    let html = render_listing(&state, &store).await?;
    Ok((
        AppendHeaders([("HX-Trigger", WISHLIST_UPDATED_EVENT)]),
        Html(html),
    )
        .into_response())
}

/// Count badge fragment.
#[instrument(skip(state, session))]
pub async fn count(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
) -> Result<WishlistCountTemplate> {
    let store = open_store(&state, &session, customer).await?;
    Ok(WishlistCountTemplate {
        count: store.get_all().await.len(),
    })
}

/// Wishlisted IDs as JSON, for theme scripts.
#[instrument(skip(state, session))]
pub async fn ids(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(customer): OptionalCustomer,
) -> Result<Json<WishlistIds>> {
    let store = open_store(&state, &session, customer).await?;
    Ok(Json(WishlistIds {
        wishlist: store.get_all().await.to_vec(),
    }))
}
