pub mod account;
pub mod category;
pub mod export;
pub mod health;
pub mod product;
pub mod search;
pub mod user;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post, put, MethodRouter},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{auth::require_bearer_auth, panic::panic_response, security_headers::security_headers};
use crate::AppState;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

fn authed(route: MethodRouter<AppState>, state: &AppState) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(state.clone(), require_bearer_auth))
}

/// Full application router: catalogue reads are public, writes and every
/// user, profile and export route need a bearer token.
pub fn router(state: AppState) -> Router {
    let s = &state;

    let catalogue = Router::new()
        .route(
            "/api/categories",
            get(category::list_categories).merge(authed(post(category::create_category), s)),
        )
        .route("/api/categories/active", get(category::list_active_categories))
        .route(
            "/api/categories/reorder",
            authed(post(category::reorder_categories), s),
        )
        .route(
            "/api/categories/:id",
            get(category::get_category)
                .merge(authed(put(category::update_category), s))
                .merge(authed(delete(category::delete_category), s)),
        )
        .route(
            "/api/categories/:id/products",
            get(category::list_category_products),
        )
        .route(
            "/api/products",
            get(product::list_products).merge(authed(post(product::create_product), s)),
        )
        .route("/api/products/active", get(product::list_active_products))
        .route("/api/products/featured", get(product::list_featured_products))
        .route("/api/products/on-sale", get(product::list_sale_products))
        .route("/api/products/low-stock", get(product::list_low_stock_products))
        .route(
            "/api/products/bulk-status",
            authed(post(product::bulk_update_product_status), s),
        )
        .route("/api/products/sku/:sku", get(product::get_product_by_sku))
        .route(
            "/api/products/:id",
            get(product::get_product)
                .merge(authed(put(product::update_product), s))
                .merge(authed(delete(product::delete_product), s)),
        )
        .route(
            "/api/products/:id/stock",
            authed(patch(product::update_product_stock), s),
        )
        .route("/api/search", get(search::global_search))
        .route("/api/search/suggestions", get(search::suggestions));

    let account = Router::new()
        .route("/api/account/register", post(account::register))
        .route("/api/account/login", post(account::login))
        .route("/api/account/profile", authed(get(account::profile), s));

    let protected = Router::new()
        .route("/api/users", get(user::list_users))
        .route("/api/users/active", get(user::list_active_users))
        .route("/api/users/search", get(user::search_users))
        .route(
            "/api/users/:id",
            get(user::get_user)
                .put(user::update_user)
                .delete(user::delete_user),
        )
        .route("/api/export/products", get(export::export_products))
        .route("/api/export/categories", get(export::export_categories))
        .route("/api/export/users", get(export::export_users))
        .route("/api/export/stats", get(export::export_stats))
        .route_layer(from_fn_with_state(state.clone(), require_bearer_auth));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .merge(catalogue)
        .merge(account)
        .merge(protected)
        .with_state(state)
        .layer(from_fn(security_headers))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
