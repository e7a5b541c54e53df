use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// The dashboards are served from another origin and send bearer tokens.
pub fn portal_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(Any)
}
