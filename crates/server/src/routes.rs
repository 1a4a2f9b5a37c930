use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::Value;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;
use service::StoreService;

pub mod items;
pub mod users;

/// Shared handler state: the one store access layer for the process.
#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<StoreService>,
}

impl ServerState {
    pub fn new(store: StoreService) -> Self {
        Self { store: Arc::new(store) }
    }
}

pub async fn health() -> Json<Health> {
    Json(Health::ok())
}

/// 200 with the stored JSON, or 200 with an empty body when the key is absent.
pub(crate) fn stored_value(value: Option<Value>) -> Response {
    match value {
        Some(v) => Json(v).into_response(),
        None => StatusCode::OK.into_response(),
    }
}

/// Build the full application router.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let public = Router::new().route("/health", get(health));

    let items = Router::new().route(
        "/items/:item_id",
        get(items::read_item)
            .post(items::save_item_amount)
            .put(items::update_item)
            .delete(items::delete_item),
    );

    let users = Router::new().route(
        "/users/:user_id",
        get(users::read_user)
            .post(users::save_user)
            .delete(users::delete_user),
    );

    public
        .merge(items)
        .merge(users)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        Router,
    };
    use tower::ServiceExt;

    use super::*;

    pub fn app() -> (Router, ServerState) {
        let state = ServerState::new(StoreService::in_memory());
        (build_router(state.clone(), CorsLayer::very_permissive()), state)
    }

    /// Send one request through the router and return status + raw body.
    pub async fn call(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, String) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(b) => {
                req = req.header("content-type", "application/json");
                Body::from(b.to_string())
            }
            None => Body::empty(),
        };
        let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use super::test_support::{app, call};

    #[tokio::test]
    async fn health_ok() {
        let (app, _) = app();
        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn unknown_route_404() {
        let (app, _) = app();
        let (status, _) = call(&app, Method::GET, "/nothing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn users_have_no_put() {
        let (app, _) = app();
        let (status, _) = call(&app, Method::PUT, "/users/7", Some("{}")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
