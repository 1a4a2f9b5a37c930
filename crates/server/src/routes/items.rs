//! `/items/{id}`: numeric item amounts.
//!
//! Only the amount is stored. `PUT` adds to the stored amount; it never
//! overwrites it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use models::Item;
use tracing::info;

use super::{stored_value, ServerState};
use crate::errors::ApiError;

pub async fn read_item(
    State(state): State<ServerState>,
    Path(item_id): Path<String>,
) -> Result<Response, ApiError> {
    let value = state.store.read(&item_id).await?;
    Ok(stored_value(value))
}

pub async fn save_item_amount(
    State(state): State<ServerState>,
    Path(item_id): Path<String>,
    Json(body): Json<Item>,
) -> Result<(StatusCode, Json<bool>), ApiError> {
    let amount = body.amount_or_zero();
    let saved = state.store.write(&item_id, &amount).await?;
    info!(%item_id, amount, "item amount saved");
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn update_item(
    State(state): State<ServerState>,
    Path(item_id): Path<String>,
    Json(body): Json<Item>,
) -> Result<Json<i64>, ApiError> {
    let delta = body.amount_or_zero();
    let total = state.store.increment(&item_id, delta).await?;
    info!(%item_id, delta, total, "item amount incremented");
    Ok(Json(total))
}

pub async fn delete_item(
    State(state): State<ServerState>,
    Path(item_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(&item_id).await?;
    info!(%item_id, "item deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::test_support::{app, call};

    #[tokio::test]
    async fn post_without_amount_stores_zero() {
        let (app, state) = app();
        let (status, body) = call(&app, Method::POST, "/items/42", Some(r#"{"name":"Bottle"}"#)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, "true");
        assert_eq!(state.store.read("42").await.unwrap(), Some(json!(0)));
    }

    #[tokio::test]
    async fn post_stores_only_amount() {
        let (app, state) = app();
        call(&app, Method::POST, "/items/1", Some(r#"{"id":"1","name":"Bottle","amount":10}"#)).await;
        assert_eq!(state.store.read("1").await.unwrap(), Some(json!(10)));
    }

    #[tokio::test]
    async fn put_accumulates() {
        let (app, _) = app();
        let (status, body) = call(&app, Method::PUT, "/items/9", Some(r#"{"amount":5}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "5");
        let (_, body) = call(&app, Method::PUT, "/items/9", Some(r#"{"amount":5}"#)).await;
        assert_eq!(body, "10");
    }

    #[tokio::test]
    async fn put_without_amount_leaves_total() {
        let (app, _) = app();
        call(&app, Method::POST, "/items/3", Some(r#"{"amount":4}"#)).await;
        let (status, body) = call(&app, Method::PUT, "/items/3", Some(r#"{"name":"x"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "4");
    }

    #[tokio::test]
    async fn put_negative_amount_decrements() {
        let (app, _) = app();
        call(&app, Method::POST, "/items/3", Some(r#"{"amount":4}"#)).await;
        let (_, body) = call(&app, Method::PUT, "/items/3", Some(r#"{"amount":-6}"#)).await;
        assert_eq!(body, "-2");
    }

    #[tokio::test]
    async fn get_missing_is_empty_ok() {
        let (app, _) = app();
        let (status, body) = call(&app, Method::GET, "/items/none", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn delete_is_no_content_even_when_missing() {
        let (app, state) = app();
        call(&app, Method::POST, "/items/5", Some("{}")).await;
        let (status, _) = call(&app, Method::DELETE, "/items/5", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(!state.store.has_key("5").await.unwrap());

        let (status, _) = call(&app, Method::DELETE, "/items/5", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn put_on_user_record_is_bad_gateway() {
        let (app, state) = app();
        state.store.write("u", &json!({"firstName":"Ann"})).await.unwrap();
        let (status, body) = call(&app, Method::PUT, "/items/u", Some(r#"{"amount":1}"#)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("not an integer"));
    }

    #[tokio::test]
    async fn malformed_body_rejected_before_store() {
        let (app, state) = app();
        let (status, _) = call(&app, Method::POST, "/items/7", Some(r#"{"amount":"lots"}"#)).await;
        assert!(status.is_client_error());
        assert!(!state.store.has_key("7").await.unwrap());
    }
}
