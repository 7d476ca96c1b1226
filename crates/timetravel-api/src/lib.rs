//! JSON REST API for timetravel.
//!
//! Exposes an axum [`Router`] backed by any
//! [`timetravel_core::store::InsuredStore`]. TLS and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v2", timetravel_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod fields;
pub mod resources;
pub mod synonyms;

use std::sync::Arc;

use axum::{
  Json, Router,
  routing::{delete, get, post, put},
};
use serde_json::{Value, json};
use timetravel_core::store::InsuredStore;

pub use error::ApiError;

/// Build the API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: InsuredStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    .route("/{resource}", get(resources::list::<S>))
    .route("/{resource}/new", post(resources::create::<S>))
    .route("/{resource}/update", put(resources::update::<S>))
    .route("/{resource}/id/{id}", get(resources::get_one::<S>))
    .route("/{resource}/history/{id}", get(resources::history::<S>))
    .route(
      "/{resource}/getbydate/{insured_id}/{date}",
      get(resources::get_by_date::<S>),
    )
    .route(
      "/{resource}/getbytimestamp/{insured_id}/{ts}",
      get(resources::get_by_timestamp::<S>),
    )
    .route("/{resource}/delete/{id}", delete(resources::delete_one::<S>))
    .with_state(store)
}

/// `GET /health`
async fn health() -> Json<Value> { Json(json!({ "ok": true })) }

#[cfg(test)]
mod tests {
  use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
  };
  use timetravel_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  async fn app() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    api_router(Arc::new(store))
  }

  async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let request = Request::builder()
      .method(method)
      .uri(uri)
      .header("content-type", "application/json")
      .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
      .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  async fn new_insured(app: &Router, name: &str) -> i64 {
    let (status, body) = send(
      app,
      Method::POST,
      "/insured/new",
      Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
  }

  #[tokio::test]
  async fn health_is_ok() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
  }

  #[tokio::test]
  async fn created_insured_reads_back_assembled() {
    let app = app().await;
    let (status, created) = send(
      &app,
      Method::POST,
      "/insureds/new",
      Some(json!({ "name": "Muppy" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["kind"], "insured");
    assert_eq!(created["policyNumber"], 1000);

    let id = created["id"].as_i64().unwrap();
    let (status, view) =
      send(&app, Method::GET, &format!("/insured/id/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["name"], "Muppy");
    assert_eq!(view["employees"], json!([]));
    assert_eq!(view["addresses"], json!([]));
  }

  #[tokio::test]
  async fn current_view_uses_the_store_clock() {
    let store = SqliteStore::open_in_memory()
      .await
      .unwrap()
      .with_clock(|| chrono::DateTime::from_timestamp(5_000, 0).unwrap());
    let app = api_router(Arc::new(store));
    let id = new_insured(&app, "Muppy").await;

    let (status, view) =
      send(&app, Method::GET, &format!("/insured/id/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["asOf"], 5_000);
    assert_eq!(view["recordTimestamp"], 5_000);
  }

  #[tokio::test]
  async fn error_kinds_map_to_statuses() {
    let app = app().await;
    let id = new_insured(&app, "Muppy").await;
    let address = json!({ "address": "911 Reno Street", "rootId": id });

    let (status, _) = send(
      &app,
      Method::POST,
      "/insured_addresses/new",
      Some(address.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) =
      send(&app, Method::POST, "/address/new", Some(address)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already"));

    let (status, _) = send(
      &app,
      Method::PUT,
      "/insured/update",
      Some(json!({ "id": id, "name": "Moppy" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
      &app,
      Method::POST,
      "/employee/new",
      Some(json!({ "name": "X", "insuredId": id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "startDate is required");

    let (status, _) =
      send(&app, Method::GET, "/employee/id/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::GET, "/policies", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("insured_addresses"));

    let (status, _) = send(
      &app,
      Method::GET,
      &format!("/insured/getbytimestamp/{id}/soon"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn employee_versions_over_http() {
    let app = app().await;
    let id = new_insured(&app, "Muppy").await;

    let (status, employee) = send(
      &app,
      Method::POST,
      "/employees/new",
      Some(json!({
        "name": "X",
        "startDate": "1974-07-24",
        "endDate": "1994-01-14",
        "insuredId": id,
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let employee_id = employee["id"].as_i64().unwrap();

    let update = json!({
      "employeeId": employee_id,
      "insuredId": id,
      "endDate": "1999-01-14",
    });
    let (status, updated) =
      send(&app, Method::PUT, "/employee/update", Some(update.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["endDate"], "1999-01-14");

    let (status, _) =
      send(&app, Method::PUT, "/employee/update", Some(update)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, history) = send(
      &app,
      Method::GET,
      &format!("/employee/history/{employee_id}"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 2);

    // Everything was recorded "now", long after 1970 and before 2999.
    let (status, _) = send(
      &app,
      Method::GET,
      &format!("/employee/getbytimestamp/{id}/0"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, current) = send(
      &app,
      Method::GET,
      &format!("/employee/getbydate/{id}/2999-01-01"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current[0]["endDate"], "1999-01-14");

    let (status, view) = send(
      &app,
      Method::GET,
      &format!("/insured/getbydate/{id}/2999-01-01"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["employees"][0]["name"], "X");
  }

  #[tokio::test]
  async fn delete_returns_the_deleted_version() {
    let app = app().await;
    let id = new_insured(&app, "Muppy").await;
    new_insured(&app, "Kermit").await;

    let (status, listed) =
      send(&app, Method::GET, "/insureds?name=kerm", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, deleted) =
      send(&app, Method::DELETE, &format!("/insured/delete/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["name"], "Muppy");

    let (status, _) =
      send(&app, Method::GET, &format!("/insured/id/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, listed) = send(&app, Method::GET, "/insured", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
  }
}
