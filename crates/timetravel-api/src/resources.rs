//! Handlers for `/{resource}` endpoints. `{resource}` is any name accepted by
//! [`crate::synonyms::resolve`].
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/{resource}` | Insureds only; `?name=&policyNumber=&id=&limit=&offset=` |
//! | `POST`   | `/{resource}/new` | Body: field object; returns 201 + stored version |
//! | `PUT`    | `/{resource}/update` | Body: field object; returns the new version |
//! | `GET`    | `/{resource}/id/{id}` | Insureds are assembled as of now |
//! | `GET`    | `/{resource}/history/{id}` | Every version, oldest first |
//! | `GET`    | `/{resource}/getbydate/{insuredId}/{YYYY-MM-DD}` | As of the end of that day |
//! | `GET`    | `/{resource}/getbytimestamp/{insuredId}/{secs}` | As of a Unix timestamp |
//! | `DELETE` | `/{resource}/delete/{id}` | Returns the deleted version |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State, rejection::JsonRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use timetravel_core::{
  EntityKind,
  fields::parse_id,
  instant,
  record::{Insured, VersionRecord},
  store::{AsOf, InsuredFilter, InsuredStore},
};
use tracing::info;

use crate::{error::ApiError, fields::field_map, synonyms::resolve};

fn body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
  body
    .map(|Json(v)| v)
    .map_err(|e| ApiError::BadRequest(e.body_text()))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
  pub id:            Option<i64>,
  pub name:          Option<String>,
  pub policy_number: Option<i64>,
  pub limit:         Option<usize>,
  pub offset:        Option<usize>,
}

/// `GET /{resource}[?name=...][&policyNumber=...][&limit=...][&offset=...]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Path(resource): Path<String>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Insured>>, ApiError>
where
  S: InsuredStore,
{
  if !resolve(&resource)?.is_root() {
    return Err(ApiError::BadRequest(format!(
      "{resource} can only be read through its insured"
    )));
  }
  let filter = InsuredFilter {
    id:            params.id,
    name:          params.name.filter(|n| !n.trim().is_empty()),
    policy_number: params.policy_number,
    limit:         params.limit,
    offset:        params.offset,
  };
  let insureds = store
    .list_insureds(&filter)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(insureds))
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// `POST /{resource}/new`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Path(resource): Path<String>,
  payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: InsuredStore,
{
  let kind = resolve(&resource)?;
  let fields = field_map(body(payload)?)?;
  let record = store
    .create_from_map(kind, &fields)
    .await
    .map_err(ApiError::store)?;
  info!(%kind, id = record.id(), "created");
  Ok((StatusCode::CREATED, Json(record)))
}

/// `PUT /{resource}/update`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path(resource): Path<String>,
  payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<VersionRecord>, ApiError>
where
  S: InsuredStore,
{
  let kind = resolve(&resource)?;
  let fields = field_map(body(payload)?)?;
  let record = store
    .update_from_map(kind, &fields)
    .await
    .map_err(ApiError::store)?;
  info!(%kind, id = record.id(), version_id = record.version_id(), "updated");
  Ok(Json(record))
}

/// `DELETE /{resource}/delete/{id}`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path((resource, id)): Path<(String, String)>,
) -> Result<Json<VersionRecord>, ApiError>
where
  S: InsuredStore,
{
  let kind = resolve(&resource)?;
  let id = parse_id("id", &id)?;
  let record = store.delete(kind, id).await.map_err(ApiError::store)?;
  info!(%kind, id, "deleted");
  Ok(Json(record))
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /{resource}/id/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path((resource, id)): Path<(String, String)>,
) -> Result<Response, ApiError>
where
  S: InsuredStore,
{
  let kind = resolve(&resource)?;
  let id = parse_id("id", &id)?;
  if kind == EntityKind::Insured {
    let view = store
      .assemble(id, store.now())
      .await
      .map_err(ApiError::store)?;
    return Ok(Json(view).into_response());
  }
  let record = store.get_latest(kind, id).await.map_err(ApiError::store)?;
  Ok(Json(record).into_response())
}

/// `GET /{resource}/history/{id}`
pub async fn history<S>(
  State(store): State<Arc<S>>,
  Path((resource, id)): Path<(String, String)>,
) -> Result<Json<Vec<VersionRecord>>, ApiError>
where
  S: InsuredStore,
{
  let kind = resolve(&resource)?;
  let id = parse_id("id", &id)?;
  let versions = store.history(kind, id).await.map_err(ApiError::store)?;
  Ok(Json(versions))
}

/// `GET /{resource}/getbydate/{insuredId}/{YYYY-MM-DD}`
pub async fn get_by_date<S>(
  State(store): State<Arc<S>>,
  Path((resource, insured_id, date)): Path<(String, String, String)>,
) -> Result<Json<AsOf>, ApiError>
where
  S: InsuredStore,
{
  let at = instant::parse_date_cutoff(&date)?;
  as_of(&*store, &resource, &insured_id, at).await
}

/// `GET /{resource}/getbytimestamp/{insuredId}/{secs}`
pub async fn get_by_timestamp<S>(
  State(store): State<Arc<S>>,
  Path((resource, insured_id, ts)): Path<(String, String, String)>,
) -> Result<Json<AsOf>, ApiError>
where
  S: InsuredStore,
{
  let at = instant::parse_timestamp(&ts)?;
  as_of(&*store, &resource, &insured_id, at).await
}

async fn as_of<S>(
  store: &S,
  resource: &str,
  insured_id: &str,
  at: DateTime<Utc>,
) -> Result<Json<AsOf>, ApiError>
where
  S: InsuredStore,
{
  let kind = resolve(resource)?;
  let insured_id = parse_id("insuredId", insured_id)?;
  let found = store
    .get_as_of(kind, insured_id, at)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(found))
}
