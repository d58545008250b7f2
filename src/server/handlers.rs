//! HTTP handlers for resource collections
//!
//! All handlers are generic over the resource type; [`resource_routes`]
//! mounts them under `/{collection}` with the type's service as state.

use crate::core::error::{ApiError, ApiResult, RequestError};
use crate::core::etag::{VersionToken, is_modified_since};
use crate::core::query::FIELDS_PARAM;
use crate::core::resource::{ID_FIELD, Resource, ResourceRules};
use crate::core::service::ResourceService;
use crate::server::conditional::ConditionalHeaders;
use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Response header carrying the unpaged match count
pub const TOTAL_COUNT_HEADER: HeaderName = HeaderName::from_static("total-count");

type SharedService<R> = Arc<ResourceService<R>>;

/// CRUD routes for one resource type
///
/// - `GET /{collection}` - list
/// - `POST /{collection}` - create
/// - `GET /{collection}/{id}` - read
/// - `PUT /{collection}/{id}` - replace
/// - `DELETE /{collection}/{id}` - soft delete
pub fn resource_routes<R: ResourceRules>(service: SharedService<R>) -> Router {
    let collection = R::descriptor().name;
    Router::new()
        .route(
            &format!("/{}", collection),
            get(list_resources::<R>).post(create_resource::<R>),
        )
        .route(
            &format!("/{}/{{id}}", collection),
            get(get_resource::<R>)
                .put(update_resource::<R>)
                .delete(delete_resource::<R>),
        )
        .with_state(service)
}

fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| {
        RequestError::InvalidResourceId {
            id: raw.to_string(),
        }
        .into()
    })
}

fn etag_headers(etag: &VersionToken) -> ApiResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(etag.as_str())
        .map_err(|e| ApiError::Internal(format!("unrepresentable ETag: {}", e)))?;
    headers.insert(header::ETAG, value);
    Ok(headers)
}

/// Split a request body into the optional client id and the typed input
fn read_body<R: ResourceRules>(
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(Option<Uuid>, R::Input)> {
    let Json(mut body) = body.map_err(|e| RequestError::InvalidBody {
        message: e.body_text(),
    })?;

    let id = match body.as_object_mut().and_then(|map| map.remove(ID_FIELD)) {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => Some(parse_id(&raw)?),
        Some(other) => {
            return Err(RequestError::InvalidResourceId {
                id: other.to_string(),
            }
            .into());
        }
    };

    let input = serde_json::from_value(body)?;
    Ok((id, input))
}

pub async fn list_resources<R: ResourceRules>(
    State(service): State<SharedService<R>>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Response> {
    let listing = service.list_query(&params).await?;

    let mut headers = HeaderMap::new();
    if let Some(total) = listing.total_count {
        headers.insert(TOTAL_COUNT_HEADER, HeaderValue::from(total));
    }
    Ok((headers, Json(listing.body)).into_response())
}

/// Read one record; `If-None-Match` holding the current version yields 304
pub async fn get_resource<R: ResourceRules>(
    State(service): State<SharedService<R>>,
    Path(id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    conditional: ConditionalHeaders,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let fields = params
        .iter()
        .find(|(name, _)| name == FIELDS_PARAM)
        .map(|(_, value)| value.as_str());

    let record = service.get(id, fields).await?;
    let headers = etag_headers(&record.etag)?;

    if conditional.if_none_match().is_some()
        && !is_modified_since(Some(record.etag.as_str()), conditional.if_none_match())
    {
        return Ok((StatusCode::NOT_MODIFIED, headers).into_response());
    }
    Ok((headers, Json(record.body)).into_response())
}

pub async fn create_resource<R: ResourceRules>(
    State(service): State<SharedService<R>>,
    conditional: ConditionalHeaders,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let (id, input) = read_body::<R>(body)?;
    let record = service
        .create(id, input, conditional.if_none_match())
        .await?;

    let mut headers = etag_headers(&record.etag())?;
    let location = format!("/{}/{}", R::descriptor().name, record.id());
    if let Ok(value) = HeaderValue::from_str(&location) {
        headers.insert(header::LOCATION, value);
    }
    Ok((
        StatusCode::CREATED,
        headers,
        Json(service.render_full(&record)?),
    )
        .into_response())
}

pub async fn update_resource<R: ResourceRules>(
    State(service): State<SharedService<R>>,
    Path(id): Path<String>,
    conditional: ConditionalHeaders,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let (body_id, input) = read_body::<R>(body)?;
    if body_id.is_some_and(|body_id| body_id != id) {
        return Err(ApiError::bad_request(
            "Resource id in the body does not match the URL",
        ));
    }

    let record = service.update(id, input, conditional.if_match()).await?;
    let headers = etag_headers(&record.etag())?;
    Ok((headers, Json(service.render_full(&record)?)).into_response())
}

pub async fn delete_resource<R: ResourceRules>(
    State(service): State<SharedService<R>>,
    Path(id): Path<String>,
    conditional: ConditionalHeaders,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    service.delete(id, conditional.if_match()).await?;
    Ok(StatusCode::NO_CONTENT)
}
