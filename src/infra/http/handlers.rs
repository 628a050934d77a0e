use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
};
use quaderno_api_types::{HealthResponse, StatsResponse, TrackRequest, TrackResponse};
use serde_json::Value;
use time::OffsetDateTime;

use crate::domain::analytics::format_timestamp;

use super::{client_ip::ClientIp, error::ApiError, state::HttpState};

pub async fn track(
    State(state): State<HttpState>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TrackResponse>, ApiError> {
    let fields = track_fields(&headers, &body)?;
    state
        .analytics
        .track(fields, &ip, OffsetDateTime::now_utc())
        .map_err(|err| ApiError::from_analytics("infra::http::handlers::track", err))?;
    Ok(Json(TrackResponse::ok()))
}

/// Client fields of a tracking request.
///
/// Bodies declared as JSON must be a JSON object. Anything else, such as the
/// `text/plain` beacons browsers send on unload, is read as a JSON object when
/// possible and otherwise recorded without client fields.
fn track_fields(headers: &HeaderMap, body: &[u8]) -> Result<TrackRequest, ApiError> {
    if !is_json_content_type(headers) {
        return Ok(serde_json::from_slice(body).unwrap_or_default());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(ApiError::invalid_body(
            "infra::http::handlers::track",
            format!("expected a JSON object, got {}", json_kind(&other)),
        )),
        Err(err) => Err(ApiError::invalid_body(
            "infra::http::handlers::track",
            err.to_string(),
        )),
    }
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub async fn stats(State(state): State<HttpState>) -> Result<Json<StatsResponse>, ApiError> {
    state
        .analytics
        .stats()
        .map(Json)
        .map_err(|err| ApiError::from_analytics("infra::http::handlers::stats", err))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: format_timestamp(OffsetDateTime::now_utc()),
    })
}
