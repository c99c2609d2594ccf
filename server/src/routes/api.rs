use axum::Json;
use axum::body::Body;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;

use crate::state::AppState;

const MAX_API_PATH_LEN: usize = 512;
const PROXY_CACHE_CONTROL: &str = "public, max-age=60";

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "upstream": state.cms_base.as_str(),
        "started_at": state.started_at.to_rfc3339(),
    }))
}

/// Forward a GET under `/api/v1/` to the listing CMS and mirror its answer.
pub async fn proxy_cms(
    State(state): State<AppState>,
    Path(raw_path): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response, StatusCode> {
    let path = normalize_api_path(&raw_path)?;
    let url = upstream_url(&state.cms_base, path, query.as_deref())?;

    let resp = state
        .http_client
        .get(url.clone())
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, %url, "CMS request failed");
            StatusCode::BAD_GATEWAY
        })?;

    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| HeaderValue::from_bytes(value.as_bytes()).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));
    let body = resp.bytes().await.map_err(|e| {
        tracing::warn!(error = %e, %url, "failed to read CMS response body");
        StatusCode::BAD_GATEWAY
    })?;

    if !status.is_success() {
        tracing::debug!(%status, %url, "CMS returned non-success status");
    }

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    if status.is_success() {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(PROXY_CACHE_CONTROL),
        );
    }
    Ok(response)
}

pub async fn api_not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn normalize_api_path(path: &str) -> Result<&str, StatusCode> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() || trimmed.len() > MAX_API_PATH_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }

    if trimmed
        .chars()
        .any(|ch| ch.is_control() || matches!(ch, '\\' | '?' | '#'))
    {
        return Err(StatusCode::BAD_REQUEST);
    }

    if trimmed
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StatusCode::BAD_REQUEST);
    }

    Ok(trimmed)
}

fn upstream_url(
    base: &reqwest::Url,
    path: &str,
    query: Option<&str>,
) -> Result<reqwest::Url, StatusCode> {
    let mut url = base.clone();
    let Ok(mut segments) = url.path_segments_mut() else {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    };
    segments.pop_if_empty();
    for segment in path.split('/') {
        segments.push(segment);
    }
    drop(segments);
    url.set_query(query.filter(|q| !q.is_empty()));
    Ok(url)
}
