use gloo_net::http::Request;
use medikost_shared::{ApiResponse, ProductDetail};

/// CMS endpoints are proxied by the host under this prefix.
pub const API_BASE: &str = "/api/v1";

pub async fn fetch_product(id: u64) -> Result<ProductDetail, String> {
    let url = format!("{API_BASE}/products/{id}");
    let resp = Request::get(&url)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;
    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }
    let body: ApiResponse<ProductDetail> = resp
        .json()
        .await
        .map_err(|e| format!("parse error: {e}"))?;
    if !body.success {
        return Err(if body.message.is_empty() {
            "listing unavailable".to_string()
        } else {
            body.message
        });
    }
    Ok(body.data)
}

/// Listing id from `/detail-kost/{id}`, falling back to an `?id=` query parameter.
pub fn listing_id(path: &str, search: &str) -> Option<u64> {
    let from_path = path
        .trim_end_matches('/')
        .rsplit_once("/detail-kost/")
        .and_then(|(_, rest)| rest.split('/').next())
        .and_then(|raw| raw.parse().ok());

    from_path.or_else(|| {
        search
            .trim_start_matches('?')
            .split('&')
            .find_map(|pair| pair.strip_prefix("id="))
            .and_then(|raw| raw.parse().ok())
    })
}
