use serde::{Deserialize, Deserializer, Serialize};

use crate::geo::Location;

/// Envelope used by every CMS endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub data: T,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub meta: ApiMeta,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApiMeta {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub distance_to_kariadi: Option<f64>,
    #[serde(default, deserialize_with = "coordinate_text")]
    pub latitude: String,
    #[serde(default, deserialize_with = "coordinate_text")]
    pub longitude: String,
    #[serde(default)]
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub google_maps_link: Option<String>,
    #[serde(default)]
    pub starting_price: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl ProductDetail {
    /// Map input for this listing, labelled with its name.
    pub fn location(&self) -> Location {
        Location::new(
            self.latitude.clone(),
            self.longitude.clone(),
            self.name.clone(),
        )
    }
}

/// The CMS is inconsistent about coordinate types: accept strings, numbers and
/// null, and keep everything as text so validation stays in one place.
fn coordinate_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{GeoPoint, validate};

    #[test]
    fn product_detail_decodes_string_coordinates() {
        let body = r#"{
            "success": true,
            "message": "ok",
            "data": {
                "id": 12,
                "name": "Kost A",
                "address": "Jl. Dr. Sutomo",
                "distance_to_kariadi": 0.8,
                "latitude": "-6.9666",
                "longitude": "110.4166",
                "whatsapp": "628123"
            },
            "meta": { "timestamp": "2025-01-01T00:00:00Z", "status_code": 200 }
        }"#;

        let response: ApiResponse<ProductDetail> =
            serde_json::from_str(body).expect("detail payload should decode");
        assert!(response.success);
        assert_eq!(response.meta.status_code, Some(200));

        let location = response.data.location();
        assert_eq!(location.label, "Kost A");
        assert_eq!(validate(&location), Ok(GeoPoint::new(-6.9666, 110.4166)));
    }

    #[test]
    fn product_detail_accepts_numeric_and_null_coordinates() {
        let numeric: ProductDetail = serde_json::from_str(
            r#"{"id": 1, "name": "Kost N", "latitude": -6.97, "longitude": 110.41}"#,
        )
        .expect("numeric coordinates");
        assert_eq!(numeric.latitude, "-6.97");
        assert_eq!(numeric.longitude, "110.41");

        let missing: ProductDetail =
            serde_json::from_str(r#"{"id": 2, "name": "Kost B", "latitude": null}"#)
                .expect("null coordinates");
        assert_eq!(missing.latitude, "");
        assert_eq!(missing.longitude, "");
        assert!(validate(&missing.location()).is_err());
    }
}
