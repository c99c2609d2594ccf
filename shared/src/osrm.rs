//! Request/response codec for the OSRM HTTP routing service.

use std::fmt;

use serde::Deserialize;

use crate::geo::GeoPoint;

pub const OSRM_SERVICE_URL: &str = "https://router.project-osrm.org/route/v1";
pub const OSRM_PROFILE: &str = "driving";

/// Build the `route` request URL. OSRM expects `lng,lat` pairs separated by `;`.
pub fn route_url(service_url: &str, profile: &str, waypoints: &[GeoPoint]) -> String {
    let coords = waypoints
        .iter()
        .map(|p| format!("{:.7},{:.7}", p.lng, p.lat))
        .collect::<Vec<_>>()
        .join(";");
    format!(
        "{}/{profile}/{coords}?overview=full&geometries=geojson&alternatives=false&steps=false",
        service_url.trim_end_matches('/')
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteGeometry {
    pub points: Vec<GeoPoint>,
    pub distance_m: f64,
    pub duration_s: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteResponseError {
    Malformed(String),
    Service { code: String, message: Option<String> },
    NoRoute,
}

impl fmt::Display for RouteResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "malformed routing response: {e}"),
            Self::Service {
                code,
                message: Some(message),
            } => write!(f, "routing service returned {code}: {message}"),
            Self::Service {
                code,
                message: None,
            } => write!(f, "routing service returned {code}"),
            Self::NoRoute => f.write_str("routing service returned no route"),
        }
    }
}

impl std::error::Error for RouteResponseError {}

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[derive(Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

/// Decode the first route of an OSRM `route` response with GeoJSON geometry.
pub fn parse_route_response(body: &str) -> Result<RouteGeometry, RouteResponseError> {
    let response: OsrmResponse =
        serde_json::from_str(body).map_err(|e| RouteResponseError::Malformed(e.to_string()))?;

    if response.code != "Ok" {
        return Err(RouteResponseError::Service {
            code: response.code,
            message: response.message,
        });
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or(RouteResponseError::NoRoute)?;

    let points: Vec<GeoPoint> = route
        .geometry
        .coordinates
        .into_iter()
        .filter(|[lng, lat]| lng.is_finite() && lat.is_finite())
        .map(|[lng, lat]| GeoPoint::new(lat, lng))
        .collect();

    if points.len() < 2 {
        return Err(RouteResponseError::NoRoute);
    }

    Ok(RouteGeometry {
        points,
        distance_m: route.distance,
        duration_s: route.duration,
    })
}
