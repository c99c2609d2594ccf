use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw listing location as delivered by the content API. Coordinates are text and
/// are not guaranteed to be numeric.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub latitude: String,
    #[serde(default)]
    pub longitude: String,
    #[serde(default)]
    pub label: String,
}

impl Location {
    pub fn new(
        latitude: impl Into<String>,
        longitude: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            latitude: latitude.into(),
            longitude: longitude.into(),
            label: label.into(),
        }
    }
}

/// A validated geographic point. Both components are always finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateField {
    Latitude,
    Longitude,
}

impl CoordinateField {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    Empty,
    NotNumeric,
    NotFinite,
}

/// Coordinates could not be turned into a [`GeoPoint`]. Never shown to users; the
/// map falls back to a placeholder instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidCoordinates {
    pub field: CoordinateField,
    pub reason: InvalidReason,
}

impl fmt::Display for InvalidCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.reason {
            InvalidReason::Empty => "is empty",
            InvalidReason::NotNumeric => "is not a decimal number",
            InvalidReason::NotFinite => "is not a finite number",
        };
        write!(f, "{} {reason}", self.field.name())
    }
}

impl std::error::Error for InvalidCoordinates {}

/// Parse both coordinate fields of `location`.
///
/// Latitude is checked first, so a location with two bad fields reports the
/// latitude. No range check is applied: any pair of finite numbers is accepted.
pub fn validate(location: &Location) -> Result<GeoPoint, InvalidCoordinates> {
    let lat = parse_component(&location.latitude, CoordinateField::Latitude)?;
    let lng = parse_component(&location.longitude, CoordinateField::Longitude)?;
    Ok(GeoPoint { lat, lng })
}

fn parse_component(raw: &str, field: CoordinateField) -> Result<f64, InvalidCoordinates> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InvalidCoordinates {
            field,
            reason: InvalidReason::Empty,
        });
    }

    let value = trimmed.parse::<f64>().map_err(|_| InvalidCoordinates {
        field,
        reason: InvalidReason::NotNumeric,
    })?;

    if !value.is_finite() {
        return Err(InvalidCoordinates {
            field,
            reason: InvalidReason::NotFinite,
        });
    }

    Ok(value)
}
