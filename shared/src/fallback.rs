use crate::geo::{GeoPoint, InvalidCoordinates, Location, validate};

/// Why the map area shows a placeholder instead of a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    NoCoordinates,
    NotReady,
}

impl FallbackReason {
    pub const fn title(self) -> &'static str {
        match self {
            Self::NoCoordinates => "Koordinat lokasi tidak tersedia",
            Self::NotReady => "Memuat peta...",
        }
    }

    pub const fn detail(self) -> Option<&'static str> {
        match self {
            Self::NoCoordinates => Some("Peta tidak dapat ditampilkan"),
            Self::NotReady => None,
        }
    }
}

/// Gate in front of the map: either a validated origin or the placeholder to show.
pub fn map_gate(location: &Location) -> Result<GeoPoint, FallbackReason> {
    validate(location).map_err(|_: InvalidCoordinates| FallbackReason::NoCoordinates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_location_gates_to_no_coordinates() {
        let gate = map_gate(&Location::new("", "110.4166", "Kost B"));
        assert_eq!(gate, Err(FallbackReason::NoCoordinates));
        assert_eq!(
            FallbackReason::NoCoordinates.title(),
            "Koordinat lokasi tidak tersedia"
        );
        assert_eq!(
            FallbackReason::NoCoordinates.detail(),
            Some("Peta tidak dapat ditampilkan")
        );
    }

    #[test]
    fn valid_location_passes_the_gate_unchanged() {
        let gate = map_gate(&Location::new("-6.9666", "110.4166", "Kost A"));
        assert_eq!(gate, Ok(GeoPoint::new(-6.9666, 110.4166)));
    }
}
