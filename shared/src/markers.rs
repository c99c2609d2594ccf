use crate::geo::GeoPoint;

/// RSUP Dr. Kariadi, the destination of every route.
pub const REFERENCE_POINT: GeoPoint = GeoPoint::new(-6.9942118, 110.4049148);
pub const REFERENCE_LABEL: &str = "RSUP Dr. Kariadi";

pub const DEFAULT_ZOOM: u8 = 15;

const MARKER_SHADOW_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/leaflet/0.7.7/images/marker-shadow.png";

/// Static description of a marker image. Offsets are in CSS pixels relative to
/// the icon's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconRef {
    pub url: &'static str,
    pub shadow_url: &'static str,
    pub size: (u32, u32),
    pub anchor: (i32, i32),
    pub popup_anchor: (i32, i32),
    pub shadow_size: (u32, u32),
}

pub const LISTING_ICON: IconRef = IconRef {
    url: "/images/house.png",
    shadow_url: MARKER_SHADOW_URL,
    size: (32, 32),
    anchor: (16, 32),
    popup_anchor: (0, -32),
    shadow_size: (41, 41),
};

pub const HOSPITAL_ICON: IconRef = IconRef {
    url: "/images/hospital.png",
    shadow_url: MARKER_SHADOW_URL,
    size: (32, 32),
    anchor: (16, 32),
    popup_anchor: (0, -32),
    shadow_size: (41, 41),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerRole {
    Origin,
    Destination,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub role: MarkerRole,
    pub position: GeoPoint,
    pub icon: IconRef,
    pub label: String,
}

/// The two markers shown for a listing: the listing itself, then the hospital.
pub fn listing_markers(origin: GeoPoint, label: &str) -> Vec<Marker> {
    vec![
        Marker {
            role: MarkerRole::Origin,
            position: origin,
            icon: LISTING_ICON,
            label: label.to_owned(),
        },
        Marker {
            role: MarkerRole::Destination,
            position: REFERENCE_POINT,
            icon: HOSPITAL_ICON,
            label: REFERENCE_LABEL.to_owned(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Location, validate};

    #[test]
    fn kost_a_gets_origin_and_hospital_markers() {
        let origin = validate(&Location::new("-6.9666", "110.4166", "Kost A"))
            .expect("Kost A coordinates are valid");
        let markers = listing_markers(origin, "Kost A");

        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].role, MarkerRole::Origin);
        assert_eq!(markers[0].position, GeoPoint::new(-6.9666, 110.4166));
        assert_eq!(markers[0].label, "Kost A");
        assert_eq!(markers[0].icon, LISTING_ICON);

        assert_eq!(markers[1].role, MarkerRole::Destination);
        assert_eq!(markers[1].position, GeoPoint::new(-6.9942118, 110.4049148));
        assert_eq!(markers[1].label, REFERENCE_LABEL);
        assert_eq!(markers[1].icon, HOSPITAL_ICON);
    }

    #[test]
    fn icons_anchor_at_bottom_center() {
        for icon in [LISTING_ICON, HOSPITAL_ICON] {
            assert_eq!(icon.anchor.0 as u32 * 2, icon.size.0);
            assert_eq!(icon.anchor.1 as u32, icon.size.1);
            assert_eq!(icon.popup_anchor, (0, -(icon.size.1 as i32)));
        }
    }
}
