pub mod fallback;
pub mod geo;
pub mod listing;
pub mod markers;
pub mod osrm;
pub mod route;
pub mod tiles;

pub use fallback::{FallbackReason, map_gate};
pub use geo::{GeoPoint, InvalidCoordinates, Location, validate};
pub use listing::{ApiResponse, ProductDetail};
pub use markers::{Marker, MarkerRole, REFERENCE_LABEL, REFERENCE_POINT, listing_markers};
pub use route::{OverlayState, RouteBackend, RouteOverlayManager, RouteRequest, Transition};
