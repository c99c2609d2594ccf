//! Web Mercator projection and slippy-map tile addressing.

use std::f64::consts::PI;

use crate::geo::GeoPoint;

pub const TILE_SIZE: f64 = 256.0;
pub const MIN_ZOOM: u8 = 3;
pub const MAX_ZOOM: u8 = 19;

/// Latitude limit of the square Web Mercator world.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

pub const TILE_URL_TEMPLATE: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_SUBDOMAINS: &[&str] = &["a", "b", "c"];
pub const TILE_ATTRIBUTION: &str = "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

/// Side length of the whole world in pixels at `zoom`.
pub fn world_size(zoom: u8) -> f64 {
    TILE_SIZE * f64::from(1u32 << zoom.min(MAX_ZOOM))
}

/// Project a point to global pixel coordinates at `zoom`.
pub fn project(point: GeoPoint, zoom: u8) -> (f64, f64) {
    let size = world_size(zoom);
    let lat = point.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (point.lng + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * size;
    (x, y)
}

/// Inverse of [`project`].
pub fn unproject(x: f64, y: f64, zoom: u8) -> GeoPoint {
    let size = world_size(zoom);
    let lng = x / size * 360.0 - 180.0;
    let n = PI - 2.0 * PI * y / size;
    let lat = n.sinh().atan().to_degrees();
    GeoPoint::new(lat, lng)
}

/// A tile to draw, with the global pixel position of its top-left corner. `x` is
/// unwrapped, so tiles repeated across the antimeridian land side by side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    pub coord: TileCoord,
    pub x: f64,
    pub y: f64,
}

/// Tiles covering a `width` x `height` pixel viewport whose center sits at global
/// pixel `center`. Columns wrap around the antimeridian, rows outside the world
/// are skipped. Ordered nearest-to-center first so the middle of the view fills in
/// before the edges.
pub fn covering_tiles(
    center: (f64, f64),
    zoom: u8,
    width: f64,
    height: f64,
) -> Vec<TilePlacement> {
    let zoom = zoom.min(MAX_ZOOM);
    let count = 1i64 << zoom;
    let half_w = width.max(0.0) / 2.0;
    let half_h = height.max(0.0) / 2.0;

    let min_col = ((center.0 - half_w) / TILE_SIZE).floor() as i64;
    let max_col = ((center.0 + half_w) / TILE_SIZE).floor() as i64;
    let min_row = (((center.1 - half_h) / TILE_SIZE).floor() as i64).max(0);
    let max_row = (((center.1 + half_h) / TILE_SIZE).floor() as i64).min(count - 1);

    let mut tiles = Vec::new();
    for row in min_row..=max_row {
        for col in min_col..=max_col {
            let x = col as f64 * TILE_SIZE;
            let y = row as f64 * TILE_SIZE;
            let dx = x + TILE_SIZE / 2.0 - center.0;
            let dy = y + TILE_SIZE / 2.0 - center.1;
            let coord = TileCoord {
                z: zoom,
                x: col.rem_euclid(count) as u32,
                y: row as u32,
            };
            tiles.push((dx * dx + dy * dy, col, TilePlacement { coord, x, y }));
        }
    }

    tiles.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    tiles.into_iter().map(|(_, _, placement)| placement).collect()
}

/// Expand the tile URL template, rotating through the configured subdomains.
pub fn tile_url(template: &str, coord: TileCoord) -> String {
    let subdomain = if TILE_SUBDOMAINS.is_empty() {
        ""
    } else {
        TILE_SUBDOMAINS[((coord.x + coord.y) as usize) % TILE_SUBDOMAINS.len()]
    };
    template
        .replace("{s}", subdomain)
        .replace("{z}", &coord.z.to_string())
        .replace("{x}", &coord.x.to_string())
        .replace("{y}", &coord.y.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, eps: f64) {
        let diff = (actual - expected).abs();
        assert!(diff < eps, "expected {expected}, got {actual} (diff: {diff})");
    }

    #[test]
    fn project_origin_is_world_center() {
        let (x, y) = project(GeoPoint::new(0.0, 0.0), 1);
        assert_close(x, 256.0, 1e-9);
        assert_close(y, 256.0, 1e-9);
    }

    #[test]
    fn project_unproject_roundtrip_near_semarang() {
        let point = GeoPoint::new(-6.9942118, 110.4049148);
        let (x, y) = project(point, 15);
        let back = unproject(x, y, 15);
        assert_close(back.lat, point.lat, 1e-9);
        assert_close(back.lng, point.lng, 1e-9);
    }

    #[test]
    fn project_clamps_polar_latitudes() {
        let (_, y_north) = project(GeoPoint::new(90.0, 0.0), 2);
        let (_, y_south) = project(GeoPoint::new(-90.0, 0.0), 2);
        assert!(y_north.is_finite() && y_north.abs() < 1e-6);
        assert_close(y_south, world_size(2), 1e-6);
    }

    #[test]
    fn covering_tiles_for_kariadi_contains_the_hospital_tile() {
        let (cx, cy) = project(GeoPoint::new(-6.9942118, 110.4049148), 15);
        let tiles = covering_tiles((cx, cy), 15, 600.0, 256.0);
        let expected = TileCoord {
            z: 15,
            x: (cx / TILE_SIZE).floor() as u32,
            y: (cy / TILE_SIZE).floor() as u32,
        };
        assert_eq!(tiles.first().map(|t| t.coord), Some(expected));
        assert!((3..=8).contains(&tiles.len()), "got {} tiles", tiles.len());
    }

    #[test]
    fn covering_tiles_wraps_columns_and_skips_rows_outside_world() {
        let tiles = covering_tiles((0.0, 0.0), 1, 256.0, 256.0);
        let mut coords: Vec<(u32, u32)> = tiles.iter().map(|t| (t.coord.x, t.coord.y)).collect();
        coords.sort();
        assert_eq!(coords, vec![(0, 0), (1, 0)]);

        let wrapped = tiles
            .iter()
            .find(|t| t.coord.x == 1)
            .expect("column -1 wraps to 1");
        assert_eq!((wrapped.x, wrapped.y), (-256.0, 0.0));
    }

    #[test]
    fn tile_url_expands_template_with_rotating_subdomain() {
        let coord = TileCoord { z: 15, x: 26433, y: 17019 };
        assert_eq!(
            tile_url(TILE_URL_TEMPLATE, coord),
            "https://a.tile.openstreetmap.org/15/26433/17019.png"
        );
        let next = TileCoord { x: 26434, ..coord };
        assert!(tile_url(TILE_URL_TEMPLATE, next).starts_with("https://b."));
    }
}
