use medikost_shared::GeoPoint;
use medikost_shared::tiles::{MAX_ZOOM, MIN_ZOOM, project, unproject};

/// Viewport tracks the geographic center and integer zoom of a map surface and
/// converts between geographic and canvas (CSS pixel) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: GeoPoint,
    pub zoom: u8,
}

impl Viewport {
    pub fn new(center: GeoPoint, zoom: u8) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    /// Global pixel position of the center at the current zoom.
    pub fn center_px(&self) -> (f64, f64) {
        project(self.center, self.zoom)
    }

    /// Convert a geographic point to canvas coordinates.
    pub fn geo_to_screen(&self, point: GeoPoint, width: f64, height: f64) -> (f64, f64) {
        let (cx, cy) = self.center_px();
        let (px, py) = project(point, self.zoom);
        (px - cx + width / 2.0, py - cy + height / 2.0)
    }

    /// Convert canvas coordinates to a geographic point.
    pub fn screen_to_geo(&self, sx: f64, sy: f64, width: f64, height: f64) -> GeoPoint {
        let (cx, cy) = self.center_px();
        unproject(cx + sx - width / 2.0, cy + sy - height / 2.0, self.zoom)
    }

    /// Pan by screen-space delta. Dragging right moves the map right, so the
    /// center moves left.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let (cx, cy) = self.center_px();
        self.center = unproject(cx - dx, cy - dy, self.zoom);
    }

    /// Step the zoom toward a focus point (canvas coordinates), keeping the
    /// geographic point under the focus fixed. Returns false when already at the
    /// zoom limit.
    pub fn zoom_at(&mut self, steps: i32, sx: f64, sy: f64, width: f64, height: f64) -> bool {
        let target = (i32::from(self.zoom) + steps).clamp(i32::from(MIN_ZOOM), i32::from(MAX_ZOOM));
        let target = target as u8;
        if target == self.zoom {
            return false;
        }

        let focus = self.screen_to_geo(sx, sy, width, height);
        self.zoom = target;
        let (fx, fy) = project(focus, self.zoom);
        self.center = unproject(fx - (sx - width / 2.0), fy - (sy - height / 2.0), self.zoom);
        true
    }

    /// Whether every point lies inside the canvas shrunk by `padding` on each side.
    pub fn contains_all(&self, points: &[GeoPoint], width: f64, height: f64, padding: f64) -> bool {
        points.iter().all(|&point| {
            let (x, y) = self.geo_to_screen(point, width, height);
            x >= padding && x <= width - padding && y >= padding && y <= height - padding
        })
    }

    /// Center on the bounds of `points` and pick the largest integer zoom at which
    /// they fit inside the canvas with `padding` pixels to spare on each side.
    pub fn fit_bounds(&mut self, points: &[GeoPoint], width: f64, height: f64, padding: f64) {
        let avail_w = width - padding * 2.0;
        let avail_h = height - padding * 2.0;
        if points.is_empty() || avail_w <= 0.0 || avail_h <= 0.0 {
            return;
        }

        let mut zoom = MAX_ZOOM;
        loop {
            let (min_x, min_y, max_x, max_y) = pixel_bounds(points, zoom);
            if (max_x - min_x <= avail_w && max_y - min_y <= avail_h) || zoom == MIN_ZOOM {
                self.zoom = zoom;
                self.center = unproject((min_x + max_x) / 2.0, (min_y + max_y) / 2.0, zoom);
                return;
            }
            zoom -= 1;
        }
    }
}

fn pixel_bounds(points: &[GeoPoint], zoom: u8) -> (f64, f64, f64, f64) {
    points.iter().fold(
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        |(min_x, min_y, max_x, max_y), &point| {
            let (x, y) = project(point, zoom);
            (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
        },
    )
}
