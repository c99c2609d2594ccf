//! Canvas-backed slippy map: OSM raster tiles, marker icons with popups, and the
//! polylines of attached route overlays.
//!
//! Surfaces live in a thread-local registry keyed by [`SurfaceId`] so that
//! browser callbacks (tile loads, animation frames, route fetches) can reach a
//! surface without holding it, and find nothing once it has been unmounted.

#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;
use std::fmt;
use std::rc::Rc;

use medikost_shared::tiles::{TILE_SIZE, covering_tiles};
use medikost_shared::{GeoPoint, Marker, MarkerRole};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::Closure;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::icons;
use crate::render_loop::FrameScheduler;
use crate::route_lines::RouteLines;
use crate::tiles::{TileLayer, TileNotify};
use crate::viewport::Viewport;

const BACKGROUND: &str = "#e5e3df";
const FIT_PADDING: f64 = 24.0;
const CLICK_SLOP: f64 = 4.0;
/// Frames to wait for the canvas to get a layout size before relying on the
/// resize listener alone.
const MAX_EMPTY_FRAMES: u32 = 120;

/// Casing, halo and line, drawn in that order.
const ROUTE_STYLES: [(&str, f64, f64); 3] = [
    ("black", 0.15, 9.0),
    ("white", 0.8, 6.0),
    ("red", 1.0, 2.0),
];

/// Opaque handle to a mounted surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(u64);

impl SurfaceId {
    pub fn next() -> Self {
        NEXT_SURFACE_ID.with(|next| {
            let id = next.get();
            next.set(id.wrapping_add(1));
            Self(id)
        })
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceInitError {
    NoContext,
    AlreadyMounted(SurfaceId),
}

impl fmt::Display for SurfaceInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoContext => f.write_str("2d canvas context unavailable"),
            Self::AlreadyMounted(id) => write!(f, "{id} is already mounted"),
        }
    }
}

impl std::error::Error for SurfaceInitError {}

thread_local! {
    static SURFACES: RefCell<HashMap<SurfaceId, MapSurface>> = RefCell::new(HashMap::new());
    static NEXT_SURFACE_ID: Cell<u64> = const { Cell::new(1) };
}

/// Window `resize` listener that repaints the surface. Dropping it removes the
/// listener.
struct ResizeBinding {
    window: web_sys::Window,
    handler: Closure<dyn FnMut()>,
}

impl ResizeBinding {
    fn attach(id: SurfaceId) -> Option<Self> {
        let window = web_sys::window()?;
        let handler = Closure::<dyn FnMut()>::new(move || {
            with_surface(id, |surface| {
                surface.empty_frames = 0;
                surface.frames.request();
            });
        });
        window
            .add_event_listener_with_callback("resize", handler.as_ref().unchecked_ref())
            .ok()?;
        Some(Self { window, handler })
    }
}

impl Drop for ResizeBinding {
    fn drop(&mut self) {
        let _ = self
            .window
            .remove_event_listener_with_callback("resize", self.handler.as_ref().unchecked_ref());
    }
}

pub struct MapSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    viewport: Viewport,
    size: (f64, f64),
    markers: Vec<Marker>,
    open_popup: Option<MarkerRole>,
    routes: RouteLines,
    tiles: TileLayer,
    frames: FrameScheduler,
    resize: Option<ResizeBinding>,
    empty_frames: u32,
    drag: Option<DragState>,
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    last: (f64, f64),
    travelled: f64,
}

/// Create a surface on `canvas` and register it under `id`.
pub fn mount(
    id: SurfaceId,
    canvas: HtmlCanvasElement,
    center: GeoPoint,
    zoom: u8,
    markers: Vec<Marker>,
) -> Result<(), SurfaceInitError> {
    if SURFACES.with(|s| s.borrow().contains_key(&id)) {
        return Err(SurfaceInitError::AlreadyMounted(id));
    }

    let ctx = canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
        .ok_or(SurfaceInitError::NoContext)?;

    let notify: TileNotify = Rc::new(move |coord, ok| {
        with_surface(id, |surface| {
            surface.tiles.finish(coord, ok);
            surface.frames.request();
        });
    });

    let surface = MapSurface {
        canvas,
        ctx,
        viewport: Viewport::new(center, zoom),
        size: (0.0, 0.0),
        markers,
        open_popup: None,
        routes: RouteLines::default(),
        tiles: TileLayer::new(notify),
        frames: FrameScheduler::new(move || paint(id)),
        resize: ResizeBinding::attach(id),
        empty_frames: 0,
        drag: None,
    };
    surface.frames.request();

    SURFACES.with(|s| s.borrow_mut().insert(id, surface));
    tracing::debug!(%id, lat = center.lat, lng = center.lng, zoom, "map surface mounted");
    Ok(())
}

/// Release a surface. Unknown or already-unmounted ids are ignored.
pub fn unmount(id: SurfaceId) -> bool {
    let Some(mut surface) = SURFACES.with(|s| s.borrow_mut().remove(&id)) else {
        return false;
    };
    surface.frames.cancel();
    surface.resize.take();
    surface.tiles.cancel_all();
    surface.routes.clear();
    tracing::debug!(%id, "map surface unmounted");
    true
}

/// Run `f` against a mounted surface. Returns `None` when the surface is gone.
pub fn with_surface<R>(id: SurfaceId, f: impl FnOnce(&mut MapSurface) -> R) -> Option<R> {
    SURFACES.with(|s| {
        let mut surfaces = s.try_borrow_mut().ok()?;
        surfaces.get_mut(&id).map(f)
    })
}

fn paint(id: SurfaceId) {
    with_surface(id, |surface| surface.paint(id));
}

impl MapSurface {
    /// Replace the markers. The view recenters when the origin marker moves.
    pub fn set_markers(&mut self, markers: Vec<Marker>) {
        let old_origin = origin_of(&self.markers);
        let new_origin = origin_of(&markers);
        if let Some(origin) = new_origin
            && old_origin != new_origin
        {
            self.viewport.center = origin;
            self.open_popup = None;
        }
        if self.markers != markers {
            self.markers = markers;
            self.frames.request();
        }
    }

    pub fn zoom_by(&mut self, steps: i32) {
        let (w, h) = self.size;
        if self.viewport.zoom_at(steps, w / 2.0, h / 2.0, w, h) {
            self.frames.request();
        }
    }

    pub fn zoom_at(&mut self, steps: i32, x: f64, y: f64) {
        let (w, h) = self.size;
        if self.viewport.zoom_at(steps, x, y, w, h) {
            self.frames.request();
        }
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.drag = Some(DragState {
            last: (x, y),
            travelled: 0.0,
        });
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        let (dx, dy) = (x - drag.last.0, y - drag.last.1);
        drag.last = (x, y);
        drag.travelled += dx.hypot(dy);
        if dx != 0.0 || dy != 0.0 {
            self.viewport.pan(dx, dy);
            self.frames.request();
        }
    }

    /// End a drag. A press that barely moved counts as a click on the marker
    /// under the pointer, toggling its popup.
    pub fn pointer_up(&mut self, x: f64, y: f64) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        if drag.travelled > CLICK_SLOP {
            return;
        }
        let hit = self.marker_at(x, y);
        self.open_popup = match hit {
            Some(role) if self.open_popup != Some(role) => Some(role),
            _ => None,
        };
        self.frames.request();
    }

    pub fn pointer_cancel(&mut self) {
        self.drag = None;
    }

    /// Register an empty polyline for a route whose geometry is still pending.
    pub fn attach_route(&mut self, epoch: u64) {
        self.routes.attach(epoch);
    }

    /// Fill in the geometry of an attached route. Returns false when the route
    /// was removed in the meantime. The view is fitted to the route when part of
    /// it falls outside the canvas.
    pub fn fill_route(&mut self, epoch: u64, points: Vec<GeoPoint>) -> bool {
        if !self.routes.contains(epoch) {
            return false;
        }
        let (w, h) = self.size;
        if !self.viewport.contains_all(&points, w, h, FIT_PADDING) {
            self.viewport.fit_bounds(&points, w, h, FIT_PADDING);
        }
        self.routes.fill(epoch, points);
        self.frames.request();
        true
    }

    pub fn detach_route(&mut self, epoch: u64) -> bool {
        let removed = self.routes.detach(epoch);
        if removed {
            self.frames.request();
        }
        removed
    }

    pub fn has_route(&self, epoch: u64) -> bool {
        self.routes.contains(epoch)
    }

    fn marker_at(&self, x: f64, y: f64) -> Option<MarkerRole> {
        let (w, h) = self.size;
        // Topmost (last drawn) marker wins.
        self.markers.iter().rev().find_map(|marker| {
            let (mx, my) = self.viewport.geo_to_screen(marker.position, w, h);
            let left = mx - f64::from(marker.icon.anchor.0);
            let top = my - f64::from(marker.icon.anchor.1);
            let inside = x >= left
                && x <= left + f64::from(marker.icon.size.0)
                && y >= top
                && y <= top + f64::from(marker.icon.size.1);
            inside.then_some(marker.role)
        })
    }

    fn sync_canvas_size(&mut self) -> f64 {
        let dpr = web_sys::window()
            .map(|w| w.device_pixel_ratio())
            .filter(|dpr| *dpr > 0.0)
            .unwrap_or(1.0);
        let css_w = f64::from(self.canvas.client_width().max(0));
        let css_h = f64::from(self.canvas.client_height().max(0));
        let px_w = (css_w * dpr).round() as u32;
        let px_h = (css_h * dpr).round() as u32;
        if self.canvas.width() != px_w {
            self.canvas.set_width(px_w);
        }
        if self.canvas.height() != px_h {
            self.canvas.set_height(px_h);
        }
        self.size = (css_w, css_h);
        dpr
    }

    fn paint(&mut self, id: SurfaceId) {
        let dpr = self.sync_canvas_size();
        let (w, h) = self.size;
        if w <= 0.0 || h <= 0.0 {
            // Not laid out yet; try again next frame.
            if retry_unsized(&mut self.empty_frames) {
                self.frames.request();
            }
            return;
        }
        self.empty_frames = 0;

        let _ = self.ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);
        self.ctx.set_global_alpha(1.0);
        self.ctx.set_fill_style_str(BACKGROUND);
        self.ctx.fill_rect(0.0, 0.0, w, h);

        self.paint_tiles(w, h);
        self.paint_routes(w, h);
        self.paint_markers(id, w, h);
        self.paint_popup(w, h);
    }

    fn paint_tiles(&mut self, w: f64, h: f64) {
        let (cx, cy) = self.viewport.center_px();
        let placements = covering_tiles((cx, cy), self.viewport.zoom, w, h);
        let mut visible = HashSet::with_capacity(placements.len());

        for placement in &placements {
            visible.insert(placement.coord);
            let Some(image) = self.tiles.get_or_request(placement.coord) else {
                continue;
            };
            let sx = (placement.x - cx + w / 2.0).round();
            let sy = (placement.y - cy + h / 2.0).round();
            let _ = self
                .ctx
                .draw_image_with_html_image_element_and_dw_and_dh(&image, sx, sy, TILE_SIZE, TILE_SIZE);
        }

        self.tiles.settle(&visible);
    }

    fn paint_routes(&self, w: f64, h: f64) {
        let ctx = &self.ctx;
        ctx.set_line_cap("round");
        ctx.set_line_join("round");

        for route in self.routes.drawable() {
            let screen: Vec<(f64, f64)> = route
                .points
                .iter()
                .map(|&point| self.viewport.geo_to_screen(point, w, h))
                .collect();

            for (color, opacity, weight) in ROUTE_STYLES {
                ctx.set_global_alpha(opacity);
                ctx.set_stroke_style_str(color);
                ctx.set_line_width(weight);
                ctx.begin_path();
                for (i, &(x, y)) in screen.iter().enumerate() {
                    if i == 0 {
                        ctx.move_to(x, y);
                    } else {
                        ctx.line_to(x, y);
                    }
                }
                ctx.stroke();
            }
        }
        ctx.set_global_alpha(1.0);
    }

    fn paint_markers(&self, id: SurfaceId, w: f64, h: f64) {
        let repaint = move || {
            with_surface(id, |surface| surface.frames.request());
        };

        for marker in &self.markers {
            let (x, y) = self.viewport.geo_to_screen(marker.position, w, h);
            let icon = marker.icon;
            let left = x - f64::from(icon.anchor.0);
            let top = y - f64::from(icon.anchor.1);

            if let Some(shadow) = icons::marker_image(icon.shadow_url, id, repaint) {
                let _ = self.ctx.draw_image_with_html_image_element_and_dw_and_dh(
                    &shadow,
                    left,
                    top,
                    f64::from(icon.shadow_size.0),
                    f64::from(icon.shadow_size.1),
                );
            }

            match icons::marker_image(icon.url, id, repaint) {
                Some(image) => {
                    let _ = self.ctx.draw_image_with_html_image_element_and_dw_and_dh(
                        &image,
                        left,
                        top,
                        f64::from(icon.size.0),
                        f64::from(icon.size.1),
                    );
                }
                None => self.paint_pin(marker.role, x, y),
            }
        }
    }

    /// Drawn stand-in for a marker icon that has not loaded.
    fn paint_pin(&self, role: MarkerRole, x: f64, y: f64) {
        let ctx = &self.ctx;
        let color = match role {
            MarkerRole::Origin => "#059669",
            MarkerRole::Destination => "#dc2626",
        };
        ctx.begin_path();
        ctx.move_to(x, y);
        let _ = ctx.arc(x, y - 20.0, 10.0, PI * 0.8, PI * 2.2);
        ctx.close_path();
        ctx.set_fill_style_str(color);
        ctx.fill();
        ctx.set_stroke_style_str("white");
        ctx.set_line_width(2.0);
        ctx.stroke();
    }

    fn paint_popup(&self, w: f64, h: f64) {
        let Some(role) = self.open_popup else {
            return;
        };
        let Some(marker) = self.markers.iter().find(|marker| marker.role == role) else {
            return;
        };

        let ctx = &self.ctx;
        let (x, y) = self.viewport.geo_to_screen(marker.position, w, h);
        let tip_x = x + f64::from(marker.icon.popup_anchor.0);
        let tip_y = y + f64::from(marker.icon.popup_anchor.1);

        ctx.set_font("13px sans-serif");
        let text_w = ctx
            .measure_text(&marker.label)
            .map(|m| m.width())
            .unwrap_or(marker.label.len() as f64 * 7.0);
        let box_w = text_w + 24.0;
        let box_h = 32.0;
        let tip = 8.0;
        let left = tip_x - box_w / 2.0;
        let top = tip_y - tip - box_h;

        ctx.begin_path();
        rounded_rect(ctx, left, top, box_w, box_h, 8.0);
        ctx.move_to(tip_x - tip, top + box_h);
        ctx.line_to(tip_x, tip_y);
        ctx.line_to(tip_x + tip, top + box_h);
        ctx.set_fill_style_str("white");
        ctx.set_shadow_color("rgba(0, 0, 0, 0.3)");
        ctx.set_shadow_blur(6.0);
        ctx.fill();
        ctx.set_shadow_color("transparent");
        ctx.set_shadow_blur(0.0);

        ctx.set_fill_style_str("#333");
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        let _ = ctx.fill_text(&marker.label, tip_x, top + box_h / 2.0);
    }
}

fn retry_unsized(empty_frames: &mut u32) -> bool {
    if *empty_frames >= MAX_EMPTY_FRAMES {
        return false;
    }
    *empty_frames += 1;
    true
}

fn origin_of(markers: &[Marker]) -> Option<GeoPoint> {
    markers
        .iter()
        .find(|marker| marker.role == MarkerRole::Origin)
        .map(|marker| marker.position)
}

fn rounded_rect(ctx: &CanvasRenderingContext2d, x: f64, y: f64, w: f64, h: f64, r: f64) {
    ctx.move_to(x + r, y);
    let _ = ctx.arc_to(x + w, y, x + w, y + h, r);
    let _ = ctx.arc_to(x + w, y + h, x, y + h, r);
    let _ = ctx.arc_to(x, y + h, x, y, r);
    let _ = ctx.arc_to(x, y, x + w, y, r);
    ctx.close_path();
}
