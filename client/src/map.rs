use leptos::prelude::*;
use medikost_shared::markers::DEFAULT_ZOOM;
use medikost_shared::tiles::TILE_ATTRIBUTION;
use medikost_shared::{FallbackReason, GeoPoint, Location, listing_markers, map_gate};
use web_sys::HtmlCanvasElement;

use crate::fallback::MapFallback;
use crate::map_surface::{self, SurfaceId, with_surface};
use crate::route_overlay;

const MAP_FRAME_STYLE: &str =
    "width: 100%; height: 16rem; border-radius: 8px; overflow: hidden; border: 1px solid #e5e7eb;";
const ZOOM_BUTTON_STYLE: &str = "display: block; width: 30px; height: 30px; border: none; background: white; color: #111; font: bold 18px/30px sans-serif; cursor: pointer; padding: 0;";

/// Map of a listing and the hospital with the driving route between them, or a
/// placeholder when the listing's coordinates do not parse.
///
/// The surface stays mounted while the coordinates go from one valid value to
/// another; the markers and route follow the new origin.
#[component]
pub fn KostMap(#[prop(into)] location: Signal<Location>) -> impl IntoView {
    let origin = Memo::new(move |_| location.with(|loc| map_gate(loc).ok()));
    let has_coordinates = Memo::new(move |_| origin.get().is_some());
    let label = Memo::new(move |_| location.with(|loc| loc.label.clone()));

    view! {
        <div class="kost-map" style=MAP_FRAME_STYLE>
            {move || {
                if has_coordinates.get() {
                    view! { <MapViewport origin=origin label=label /> }.into_any()
                } else {
                    view! { <MapFallback reason=FallbackReason::NoCoordinates /> }.into_any()
                }
            }}
        </div>
    }
}

fn offset(e: &web_sys::MouseEvent) -> (f64, f64) {
    (f64::from(e.offset_x()), f64::from(e.offset_y()))
}

#[component]
fn MapViewport(
    #[prop(into)] origin: Signal<Option<GeoPoint>>,
    #[prop(into)] label: Signal<String>,
) -> impl IntoView {
    let id = SurfaceId::next();
    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let mounted = RwSignal::new(false);
    let failed = RwSignal::new(false);

    route_overlay::register(id);

    // Mount once the canvas is attached. A failed mount leaves the area blank.
    Effect::new(move || {
        let Some(canvas_el) = canvas_ref.get() else {
            return;
        };
        if mounted.get_untracked() || failed.get_untracked() {
            return;
        }
        let Some(center) = origin.get_untracked() else {
            return;
        };
        let canvas: &HtmlCanvasElement = &canvas_el;
        let markers = listing_markers(center, &label.get_untracked());
        match map_surface::mount(id, canvas.clone(), center, DEFAULT_ZOOM, markers) {
            Ok(()) => mounted.set(true),
            Err(_) => failed.set(true),
        }
    });

    // Markers follow the listing.
    Effect::new(move || {
        let point = origin.get();
        let text = label.get();
        if !mounted.get() {
            return;
        }
        if let Some(point) = point {
            with_surface(id, |surface| surface.set_markers(listing_markers(point, &text)));
        }
    });

    // The route follows the handle and the origin.
    Effect::new(move || {
        let handle = mounted.get().then_some(id);
        route_overlay::sync(id, handle, origin.get());
    });

    on_cleanup(move || {
        route_overlay::teardown(id);
        map_surface::unmount(id);
    });

    view! {
        <div style="position: relative; width: 100%; height: 100%; background: #e5e3df;">
            <canvas
                node_ref=canvas_ref
                style="display: block; width: 100%; height: 100%; touch-action: none; cursor: grab;"
                on:pointerdown=move |e: web_sys::PointerEvent| {
                    let (x, y) = offset(&e);
                    with_surface(id, |surface| surface.pointer_down(x, y));
                }
                on:pointermove=move |e: web_sys::PointerEvent| {
                    let (x, y) = offset(&e);
                    with_surface(id, |surface| surface.pointer_move(x, y));
                }
                on:pointerup=move |e: web_sys::PointerEvent| {
                    let (x, y) = offset(&e);
                    with_surface(id, |surface| surface.pointer_up(x, y));
                }
                on:pointerleave=move |_| {
                    with_surface(id, |surface| surface.pointer_cancel());
                }
                on:wheel=move |e: web_sys::WheelEvent| {
                    e.prevent_default();
                    let (x, y) = offset(&e);
                    let steps = if e.delta_y() < 0.0 { 1 } else { -1 };
                    with_surface(id, |surface| surface.zoom_at(steps, x, y));
                }
            />
            {move || {
                mounted
                    .get()
                    .then(|| {
                        view! {
                            <div style="position: absolute; top: 10px; left: 10px; border-radius: 4px; overflow: hidden; box-shadow: 0 1px 5px rgba(0,0,0,0.4);">
                                <button
                                    title="Zoom in"
                                    style=ZOOM_BUTTON_STYLE
                                    on:click=move |_| {
                                        with_surface(id, |surface| surface.zoom_by(1));
                                    }
                                >
                                    "+"
                                </button>
                                <button
                                    title="Zoom out"
                                    style=format!("{ZOOM_BUTTON_STYLE} border-top: 1px solid #ccc;")
                                    on:click=move |_| {
                                        with_surface(id, |surface| surface.zoom_by(-1));
                                    }
                                >
                                    "\u{2212}"
                                </button>
                            </div>
                            <div
                                class="map-attribution"
                                style="position: absolute; right: 0; bottom: 0; padding: 0 5px; background: rgba(255,255,255,0.8); font: 11px/1.5 sans-serif; color: #333;"
                                inner_html=TILE_ATTRIBUTION
                            ></div>
                        }
                    })
            }}
            {move || {
                (!mounted.get() && !failed.get())
                    .then(|| {
                        view! {
                            <div style="position: absolute; inset: 0;">
                                <MapFallback reason=FallbackReason::NotReady />
                            </div>
                        }
                    })
            }}
        </div>
    }
}
