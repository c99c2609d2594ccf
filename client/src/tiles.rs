#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use js_sys::Reflect;
use medikost_shared::tiles::{TILE_URL_TEMPLATE, TileCoord, tile_url};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlImageElement;

const MAX_CONCURRENCY: usize = 6;
const MAX_CACHED_TILES: usize = 192;
const ONLOAD_HANDLE_KEY: &str = "__medikostTileOnload";
const ONERROR_HANDLE_KEY: &str = "__medikostTileOnerror";

/// Called when a tile request settles, with `true` when the image is ready to draw.
pub type TileNotify = Rc<dyn Fn(TileCoord, bool)>;

enum TileSlot {
    Queued,
    Loading(HtmlImageElement),
    Ready(HtmlImageElement),
    Failed,
}

/// Raster tile cache for one map surface.
///
/// Requests are served nearest-first with a bounded number of images in flight.
/// Completion is reported through `notify`, which the owner routes back into
/// [`TileLayer::finish`] once it holds the layer again.
pub struct TileLayer {
    template: String,
    slots: HashMap<TileCoord, TileSlot>,
    queue: VecDeque<TileCoord>,
    in_flight: usize,
    notify: TileNotify,
}

impl TileLayer {
    pub fn new(notify: TileNotify) -> Self {
        Self {
            template: TILE_URL_TEMPLATE.to_string(),
            slots: HashMap::new(),
            queue: VecDeque::new(),
            in_flight: 0,
            notify,
        }
    }

    /// Image for `coord` if it has finished loading; otherwise queue it.
    pub fn get_or_request(&mut self, coord: TileCoord) -> Option<HtmlImageElement> {
        match self.slots.get(&coord) {
            Some(TileSlot::Ready(img)) => Some(img.clone()),
            Some(_) => None,
            None => {
                self.slots.insert(coord, TileSlot::Queued);
                self.queue.push_back(coord);
                None
            }
        }
    }

    /// Drop queued requests that scrolled out of view, evict cached tiles beyond
    /// the cache budget, and start as many loads as the concurrency limit allows.
    pub fn settle(&mut self, visible: &HashSet<TileCoord>) {
        let slots = &mut self.slots;
        self.queue.retain(|coord| {
            let keep = visible.contains(coord);
            if !keep {
                slots.remove(coord);
            }
            keep
        });

        if self.slots.len() > MAX_CACHED_TILES {
            self.slots.retain(|coord, slot| {
                visible.contains(coord) || matches!(slot, TileSlot::Loading(_) | TileSlot::Queued)
            });
        }

        self.pump();
    }

    /// Record the outcome of a load started by this layer.
    pub fn finish(&mut self, coord: TileCoord, ok: bool) {
        if let Some(slot) = self.slots.get_mut(&coord)
            && let TileSlot::Loading(img) = slot
        {
            self.in_flight = self.in_flight.saturating_sub(1);
            let img = img.clone();
            *slot = if ok {
                TileSlot::Ready(img)
            } else {
                TileSlot::Failed
            };
        }
        self.pump();
    }

    /// Abort in-flight loads and forget every tile.
    pub fn cancel_all(&mut self) {
        for slot in self.slots.values() {
            if let TileSlot::Loading(img) = slot {
                clear_image_handlers(img);
                img.set_src("");
            }
        }
        self.slots.clear();
        self.queue.clear();
        self.in_flight = 0;
    }

    fn pump(&mut self) {
        while self.in_flight < MAX_CONCURRENCY {
            let Some(coord) = self.queue.pop_front() else {
                break;
            };
            match start_load(coord, tile_url(&self.template, coord), self.notify.clone()) {
                Some(img) => {
                    self.in_flight += 1;
                    self.slots.insert(coord, TileSlot::Loading(img));
                }
                None => {
                    self.slots.insert(coord, TileSlot::Failed);
                }
            }
        }
    }
}

fn start_load(coord: TileCoord, src: String, notify: TileNotify) -> Option<HtmlImageElement> {
    let img = HtmlImageElement::new().ok()?;
    img.set_cross_origin(Some("anonymous"));

    let img_for_load = img.clone();
    let notify_load = notify.clone();
    let onload = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_load);

        let img_for_decode = img_for_load.clone();
        let notify_load = notify_load.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let ok = JsFuture::from(img_for_decode.decode()).await.is_ok();
            notify_load(coord, ok);
        });
    });

    let img_for_error = img.clone();
    let onerror = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_error);
        notify(coord, false);
    });

    let onload_js = onload.into_js_value();
    let onerror_js = onerror.into_js_value();
    img.set_onload(Some(onload_js.unchecked_ref()));
    img.set_onerror(Some(onerror_js.unchecked_ref()));
    let _ = Reflect::set(
        img.as_ref(),
        &JsValue::from_str(ONLOAD_HANDLE_KEY),
        &onload_js,
    );
    let _ = Reflect::set(
        img.as_ref(),
        &JsValue::from_str(ONERROR_HANDLE_KEY),
        &onerror_js,
    );
    img.set_src(&src);
    Some(img)
}

fn clear_image_handlers(img: &HtmlImageElement) {
    img.set_onload(None);
    img.set_onerror(None);
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY));
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY));
}
