use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use web_sys::HtmlImageElement;

use crate::map_surface::SurfaceId;

static ICON_WARNED: AtomicBool = AtomicBool::new(false);

type Waiters = HashMap<SurfaceId, Rc<dyn Fn()>>;

enum IconSlot {
    /// One repaint callback per waiting surface.
    Loading(Waiters),
    Ready(HtmlImageElement),
    Failed,
}

thread_local! {
    static ICONS: RefCell<HashMap<&'static str, IconSlot>> = RefCell::new(HashMap::new());
}

/// Decoded marker image for `url`, shared by every map on the page.
///
/// The first call starts the download; `on_ready` runs once the image has decoded
/// so `owner` can repaint. Later calls from the same owner replace its callback.
/// Returns `None` until then, and forever if the image failed to load, in which
/// case markers fall back to a drawn pin.
pub fn marker_image(
    url: &'static str,
    owner: SurfaceId,
    on_ready: impl Fn() + 'static,
) -> Option<HtmlImageElement> {
    let (image, start_load) =
        ICONS.with(|icons| lookup(&mut icons.borrow_mut(), url, owner, Rc::new(on_ready)));

    if start_load {
        load_icon(url);
    }
    image
}

fn lookup(
    icons: &mut HashMap<&'static str, IconSlot>,
    url: &'static str,
    owner: SurfaceId,
    on_ready: Rc<dyn Fn()>,
) -> (Option<HtmlImageElement>, bool) {
    match icons.get_mut(url) {
        Some(IconSlot::Ready(img)) => (Some(img.clone()), false),
        Some(IconSlot::Failed) => (None, false),
        Some(IconSlot::Loading(waiters)) => {
            waiters.insert(owner, on_ready);
            (None, false)
        }
        None => {
            icons.insert(url, IconSlot::Loading(HashMap::from([(owner, on_ready)])));
            (None, true)
        }
    }
}

fn warn_icon_once(message: &str) {
    if ICON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        tracing::warn!("{message}");
    }
}

fn load_icon(url: &'static str) {
    wasm_bindgen_futures::spawn_local(async move {
        let Ok(image) = HtmlImageElement::new() else {
            settle(url, None);
            warn_icon_once("failed to create marker icon element");
            return;
        };
        image.set_src(url);
        match wasm_bindgen_futures::JsFuture::from(image.decode()).await {
            Ok(_) => settle(url, Some(image)),
            Err(err) => {
                settle(url, None);
                warn_icon_once(&format!("failed to decode marker icon {url}: {err:?}"));
            }
        }
    });
}

fn settle(url: &'static str, image: Option<HtmlImageElement>) {
    let waiters = ICONS.with(|icons| resolve(&mut icons.borrow_mut(), url, image));
    for waiter in waiters.into_values() {
        waiter();
    }
}

fn resolve(
    icons: &mut HashMap<&'static str, IconSlot>,
    url: &'static str,
    image: Option<HtmlImageElement>,
) -> Waiters {
    let slot = match image {
        Some(img) => IconSlot::Ready(img),
        None => IconSlot::Failed,
    };
    match icons.insert(url, slot) {
        Some(IconSlot::Loading(waiters)) => waiters,
        _ => Waiters::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const URL: &str = "/images/house.png";

    fn waiting(icons: &HashMap<&'static str, IconSlot>) -> usize {
        match icons.get(URL) {
            Some(IconSlot::Loading(waiters)) => waiters.len(),
            _ => 0,
        }
    }

    #[test]
    fn repeated_paints_keep_one_waiter_per_surface() {
        let mut icons = HashMap::new();
        let a = SurfaceId::next();
        let b = SurfaceId::next();

        let (image, start) = lookup(&mut icons, URL, a, Rc::new(|| {}));
        assert!(image.is_none());
        assert!(start);

        for _ in 0..50 {
            let (_, start) = lookup(&mut icons, URL, a, Rc::new(|| {}));
            assert!(!start);
        }
        assert_eq!(waiting(&icons), 1);

        lookup(&mut icons, URL, b, Rc::new(|| {}));
        assert_eq!(waiting(&icons), 2);
    }

    #[test]
    fn failed_icon_wakes_each_surface_once_then_stays_failed() {
        let mut icons = HashMap::new();
        let calls = Rc::new(Cell::new(0));
        let owner = SurfaceId::next();
        for _ in 0..3 {
            let calls = calls.clone();
            lookup(&mut icons, URL, owner, Rc::new(move || calls.set(calls.get() + 1)));
        }

        for waiter in resolve(&mut icons, URL, None).into_values() {
            waiter();
        }
        assert_eq!(calls.get(), 1);

        let (image, start) = lookup(&mut icons, URL, owner, Rc::new(|| {}));
        assert!(image.is_none());
        assert!(!start);
        assert_eq!(waiting(&icons), 0);
    }
}
