#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use gloo_net::http::Request;
use medikost_shared::osrm::{OSRM_PROFILE, OSRM_SERVICE_URL, RouteGeometry, parse_route_response, route_url};
use medikost_shared::{GeoPoint, REFERENCE_POINT, RouteBackend, RouteOverlayManager, RouteRequest};
use web_sys::{AbortController, AbortSignal};

use crate::map_surface::{SurfaceId, with_surface};

/// Route overlays drawn on a [`crate::map_surface`] surface with geometry from
/// an OSRM server.
///
/// `create` attaches an empty polyline right away and fetches the geometry in
/// the background; `destroy` aborts that fetch and removes the polyline. A
/// result is dropped unless the owning manager still holds its epoch and the
/// polyline is still attached.
pub struct OsrmRouteBackend {
    owner: SurfaceId,
    service_url: String,
    profile: String,
}

impl OsrmRouteBackend {
    pub fn new(owner: SurfaceId) -> Self {
        Self {
            owner,
            service_url: OSRM_SERVICE_URL.to_string(),
            profile: OSRM_PROFILE.to_string(),
        }
    }
}

pub struct OsrmRoute {
    epoch: u64,
    abort: Option<AbortController>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOverlayError {
    SurfaceGone(SurfaceId),
    NotAttached { surface: SurfaceId, epoch: u64 },
}

impl fmt::Display for RouteOverlayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SurfaceGone(id) => write!(f, "{id} is no longer mounted"),
            Self::NotAttached { surface, epoch } => {
                write!(f, "route {epoch} is not attached to {surface}")
            }
        }
    }
}

impl std::error::Error for RouteOverlayError {}

impl RouteBackend for OsrmRouteBackend {
    type Map = SurfaceId;
    type Route = OsrmRoute;
    type Error = RouteOverlayError;

    fn create(
        &mut self,
        map: &SurfaceId,
        request: &RouteRequest,
    ) -> Result<OsrmRoute, RouteOverlayError> {
        let surface = *map;
        let owner = self.owner;
        let epoch = request.epoch;
        with_surface(surface, |s| s.attach_route(epoch))
            .ok_or(RouteOverlayError::SurfaceGone(surface))?;

        let abort = AbortController::new().ok();
        let signal = abort.as_ref().map(AbortController::signal);
        let url = route_url(&self.service_url, &self.profile, &request.waypoints());

        wasm_bindgen_futures::spawn_local(async move {
            let result = fetch_route(&url, signal.as_ref()).await;
            let still_attached = is_current(owner, epoch)
                && with_surface(surface, |s| s.has_route(epoch)).unwrap_or(false);
            if !still_attached {
                tracing::debug!(%surface, epoch, "discarding route result for removed overlay");
                return;
            }
            match result {
                Ok(geometry) => {
                    tracing::debug!(
                        %surface,
                        epoch,
                        points = geometry.points.len(),
                        distance_m = geometry.distance_m,
                        duration_s = geometry.duration_s,
                        "route geometry received"
                    );
                    with_surface(surface, |s| s.fill_route(epoch, geometry.points));
                }
                Err(e) => tracing::warn!(%surface, epoch, error = %e, "route lookup failed"),
            }
        });

        Ok(OsrmRoute { epoch, abort })
    }

    fn destroy(&mut self, map: &SurfaceId, route: OsrmRoute) -> Result<(), RouteOverlayError> {
        if let Some(abort) = route.abort {
            abort.abort();
        }
        match with_surface(*map, |s| s.detach_route(route.epoch)) {
            Some(true) => Ok(()),
            Some(false) => Err(RouteOverlayError::NotAttached {
                surface: *map,
                epoch: route.epoch,
            }),
            None => Err(RouteOverlayError::SurfaceGone(*map)),
        }
    }
}

async fn fetch_route(url: &str, signal: Option<&AbortSignal>) -> Result<RouteGeometry, String> {
    let resp = Request::get(url)
        .abort_signal(signal)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;
    // OSRM reports NoRoute and friends with a 400 and a JSON body, so the body is
    // decoded regardless of status.
    let body = resp.text().await.map_err(|e| format!("read error: {e}"))?;
    if !resp.ok() && body.trim().is_empty() {
        return Err(format!("HTTP {}", resp.status()));
    }
    parse_route_response(&body).map_err(|e| e.to_string())
}

thread_local! {
    static MANAGERS: RefCell<HashMap<SurfaceId, RouteOverlayManager<OsrmRouteBackend>>> =
        RefCell::new(HashMap::new());
}

/// Start tracking a route for `owner`.
pub fn register(owner: SurfaceId) {
    MANAGERS.with(|managers| {
        managers
            .borrow_mut()
            .entry(owner)
            .or_insert_with(|| RouteOverlayManager::new(OsrmRouteBackend::new(owner)));
    });
}

/// Bring the route owned by `owner` in line with the current map handle and
/// origin. The hospital is always the destination. Owners that were never
/// registered, or already torn down, are ignored.
pub fn sync(owner: SurfaceId, map: Option<SurfaceId>, origin: Option<GeoPoint>) {
    MANAGERS.with(|managers| {
        let Ok(mut managers) = managers.try_borrow_mut() else {
            tracing::warn!(%owner, "route sync re-entered; skipped");
            return;
        };
        let Some(manager) = managers.get_mut(&owner) else {
            tracing::debug!(%owner, "route sync for unknown owner ignored");
            return;
        };
        let transition = manager.sync(map.as_ref(), origin, REFERENCE_POINT);
        tracing::debug!(%owner, ?transition, "route overlay synced");
    });
}

/// Whether the manager for `owner` still holds the route created at `epoch`.
/// False once the owner has been torn down.
fn is_current(owner: SurfaceId, epoch: u64) -> bool {
    MANAGERS.with(|managers| {
        managers
            .try_borrow()
            .ok()
            .and_then(|managers| managers.get(&owner).map(|manager| manager.is_current(epoch)))
            .unwrap_or(false)
    })
}

/// Release the route owned by `owner` for good.
pub fn teardown(owner: SurfaceId) {
    let manager = MANAGERS.with(|managers| managers.borrow_mut().remove(&owner));
    if let Some(mut manager) = manager {
        manager.teardown();
    }
}
