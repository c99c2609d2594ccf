//! Lifecycle of the single route overlay bound to a mounted map.
//!
//! [`RouteOverlayManager`] is driven by explicit [`RouteOverlayManager::sync`]
//! calls whenever the map handle or the origin changes, and by
//! [`RouteOverlayManager::teardown`] when the owning scope ends. The drawing and
//! routing provider sits behind [`RouteBackend`].

use std::fmt;

use crate::geo::GeoPoint;

/// Display-only configuration handed to the routing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteOptions {
    pub route_while_dragging: bool,
    pub add_waypoints: bool,
    pub show_instructions: bool,
    pub waypoint_markers: bool,
}

impl RouteOptions {
    pub const DISPLAY_ONLY: Self = Self {
        route_while_dragging: false,
        add_waypoints: false,
        show_instructions: false,
        waypoint_markers: false,
    };
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self::DISPLAY_ONLY
    }
}

/// Everything a backend needs to attach one route overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    /// Monotonic creation counter. Asynchronous backends tag their work with it
    /// and check [`RouteOverlayManager::is_current`] before publishing results.
    pub epoch: u64,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub options: RouteOptions,
}

impl RouteRequest {
    /// Waypoints in travel order: origin, then destination.
    pub fn waypoints(&self) -> [GeoPoint; 2] {
        [self.origin, self.destination]
    }
}

/// Creates and releases route overlays on a map surface.
pub trait RouteBackend {
    /// Read-only reference to a mounted map. Equality means "same surface".
    type Map: Clone + PartialEq + fmt::Debug;
    /// Opaque handle to one attached overlay.
    type Route;
    type Error: fmt::Display;

    fn create(&mut self, map: &Self::Map, request: &RouteRequest) -> Result<Self::Route, Self::Error>;

    /// Release `route`. May fail when the map is already gone; the manager
    /// only logs such failures.
    fn destroy(&mut self, map: &Self::Map, route: Self::Route) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Idle,
    Active,
}

/// What a single [`RouteOverlayManager::sync`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Inputs matched the active binding (or stayed invalid); nothing happened.
    Unchanged,
    /// Idle to Active.
    Activated,
    /// Old route released, new one created.
    Replaced,
    /// Route released (or creation failed); now Idle.
    Deactivated,
    /// Teardown already ran; the call was ignored.
    Closed,
}

struct ActiveRoute<B: RouteBackend> {
    map: B::Map,
    origin: GeoPoint,
    destination: GeoPoint,
    epoch: u64,
    route: B::Route,
}

pub struct RouteOverlayManager<B: RouteBackend> {
    backend: B,
    options: RouteOptions,
    active: Option<ActiveRoute<B>>,
    next_epoch: u64,
    closed: bool,
}

impl<B: RouteBackend> RouteOverlayManager<B> {
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, RouteOptions::DISPLAY_ONLY)
    }

    pub fn with_options(backend: B, options: RouteOptions) -> Self {
        Self {
            backend,
            options,
            active: None,
            next_epoch: 1,
            closed: false,
        }
    }

    pub fn state(&self) -> OverlayState {
        if self.active.is_some() {
            OverlayState::Active
        } else {
            OverlayState::Idle
        }
    }

    /// Number of live route resources: always 0 or 1.
    pub fn live_routes(&self) -> usize {
        usize::from(self.active.is_some())
    }

    pub fn active_origin(&self) -> Option<GeoPoint> {
        self.active.as_ref().map(|active| active.origin)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether `epoch` belongs to the route that is attached right now.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.epoch == epoch)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Bring the overlay in line with the current inputs.
    ///
    /// Any difference from the active binding releases the old route before a
    /// new one is created. A missing handle or origin leaves the manager Idle.
    pub fn sync(
        &mut self,
        map: Option<&B::Map>,
        origin: Option<GeoPoint>,
        destination: GeoPoint,
    ) -> Transition {
        if self.closed {
            tracing::debug!("route overlay sync after teardown ignored");
            return Transition::Closed;
        }

        let wanted = match (map, origin) {
            (Some(map), Some(origin)) => Some((map, origin)),
            _ => None,
        };

        if let (Some(active), Some((map, origin))) = (self.active.as_ref(), wanted)
            && active.map == *map
            && active.origin == origin
            && active.destination == destination
        {
            return Transition::Unchanged;
        }

        let released = self.release_active();

        let Some((map, origin)) = wanted else {
            return if released {
                Transition::Deactivated
            } else {
                Transition::Unchanged
            };
        };

        let request = RouteRequest {
            epoch: self.next_epoch,
            origin,
            destination,
            options: self.options,
        };
        self.next_epoch = self.next_epoch.wrapping_add(1);

        match self.backend.create(map, &request) {
            Ok(route) => {
                tracing::debug!(
                    epoch = request.epoch,
                    lat = origin.lat,
                    lng = origin.lng,
                    "route overlay attached"
                );
                self.active = Some(ActiveRoute {
                    map: map.clone(),
                    origin,
                    destination,
                    epoch: request.epoch,
                    route,
                });
                if released {
                    Transition::Replaced
                } else {
                    Transition::Activated
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, ?map, "failed to attach route overlay");
                if released {
                    Transition::Deactivated
                } else {
                    Transition::Unchanged
                }
            }
        }
    }

    /// Release the live route, if any, and refuse further syncs. Safe to call
    /// any number of times.
    pub fn teardown(&mut self) {
        self.release_active();
        self.closed = true;
    }

    fn release_active(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        if let Err(e) = self.backend.destroy(&active.map, active.route) {
            tracing::warn!(
                error = %e,
                map = ?active.map,
                epoch = active.epoch,
                "error removing route overlay"
            );
        }
        true
    }
}

impl<B: RouteBackend> Drop for RouteOverlayManager<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::geo::{Location, validate};
    use crate::markers::REFERENCE_POINT;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create { map: u32, epoch: u64, origin: GeoPoint },
        Destroy { map: u32, epoch: u64 },
    }

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<Call>>,
        live: Cell<i32>,
        max_live: Cell<i32>,
        dead_maps: RefCell<Vec<u32>>,
        fail_create: Cell<bool>,
        requests: RefCell<Vec<RouteRequest>>,
    }

    struct FakeBackend(Rc<Recorder>);

    struct FakeRoute {
        epoch: u64,
    }

    impl RouteBackend for FakeBackend {
        type Map = u32;
        type Route = FakeRoute;
        type Error = String;

        fn create(&mut self, map: &u32, request: &RouteRequest) -> Result<FakeRoute, String> {
            if self.0.fail_create.get() {
                return Err("surface not attached".into());
            }
            self.0.calls.borrow_mut().push(Call::Create {
                map: *map,
                epoch: request.epoch,
                origin: request.origin,
            });
            self.0.requests.borrow_mut().push(*request);
            let live = self.0.live.get() + 1;
            self.0.live.set(live);
            self.0.max_live.set(self.0.max_live.get().max(live));
            Ok(FakeRoute {
                epoch: request.epoch,
            })
        }

        fn destroy(&mut self, map: &u32, route: FakeRoute) -> Result<(), String> {
            self.0.calls.borrow_mut().push(Call::Destroy {
                map: *map,
                epoch: route.epoch,
            });
            self.0.live.set(self.0.live.get() - 1);
            if self.0.dead_maps.borrow().contains(map) {
                return Err(format!("map {map} already removed"));
            }
            Ok(())
        }
    }

    fn manager() -> (RouteOverlayManager<FakeBackend>, Rc<Recorder>) {
        let recorder = Rc::new(Recorder::default());
        (
            RouteOverlayManager::new(FakeBackend(recorder.clone())),
            recorder,
        )
    }

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng)
    }

    fn assert_destroy_precedes_each_later_create(calls: &[Call]) {
        let mut live = 0;
        for call in calls {
            match call {
                Call::Create { .. } => {
                    assert_eq!(live, 0, "create while a route was still live: {calls:?}");
                    live += 1;
                }
                Call::Destroy { .. } => live -= 1,
            }
        }
    }

    #[test]
    fn idle_without_handle_or_origin() {
        let (mut mgr, rec) = manager();
        assert_eq!(mgr.sync(None, Some(point(-6.9, 110.4)), REFERENCE_POINT), Transition::Unchanged);
        assert_eq!(mgr.sync(Some(&1), None, REFERENCE_POINT), Transition::Unchanged);
        assert_eq!(mgr.state(), OverlayState::Idle);
        assert!(rec.calls.borrow().is_empty());
    }

    #[test]
    fn kost_a_creates_one_route_to_the_hospital() {
        let (mut mgr, rec) = manager();
        let origin = validate(&Location::new("-6.9666", "110.4166", "Kost A")).ok();

        assert_eq!(mgr.sync(Some(&7), origin, REFERENCE_POINT), Transition::Activated);
        assert_eq!(mgr.state(), OverlayState::Active);
        assert_eq!(mgr.live_routes(), 1);

        let requests = rec.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].waypoints(),
            [point(-6.9666, 110.4166), point(-6.9942118, 110.4049148)]
        );
        assert_eq!(requests[0].options, RouteOptions::DISPLAY_ONLY);
        assert!(!requests[0].options.route_while_dragging);
        assert!(!requests[0].options.add_waypoints);
        assert!(!requests[0].options.show_instructions);
        assert!(!requests[0].options.waypoint_markers);
    }

    #[test]
    fn kost_b_with_empty_latitude_never_creates_a_route() {
        let (mut mgr, rec) = manager();
        let origin = validate(&Location::new("", "110.4166", "Kost B")).ok();
        assert!(origin.is_none());

        mgr.sync(Some(&1), origin, REFERENCE_POINT);
        mgr.teardown();

        assert!(rec.calls.borrow().is_empty());
        assert_eq!(rec.max_live.get(), 0);
    }

    #[test]
    fn resync_with_same_inputs_is_a_noop() {
        let (mut mgr, rec) = manager();
        let origin = Some(point(-6.97, 110.41));
        mgr.sync(Some(&1), origin, REFERENCE_POINT);
        for _ in 0..3 {
            assert_eq!(mgr.sync(Some(&1), origin, REFERENCE_POINT), Transition::Unchanged);
        }
        assert_eq!(rec.calls.borrow().len(), 1);
    }

    #[test]
    fn origin_change_destroys_before_creating() {
        let (mut mgr, rec) = manager();
        mgr.sync(Some(&1), Some(point(-6.96, 110.41)), REFERENCE_POINT);
        assert_eq!(
            mgr.sync(Some(&1), Some(point(-6.98, 110.42)), REFERENCE_POINT),
            Transition::Replaced
        );

        assert_eq!(
            *rec.calls.borrow(),
            vec![
                Call::Create { map: 1, epoch: 1, origin: point(-6.96, 110.41) },
                Call::Destroy { map: 1, epoch: 1 },
                Call::Create { map: 1, epoch: 2, origin: point(-6.98, 110.42) },
            ]
        );
        assert_eq!(rec.max_live.get(), 1);
        assert_eq!(mgr.active_origin(), Some(point(-6.98, 110.42)));
    }

    #[test]
    fn handle_replacement_rebinds_the_route() {
        let (mut mgr, rec) = manager();
        let origin = Some(point(-6.96, 110.41));
        mgr.sync(Some(&1), origin, REFERENCE_POINT);
        assert_eq!(mgr.sync(Some(&2), origin, REFERENCE_POINT), Transition::Replaced);
        assert_eq!(
            rec.calls.borrow()[1..],
            [
                Call::Destroy { map: 1, epoch: 1 },
                Call::Create { map: 2, epoch: 2, origin: point(-6.96, 110.41) },
            ]
        );
    }

    #[test]
    fn handle_loss_or_invalid_origin_returns_to_idle() {
        let (mut mgr, rec) = manager();
        let origin = Some(point(-6.96, 110.41));
        mgr.sync(Some(&1), origin, REFERENCE_POINT);
        assert_eq!(mgr.sync(None, origin, REFERENCE_POINT), Transition::Deactivated);
        assert_eq!(mgr.state(), OverlayState::Idle);

        mgr.sync(Some(&1), origin, REFERENCE_POINT);
        assert_eq!(mgr.sync(Some(&1), None, REFERENCE_POINT), Transition::Deactivated);
        assert_eq!(mgr.live_routes(), 0);
        assert_eq!(rec.live.get(), 0);
    }

    #[test]
    fn destination_change_also_rebinds() {
        let (mut mgr, _rec) = manager();
        let origin = Some(point(-6.96, 110.41));
        mgr.sync(Some(&1), origin, REFERENCE_POINT);
        assert_eq!(
            mgr.sync(Some(&1), origin, point(-6.99, 110.40)),
            Transition::Replaced
        );
    }

    #[test]
    fn rapid_origin_changes_never_leave_two_routes() {
        let (mut mgr, rec) = manager();
        for step in 0..50 {
            let origin = if step % 7 == 3 {
                None
            } else {
                Some(point(-6.9 - f64::from(step) * 0.001, 110.4))
            };
            let map = if step % 11 == 5 { None } else { Some(1 + step as u32 % 2) };
            mgr.sync(map.as_ref(), origin, REFERENCE_POINT);
            assert!(mgr.live_routes() <= 1);
            assert!((0..=1).contains(&rec.live.get()));
        }
        assert_eq!(rec.max_live.get(), 1);
        assert_destroy_precedes_each_later_create(&rec.calls.borrow());
    }

    #[test]
    fn teardown_releases_active_route_and_is_idempotent() {
        let (mut mgr, rec) = manager();
        mgr.sync(Some(&1), Some(point(-6.96, 110.41)), REFERENCE_POINT);
        mgr.teardown();
        mgr.teardown();
        mgr.teardown();

        assert_eq!(rec.live.get(), 0);
        assert_eq!(mgr.live_routes(), 0);
        let destroys = rec
            .calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, Call::Destroy { .. }))
            .count();
        assert_eq!(destroys, 1);
    }

    #[test]
    fn teardown_from_idle_does_nothing() {
        let (mut mgr, rec) = manager();
        mgr.teardown();
        assert!(rec.calls.borrow().is_empty());
        assert!(mgr.is_closed());
    }

    #[test]
    fn teardown_failure_on_removed_surface_is_swallowed() {
        let (mut mgr, rec) = manager();
        mgr.sync(Some(&4), Some(point(-6.96, 110.41)), REFERENCE_POINT);
        rec.dead_maps.borrow_mut().push(4);

        mgr.teardown();

        assert_eq!(mgr.live_routes(), 0);
        assert_eq!(
            rec.calls.borrow().last(),
            Some(&Call::Destroy { map: 4, epoch: 1 })
        );
    }

    #[test]
    fn failed_release_during_transition_still_creates_the_new_route() {
        let (mut mgr, rec) = manager();
        mgr.sync(Some(&4), Some(point(-6.96, 110.41)), REFERENCE_POINT);
        rec.dead_maps.borrow_mut().push(4);
        assert_eq!(
            mgr.sync(Some(&5), Some(point(-6.96, 110.41)), REFERENCE_POINT),
            Transition::Replaced
        );
        assert_eq!(mgr.live_routes(), 1);
    }

    #[test]
    fn sync_after_teardown_cannot_resurrect_a_route() {
        let (mut mgr, rec) = manager();
        let origin = Some(point(-6.96, 110.41));
        mgr.sync(Some(&1), origin, REFERENCE_POINT);
        mgr.teardown();

        assert_eq!(mgr.sync(Some(&1), origin, REFERENCE_POINT), Transition::Closed);
        assert_eq!(mgr.live_routes(), 0);
        assert_eq!(rec.live.get(), 0);
    }

    #[test]
    fn create_failure_leaves_manager_idle() {
        let (mut mgr, rec) = manager();
        rec.fail_create.set(true);
        assert_eq!(
            mgr.sync(Some(&1), Some(point(-6.96, 110.41)), REFERENCE_POINT),
            Transition::Unchanged
        );
        assert_eq!(mgr.state(), OverlayState::Idle);

        rec.fail_create.set(false);
        assert_eq!(
            mgr.sync(Some(&1), Some(point(-6.96, 110.41)), REFERENCE_POINT),
            Transition::Activated
        );
    }

    #[test]
    fn stale_epochs_are_not_current() {
        let (mut mgr, _rec) = manager();
        mgr.sync(Some(&1), Some(point(-6.96, 110.41)), REFERENCE_POINT);
        assert!(mgr.is_current(1));

        mgr.sync(Some(&1), Some(point(-6.97, 110.41)), REFERENCE_POINT);
        assert!(!mgr.is_current(1));
        assert!(mgr.is_current(2));

        mgr.teardown();
        assert!(!mgr.is_current(2));
    }

    #[test]
    fn switching_from_a_to_b_before_unmount() {
        let (mut mgr, rec) = manager();
        let a = validate(&Location::new("-6.9666", "110.4166", "Kost A")).ok();
        let b = validate(&Location::new("-6.9801", "110.4102", "Kost B")).ok();

        mgr.sync(Some(&1), a, REFERENCE_POINT);
        mgr.sync(Some(&1), b, REFERENCE_POINT);
        drop(mgr);

        let calls = rec.calls.borrow();
        assert_eq!(calls.len(), 4);
        assert!(matches!(calls[1], Call::Destroy { epoch: 1, .. }));
        assert!(matches!(calls[2], Call::Create { epoch: 2, .. }));
        assert!(matches!(calls[3], Call::Destroy { epoch: 2, .. }));
        assert_eq!(rec.max_live.get(), 1);
        assert_eq!(rec.live.get(), 0);
    }
}
