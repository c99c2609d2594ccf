use medikost_shared::GeoPoint;

/// One route polyline; `points` stays empty until the routing result arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteLine {
    pub epoch: u64,
    pub points: Vec<GeoPoint>,
}

/// Polylines attached to a surface, keyed by the epoch of the route that owns
/// them. Geometry for an epoch that is no longer attached is refused.
#[derive(Debug, Default)]
pub struct RouteLines {
    lines: Vec<RouteLine>,
}

impl RouteLines {
    /// Register an empty polyline. Attaching an epoch twice keeps one line.
    pub fn attach(&mut self, epoch: u64) {
        self.lines.retain(|line| line.epoch != epoch);
        self.lines.push(RouteLine {
            epoch,
            points: Vec::new(),
        });
    }

    /// Store geometry for an attached epoch. Returns false when it is gone.
    pub fn fill(&mut self, epoch: u64, points: Vec<GeoPoint>) -> bool {
        match self.lines.iter_mut().find(|line| line.epoch == epoch) {
            Some(line) => {
                line.points = points;
                true
            }
            None => false,
        }
    }

    pub fn detach(&mut self, epoch: u64) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.epoch != epoch);
        self.lines.len() != before
    }

    pub fn contains(&self, epoch: u64) -> bool {
        self.lines.iter().any(|line| line.epoch == epoch)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Lines with enough points to stroke.
    pub fn drawable(&self) -> impl Iterator<Item = &RouteLine> {
        self.lines.iter().filter(|line| line.points.len() >= 2)
    }
}
