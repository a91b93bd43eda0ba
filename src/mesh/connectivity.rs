//! Patch neighbor descriptors and lateral boundary types.

/// Side or corner of a patch, in the order used by the exchange machinery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Right,
    Top,
    Left,
    Bottom,
    TopRight,
    TopLeft,
    BottomLeft,
    BottomRight,
}

impl Direction {
    /// All eight directions, sides first.
    pub const ALL: [Direction; 8] = [
        Direction::Right,
        Direction::Top,
        Direction::Left,
        Direction::Bottom,
        Direction::TopRight,
        Direction::TopLeft,
        Direction::BottomLeft,
        Direction::BottomRight,
    ];

    /// Stable index of this direction into per-side arrays.
    pub fn index(self) -> usize {
        match self {
            Direction::Right => 0,
            Direction::Top => 1,
            Direction::Left => 2,
            Direction::Bottom => 3,
            Direction::TopRight => 4,
            Direction::TopLeft => 5,
            Direction::BottomLeft => 6,
            Direction::BottomRight => 7,
        }
    }

    /// The direction seen from the other side of the seam. On a Cartesian
    /// grid this is the plain geometric opposite.
    pub fn opposing(self) -> Direction {
        match self {
            Direction::Right => Direction::Left,
            Direction::Top => Direction::Bottom,
            Direction::Left => Direction::Right,
            Direction::Bottom => Direction::Top,
            Direction::TopRight => Direction::BottomLeft,
            Direction::TopLeft => Direction::BottomRight,
            Direction::BottomLeft => Direction::TopRight,
            Direction::BottomRight => Direction::TopLeft,
        }
    }
}

/// Capability set distinguishing grid kinds behind a narrow seam
/// interface: how directions map across a seam and which velocity
/// components flip. The Cartesian kind uses identity mappings throughout;
/// a mapped (cubed-sphere style) kind supplies panel-dependent answers
/// through the same interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridKind {
    Cartesian,
}

impl GridKind {
    /// The direction of the seam as seen from the neighboring patch.
    pub fn opposing_direction(&self, dir: Direction) -> Direction {
        match self {
            GridKind::Cartesian => dir.opposing(),
        }
    }

    /// Seam orientation flags (switch_parallel, switch_perpendicular,
    /// reverse_order) for a connection across `dir`.
    pub fn seam_flags(&self, _dir: Direction) -> (bool, bool, bool) {
        match self {
            GridKind::Cartesian => (false, false, false),
        }
    }
}

/// Lateral boundary treatment of the domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LateralBoundary {
    /// Wrap around to the opposite side of the domain.
    Periodic,
    /// Solid wall: halo values mirror the interior with the perpendicular
    /// velocity component negated.
    Reflective,
}

/// Descriptor of the neighbor across one side of a patch.
///
/// `switch_parallel` and `switch_perpendicular` record velocity-component
/// sign flips under the seam mapping and `reverse_order` whether the
/// neighbor traverses the shared edge in the opposite direction. The
/// Cartesian grid uses identity mappings (all flags false); the flags are
/// exercised by DSS so mapped grids can reuse the same machinery.
#[derive(Clone, Copy, Debug)]
pub struct NeighborSpec {
    /// Index of the neighboring patch, or `None` at a reflective wall.
    pub patch: Option<usize>,
    /// Direction of this side as seen from the owning patch.
    pub direction: Direction,
    /// Flip the seam-parallel velocity component when crossing.
    pub switch_parallel: bool,
    /// Flip the seam-perpendicular velocity component when crossing.
    pub switch_perpendicular: bool,
    /// Neighbor traverses the shared edge in reversed order.
    pub reverse_order: bool,
}

impl NeighborSpec {
    /// An identity-mapping connection to `patch` across `direction`.
    pub fn identity(patch: usize, direction: Direction) -> Self {
        Self {
            patch: Some(patch),
            direction,
            switch_parallel: false,
            switch_perpendicular: false,
            reverse_order: false,
        }
    }

    /// A reflective wall on `direction`: no neighbor, perpendicular
    /// velocity flipped in the mirrored halo.
    pub fn wall(direction: Direction) -> Self {
        Self {
            patch: None,
            direction,
            switch_parallel: false,
            switch_perpendicular: true,
            reverse_order: false,
        }
    }
}

/// Neighbor descriptors for all eight sides of every patch.
#[derive(Clone, Debug, Default)]
pub struct PatchConnectivity {
    sides: Vec<[NeighborSpec; 8]>,
}

impl PatchConnectivity {
    /// Build connectivity for an `np_a × np_b` Cartesian patch grid with
    /// the given lateral boundary treatments. Patch `(pa, pb)` has index
    /// `pb * np_a + pa`.
    pub fn cartesian(
        np_a: usize,
        np_b: usize,
        lateral_a: LateralBoundary,
        lateral_b: LateralBoundary,
    ) -> Self {
        let wrap = |p: isize, n: usize, lateral: LateralBoundary| -> Option<usize> {
            if p >= 0 && (p as usize) < n {
                Some(p as usize)
            } else {
                match lateral {
                    LateralBoundary::Periodic => Some(p.rem_euclid(n as isize) as usize),
                    LateralBoundary::Reflective => None,
                }
            }
        };

        let mut sides = Vec::with_capacity(np_a * np_b);
        for pb in 0..np_b as isize {
            for pa in 0..np_a as isize {
                let mut entry = [NeighborSpec::wall(Direction::Right); 8];
                for dir in Direction::ALL {
                    let (da, db): (isize, isize) = match dir {
                        Direction::Right => (1, 0),
                        Direction::Top => (0, 1),
                        Direction::Left => (-1, 0),
                        Direction::Bottom => (0, -1),
                        Direction::TopRight => (1, 1),
                        Direction::TopLeft => (-1, 1),
                        Direction::BottomLeft => (-1, -1),
                        Direction::BottomRight => (1, -1),
                    };
                    let na = wrap(pa + da, np_a, lateral_a);
                    let nb = wrap(pb + db, np_b, lateral_b);
                    entry[dir.index()] = match (na, nb) {
                        (Some(na), Some(nb)) => {
                            let (parallel, perpendicular, reverse) =
                                GridKind::Cartesian.seam_flags(dir);
                            NeighborSpec {
                                patch: Some(nb * np_a + na),
                                direction: dir,
                                switch_parallel: parallel,
                                switch_perpendicular: perpendicular,
                                reverse_order: reverse,
                            }
                        }
                        _ => NeighborSpec::wall(dir),
                    };
                }
                sides.push(entry);
            }
        }

        Self { sides }
    }

    /// Neighbor of patch `p` across `dir`.
    pub fn neighbor(&self, p: usize, dir: Direction) -> &NeighborSpec {
        &self.sides[p][dir.index()]
    }

    /// Number of patches described.
    pub fn n_patches(&self) -> usize {
        self.sides.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cartesian_kind_uses_identity_mappings() {
        let kind = GridKind::Cartesian;
        for dir in Direction::ALL {
            assert_eq!(kind.opposing_direction(dir), dir.opposing());
            assert_eq!(kind.seam_flags(dir), (false, false, false));
        }
    }

    #[test]
    fn test_opposing_directions() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposing().opposing(), dir);
        }
        assert_eq!(Direction::Right.opposing(), Direction::Left);
        assert_eq!(Direction::TopRight.opposing(), Direction::BottomLeft);
    }

    #[test]
    fn test_periodic_single_patch_wraps_to_self() {
        let conn = PatchConnectivity::cartesian(
            1,
            1,
            LateralBoundary::Periodic,
            LateralBoundary::Periodic,
        );
        for dir in Direction::ALL {
            assert_eq!(conn.neighbor(0, dir).patch, Some(0));
        }
    }

    #[test]
    fn test_reflective_edges_have_walls() {
        let conn = PatchConnectivity::cartesian(
            2,
            1,
            LateralBoundary::Periodic,
            LateralBoundary::Reflective,
        );
        assert_eq!(conn.neighbor(0, Direction::Right).patch, Some(1));
        assert_eq!(conn.neighbor(1, Direction::Right).patch, Some(0), "wraps");
        assert_eq!(conn.neighbor(0, Direction::Top).patch, None);
        assert!(conn.neighbor(0, Direction::Top).switch_perpendicular);
        assert_eq!(conn.neighbor(0, Direction::TopRight).patch, None);
    }

    #[test]
    fn test_two_by_two_interior_connections() {
        let conn = PatchConnectivity::cartesian(
            2,
            2,
            LateralBoundary::Reflective,
            LateralBoundary::Reflective,
        );
        assert_eq!(conn.n_patches(), 4);
        assert_eq!(conn.neighbor(0, Direction::Right).patch, Some(1));
        assert_eq!(conn.neighbor(0, Direction::Top).patch, Some(2));
        assert_eq!(conn.neighbor(0, Direction::TopRight).patch, Some(3));
        assert_eq!(conn.neighbor(3, Direction::BottomLeft).patch, Some(0));
        assert_eq!(conn.neighbor(0, Direction::Left).patch, None);
    }
}
