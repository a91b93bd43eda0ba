//! State slots and vertical staggering.

use super::fields::Field4;
use crate::column::ColumnBasis;
use crate::equations::var;

/// Vertical placement of the prognostic variables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerticalStaggering {
    /// All variables on model levels.
    Levels,
    /// All variables on model interfaces.
    Interfaces,
    /// w and ρ on interfaces; u, v, θ on levels.
    CharneyPhillips,
}

impl VerticalStaggering {
    /// Authoritative vertical location of component `c`.
    pub fn location(&self, c: usize) -> ColumnBasis {
        match self {
            VerticalStaggering::Levels => ColumnBasis::Levels,
            VerticalStaggering::Interfaces => ColumnBasis::Interfaces,
            VerticalStaggering::CharneyPhillips => match c {
                var::W | var::R => ColumnBasis::Interfaces,
                _ => ColumnBasis::Levels,
            },
        }
    }
}

/// Runtime choice of velocity representation.
///
/// The representations coincide on the identity Cartesian metric but the
/// no-flow boundary condition contracts the metric differently; both paths
/// enforce zero normal flow at the ground.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VelocityForm {
    /// Contravariant components u^a (default).
    Contravariant,
    /// Covariant components u_a.
    Covariant,
}

/// One state instance: a node-resident field, an edge-resident field and
/// per-instance tracers.
///
/// Every component is allocated at both vertical locations; the staggering
/// decides which copy is authoritative and the column operators move data
/// between them.
#[derive(Clone, Debug)]
pub struct StateData {
    /// Node-resident field (components × levels × ia × ib).
    pub node: Field4,
    /// Edge-resident field (components × interfaces × ia × ib).
    pub edge: Field4,
    /// Node-resident tracers (tracers × levels × ia × ib).
    pub tracers: Field4,
}

impl StateData {
    pub fn zeros(
        n_components: usize,
        n_tracers: usize,
        n_levels: usize,
        n_a: usize,
        n_b: usize,
    ) -> Self {
        Self {
            node: Field4::zeros(n_components, n_levels, n_a, n_b),
            edge: Field4::zeros(n_components, n_levels + 1, n_a, n_b),
            tracers: Field4::zeros(n_tracers, n_levels, n_a, n_b),
        }
    }

    /// x ← c·x over all fields.
    pub fn scale(&mut self, c: f64) {
        self.node.scale(c);
        self.edge.scale(c);
        self.tracers.scale(c);
    }

    /// x ← x + c·y over all fields.
    pub fn axpy(&mut self, c: f64, other: &StateData) {
        self.node.axpy(c, &other.node);
        self.edge.axpy(c, &other.edge);
        self.tracers.axpy(c, &other.tracers);
    }

    /// Copy all values from `other`.
    pub fn copy_from(&mut self, other: &StateData) {
        self.node.copy_from(&other.node);
        self.edge.copy_from(&other.edge);
        self.tracers.copy_from(&other.tracers);
    }

    pub fn fill(&mut self, value: f64) {
        self.node.fill(value);
        self.edge.fill(value);
        self.tracers.fill(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staggering_locations() {
        let cp = VerticalStaggering::CharneyPhillips;
        assert_eq!(cp.location(var::U), ColumnBasis::Levels);
        assert_eq!(cp.location(var::T), ColumnBasis::Levels);
        assert_eq!(cp.location(var::W), ColumnBasis::Interfaces);
        assert_eq!(cp.location(var::R), ColumnBasis::Interfaces);

        let lev = VerticalStaggering::Levels;
        for c in 0..5 {
            assert_eq!(lev.location(c), ColumnBasis::Levels);
        }
    }

    #[test]
    fn test_state_axpy_covers_both_locations() {
        let mut x = StateData::zeros(5, 1, 4, 3, 3);
        let mut y = StateData::zeros(5, 1, 4, 3, 3);
        y.node.comp_mut(var::T).set(0, 0, 0, 2.0);
        y.edge.comp_mut(var::W).set(4, 2, 2, -4.0);
        y.tracers.comp_mut(0).set(1, 1, 1, 8.0);

        x.axpy(0.25, &y);
        assert_eq!(x.node.comp(var::T).get(0, 0, 0), 0.5);
        assert_eq!(x.edge.comp(var::W).get(4, 2, 2), -1.0);
        assert_eq!(x.tracers.comp(0).get(1, 1, 1), 2.0);
    }
}
