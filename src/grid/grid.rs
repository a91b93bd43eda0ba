//! The Cartesian grid: patch arena, shared discretization context and the
//! grid-wide operations of the dynamical core.

use super::exchange::{HaloExchange, LocalExchange};
use super::hbasis::HorizontalBasis;
use super::ops::ColumnOperators;
use super::patch::GridPatch;
use super::state::{VelocityForm, VerticalStaggering};
use super::vertical::{VerticalCoordinate, VerticalStretch};
use crate::column::ColumnBasis;
use crate::equations::EquationSet;
use crate::error::{ModelError, Result};
use crate::mesh::{LateralBoundary, PatchBox, PatchConnectivity};
use crate::physics::PhysicalConstants;
use crate::testcase::TestCase;

/// Everything needed to reconstruct a grid deterministically.
#[derive(Clone, Debug, PartialEq)]
pub struct GridDescriptor {
    /// Domain bounds (x_min, x_max, y_min, y_max, z_min, z_max).
    pub bounds: [f64; 6],
    /// Total element count in the alpha direction.
    pub resolution_a: usize,
    /// Total element count in the beta direction.
    pub resolution_b: usize,
    /// Vertical finite-element count N_v.
    pub n_vertical_elements: usize,
    /// Horizontal order p_h (2..=8).
    pub horizontal_order: usize,
    /// Vertical order p_v.
    pub vertical_order: usize,
    /// Halo width in elements.
    pub halo_elements: usize,
    /// Patch decomposition in the alpha direction.
    pub patches_a: usize,
    /// Patch decomposition in the beta direction.
    pub patches_b: usize,
    /// Vertical staggering mode.
    pub staggering: VerticalStaggering,
    /// Velocity representation.
    pub velocity_form: VelocityForm,
    /// Lateral boundary in the alpha direction.
    pub lateral_a: LateralBoundary,
    /// Lateral boundary in the beta direction.
    pub lateral_b: LateralBoundary,
    /// Reference latitude for the beta plane (radians).
    pub ref_lat: f64,
    /// Identifier of the vertical stretch (persisted alongside the mesh).
    pub stretch_name: String,
    /// Mesh refinement ratio (1 = unrefined; persisted for compatibility).
    pub refinement_ratio: usize,
}

impl GridDescriptor {
    /// A single-patch periodic box with Charney-Phillips staggering and
    /// contravariant velocities; the usual starting point for test cases.
    pub fn periodic_box(
        bounds: [f64; 6],
        resolution_a: usize,
        resolution_b: usize,
        n_vertical_elements: usize,
        horizontal_order: usize,
        vertical_order: usize,
    ) -> Self {
        Self {
            bounds,
            resolution_a,
            resolution_b,
            n_vertical_elements,
            horizontal_order,
            vertical_order,
            halo_elements: 1,
            patches_a: 1,
            patches_b: 1,
            staggering: VerticalStaggering::CharneyPhillips,
            velocity_form: VelocityForm::Contravariant,
            lateral_a: LateralBoundary::Periodic,
            lateral_b: LateralBoundary::Periodic,
            ref_lat: 0.0,
            stretch_name: "uniform".into(),
            refinement_ratio: 1,
        }
    }
}

/// Immutable discretization context shared by all per-patch operators.
pub struct GridContext<'a> {
    pub phys: &'a PhysicalConstants,
    pub eqs: &'a EquationSet,
    pub vertical: &'a VerticalCoordinate,
    pub basis: &'a HorizontalBasis,
    pub ops: &'a ColumnOperators,
    pub staggering: VerticalStaggering,
    pub velocity_form: VelocityForm,
    pub z_top: f64,
}

/// The Cartesian grid: owns the patch arena and all shared immutable
/// discretization context.
pub struct CartesianGrid {
    desc: GridDescriptor,
    phys: PhysicalConstants,
    eqs: EquationSet,
    vertical: VerticalCoordinate,
    stretch: Box<dyn VerticalStretch>,
    basis: HorizontalBasis,
    /// Column operators shared by every column.
    pub column_ops: ColumnOperators,
    conn: PatchConnectivity,
    /// Patch arena; patches address each other by index.
    pub patches: Vec<GridPatch>,
    exchange: Box<dyn HaloExchange>,
}

impl std::fmt::Debug for CartesianGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartesianGrid")
            .field("desc", &self.desc)
            .field("phys", &self.phys)
            .field("eqs", &self.eqs)
            .field("vertical", &self.vertical)
            .field("basis", &self.basis)
            .field("column_ops", &self.column_ops)
            .field("conn", &self.conn)
            .field("patches", &self.patches)
            .finish_non_exhaustive()
    }
}

impl CartesianGrid {
    /// Build the grid and allocate all patch data.
    ///
    /// `n_state_slots` is dictated by the time integration scheme (at
    /// least 4). Fails with a `Configuration` error on an invalid
    /// resolution/order combination.
    pub fn new(
        desc: GridDescriptor,
        phys: PhysicalConstants,
        eqs: EquationSet,
        stretch: Box<dyn VerticalStretch>,
        n_state_slots: usize,
    ) -> Result<Self> {
        if desc.horizontal_order < 2 || desc.horizontal_order > 8 {
            return Err(ModelError::Configuration(format!(
                "horizontal order {} outside the supported range 2..=8",
                desc.horizontal_order
            )));
        }
        if desc.vertical_order < 1 || desc.vertical_order > 8 {
            return Err(ModelError::Configuration(format!(
                "vertical order {} outside the supported range 1..=8",
                desc.vertical_order
            )));
        }
        if desc.resolution_a == 0 || desc.resolution_b == 0 || desc.n_vertical_elements == 0 {
            return Err(ModelError::Configuration(
                "element counts must be positive".into(),
            ));
        }
        if desc.patches_a == 0
            || desc.patches_b == 0
            || desc.resolution_a % desc.patches_a != 0
            || desc.resolution_b % desc.patches_b != 0
        {
            return Err(ModelError::Configuration(format!(
                "resolution {}x{} not divisible into {}x{} patches",
                desc.resolution_a, desc.resolution_b, desc.patches_a, desc.patches_b
            )));
        }
        if desc.halo_elements == 0 {
            return Err(ModelError::Configuration(
                "at least one halo element is required".into(),
            ));
        }
        if desc.bounds[0] >= desc.bounds[1]
            || desc.bounds[2] >= desc.bounds[3]
            || desc.bounds[4] >= desc.bounds[5]
        {
            return Err(ModelError::Configuration(format!(
                "domain bounds are not ordered: {:?}",
                desc.bounds
            )));
        }
        if n_state_slots < 4 {
            return Err(ModelError::Configuration(format!(
                "at least 4 state slots required, got {n_state_slots}"
            )));
        }
        let elems_per_patch_a = desc.resolution_a / desc.patches_a;
        let elems_per_patch_b = desc.resolution_b / desc.patches_b;
        if desc.halo_elements > elems_per_patch_a || desc.halo_elements > elems_per_patch_b {
            return Err(ModelError::Configuration(
                "halo wider than a patch interior".into(),
            ));
        }

        let vertical = VerticalCoordinate::uniform(desc.n_vertical_elements, desc.vertical_order);
        let column_ops = ColumnOperators::new(&vertical)?;
        let basis = HorizontalBasis::new(desc.horizontal_order);

        let delta_a = (desc.bounds[1] - desc.bounds[0]) / desc.resolution_a as f64;
        let delta_b = (desc.bounds[3] - desc.bounds[2]) / desc.resolution_b as f64;

        let conn = PatchConnectivity::cartesian(
            desc.patches_a,
            desc.patches_b,
            desc.lateral_a,
            desc.lateral_b,
        );

        let mut patches = Vec::with_capacity(desc.patches_a * desc.patches_b);
        for pb in 0..desc.patches_b {
            for pa in 0..desc.patches_a {
                let bx = PatchBox::new(
                    desc.horizontal_order,
                    desc.halo_elements,
                    pa * elems_per_patch_a,
                    (pa + 1) * elems_per_patch_a,
                    pb * elems_per_patch_b,
                    (pb + 1) * elems_per_patch_b,
                    desc.bounds[0],
                    delta_a,
                    desc.bounds[2],
                    delta_b,
                );
                patches.push(GridPatch::new(
                    pb * desc.patches_a + pa,
                    bx,
                    vertical.n_levels(),
                    eqs.tracers(),
                    n_state_slots,
                ));
            }
        }

        Ok(Self {
            desc,
            phys,
            eqs,
            vertical,
            stretch,
            basis,
            column_ops,
            conn,
            patches,
            exchange: Box::new(LocalExchange),
        })
    }

    /// Reconstruct a grid from persisted geometry.
    pub fn from_descriptor(
        desc: GridDescriptor,
        phys: PhysicalConstants,
        eqs: EquationSet,
        stretch: Box<dyn VerticalStretch>,
        n_state_slots: usize,
    ) -> Result<Self> {
        if stretch.name() != desc.stretch_name {
            return Err(ModelError::Configuration(format!(
                "descriptor was built with stretch '{}', got '{}'",
                desc.stretch_name,
                stretch.name()
            )));
        }
        Self::new(desc, phys, eqs, stretch, n_state_slots)
    }

    /// Replace the halo transport (e.g. with a message-passing one).
    pub fn set_exchange(&mut self, exchange: Box<dyn HaloExchange>) {
        self.exchange = exchange;
    }

    /// The grid descriptor.
    pub fn descriptor(&self) -> &GridDescriptor {
        &self.desc
    }

    /// Physical constants bundle.
    pub fn phys(&self) -> &PhysicalConstants {
        &self.phys
    }

    /// Equation set.
    pub fn equation_set(&self) -> &EquationSet {
        &self.eqs
    }

    /// Vertical reference coordinate.
    pub fn vertical(&self) -> &VerticalCoordinate {
        &self.vertical
    }

    /// Vertical stretch.
    pub fn stretch(&self) -> &dyn VerticalStretch {
        self.stretch.as_ref()
    }

    /// Horizontal spectral-element basis.
    pub fn basis(&self) -> &HorizontalBasis {
        &self.basis
    }

    /// Model top height.
    pub fn z_top(&self) -> f64 {
        self.desc.bounds[5]
    }

    /// Number of model levels.
    pub fn n_levels(&self) -> usize {
        self.vertical.n_levels()
    }

    /// Number of model interfaces.
    pub fn n_interfaces(&self) -> usize {
        self.vertical.n_interfaces()
    }

    /// Number of state slots per patch.
    pub fn n_state_slots(&self) -> usize {
        self.patches[0].state.len()
    }

    /// Vertical staggering mode.
    pub fn staggering(&self) -> VerticalStaggering {
        self.desc.staggering
    }

    /// Velocity representation.
    pub fn velocity_form(&self) -> VelocityForm {
        self.desc.velocity_form
    }

    /// Evaluate topography, geometric terms, the initial state and the
    /// reference state from the test case into `slot`, then synchronize.
    pub fn evaluate_test_case(
        &mut self,
        test: &dyn TestCase,
        time: f64,
        slot: usize,
    ) -> Result<()> {
        let z_top = self.z_top();
        if (test.get_ztop() - z_top).abs() > 1.0e-10 * z_top.abs().max(1.0) {
            return Err(ModelError::Configuration(format!(
                "test case z_top {} disagrees with domain bound {}",
                test.get_ztop(),
                z_top
            )));
        }
        if test.get_tracer_count() != self.eqs.tracers() {
            return Err(ModelError::Configuration(format!(
                "test case supplies {} tracers, equation set expects {}",
                test.get_tracer_count(),
                self.eqs.tracers()
            )));
        }

        let y_mid = 0.5 * (self.desc.bounds[2] + self.desc.bounds[3]);

        for patch in &mut self.patches {
            patch.evaluate_topography(test, &self.phys, &self.basis, z_top)?;
            patch.evaluate_geometric_terms(
                &self.phys,
                &self.vertical,
                self.stretch.as_ref(),
                &self.basis,
                z_top,
                self.desc.ref_lat,
                y_mid,
            )?;
            patch.evaluate_test_case(
                test,
                &self.phys,
                &self.eqs,
                &self.vertical,
                self.stretch.as_ref(),
                z_top,
                time,
                slot,
            )?;
        }

        self.synchronize(slot)
    }

    /// Fill every patch halo for one state slot.
    pub fn exchange_halos(&mut self, slot: usize) -> Result<()> {
        self.exchange.exchange(&mut self.patches, &self.conn, slot)
    }

    /// Direct stiffness summation over every patch for one state slot.
    /// Halos must be current (see [`Self::exchange_halos`]).
    pub fn apply_dss(&mut self, slot: usize) {
        for patch in &mut self.patches {
            patch.dss_state(slot);
        }
    }

    /// Impose the rigid lid/ground boundary conditions on every patch.
    pub fn apply_boundary_conditions(&mut self, slot: usize) {
        let staggering = self.desc.staggering;
        let form = self.desc.velocity_form;
        for patch in &mut self.patches {
            patch.apply_boundary_conditions(slot, staggering, form);
        }
    }

    /// The full post-stage sequence: halo exchange → DSS → boundary
    /// conditions.
    pub fn synchronize(&mut self, slot: usize) -> Result<()> {
        self.exchange_halos(slot)?;
        self.apply_dss(slot);
        self.apply_boundary_conditions(slot);
        Ok(())
    }

    /// Vorticity and divergence diagnostics from a state slot.
    pub fn compute_vorticity_divergence(&mut self, slot: usize) {
        for patch in &mut self.patches {
            patch.compute_vorticity_divergence(slot, &self.basis);
        }
    }

    /// Split the grid into its immutable discretization context and the
    /// mutable patch arena, so per-patch operators can run while reading
    /// shared context.
    pub fn split_context(&mut self) -> (GridContext<'_>, &mut [GridPatch]) {
        (
            GridContext {
                phys: &self.phys,
                eqs: &self.eqs,
                vertical: &self.vertical,
                basis: &self.basis,
                ops: &self.column_ops,
                staggering: self.desc.staggering,
                velocity_form: self.desc.velocity_form,
                z_top: self.desc.bounds[5],
            },
            &mut self.patches,
        )
    }

    /// Domain integral of `J·q` for one component of a state slot, using
    /// the per-DOF element areas. Used by conservation diagnostics.
    pub fn global_integral(&self, slot: usize, component: usize, loc: ColumnBasis) -> f64 {
        let mut total = 0.0;
        for patch in &self.patches {
            let (field, area) = match loc {
                ColumnBasis::Levels => (
                    patch.state[slot].node.comp(component),
                    &patch.element_area_node,
                ),
                ColumnBasis::Interfaces => (
                    patch.state[slot].edge.comp(component),
                    &patch.element_area_edge,
                ),
            };
            let n_k = field.dims().0;
            for k in 0..n_k {
                for i in patch.bx.a_interior_begin()..patch.bx.a_interior_end() {
                    for j in patch.bx.b_interior_begin()..patch.bx.b_interior_end() {
                        total += area.get(k, i, j) * field.get(k, i, j);
                    }
                }
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::grid::UniformStretch;

    fn try_build(desc: GridDescriptor) -> Result<CartesianGrid> {
        CartesianGrid::new(
            desc,
            PhysicalConstants::earth(),
            EquationSet::new(3, 0).unwrap(),
            Box::new(UniformStretch),
            4,
        )
    }

    fn valid_descriptor() -> GridDescriptor {
        GridDescriptor::periodic_box([0.0, 1000.0, 0.0, 1000.0, 0.0, 1000.0], 4, 4, 4, 4, 2)
    }

    #[test]
    fn test_valid_descriptor_builds() {
        let grid = try_build(valid_descriptor()).unwrap();
        assert_eq!(grid.patches.len(), 1);
        assert_eq!(grid.n_levels(), 8);
        assert_eq!(grid.n_interfaces(), 9);
        assert_eq!(grid.n_state_slots(), 4);
    }

    #[test]
    fn test_invalid_orders_rejected() {
        let mut desc = valid_descriptor();
        desc.horizontal_order = 1;
        let err = try_build(desc).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);

        let mut desc = valid_descriptor();
        desc.horizontal_order = 9;
        assert!(try_build(desc).is_err());

        let mut desc = valid_descriptor();
        desc.vertical_order = 0;
        assert!(try_build(desc).is_err());
    }

    #[test]
    fn test_indivisible_patch_decomposition_rejected() {
        let mut desc = valid_descriptor();
        desc.patches_a = 3;
        let err = try_build(desc).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_unordered_bounds_rejected() {
        let mut desc = valid_descriptor();
        desc.bounds = [0.0, 1000.0, 0.0, 1000.0, 500.0, 500.0];
        assert!(try_build(desc).is_err());
    }

    #[test]
    fn test_descriptor_reconstruction_checks_stretch() {
        let desc = valid_descriptor();
        let err = CartesianGrid::from_descriptor(
            GridDescriptor {
                stretch_name: "tanh".into(),
                ..desc.clone()
            },
            PhysicalConstants::earth(),
            EquationSet::new(3, 0).unwrap(),
            Box::new(UniformStretch),
            4,
        )
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);

        // Matching stretch rebuilds the same mesh
        let grid = CartesianGrid::from_descriptor(
            desc.clone(),
            PhysicalConstants::earth(),
            EquationSet::new(3, 0).unwrap(),
            Box::new(UniformStretch),
            4,
        )
        .unwrap();
        assert_eq!(grid.descriptor(), &desc);
    }

    #[test]
    fn test_too_few_slots_rejected() {
        let err = CartesianGrid::new(
            valid_descriptor(),
            PhysicalConstants::earth(),
            EquationSet::new(3, 0).unwrap(),
            Box::new(UniformStretch),
            3,
        )
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }
}
