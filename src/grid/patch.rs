//! One grid patch: per-DOF arrays, metric tensors and the pointwise
//! operations of the dynamical core.
//!
//! Patches are owned by the grid in an arena and addressed by index; all
//! shared context (vertical coordinate, basis, constants) is passed in by
//! reference, so no patch holds a back-reference to its grid.

use super::fields::{Field2, Field3, TensorField3};
use super::hbasis::HorizontalBasis;
use super::state::{StateData, VelocityForm, VerticalStaggering};
use super::vertical::{VerticalCoordinate, VerticalStretch};
use crate::column::ColumnBasis;
use crate::equations::{var, EquationSet};
use crate::error::{ModelError, Result};
use crate::mesh::PatchBox;
use crate::physics::PhysicalConstants;
use crate::polynomial::lagrange_interp_coeffs;
use crate::testcase::TestCase;

/// Per-patch data: coordinates, topography, metric tensors, state slots
/// and diagnostics.
#[derive(Clone, Debug)]
pub struct GridPatch {
    /// Index of this patch in the grid arena.
    pub index: usize,
    /// Index box and halo layout.
    pub bx: PatchBox,

    /// Alpha coordinate of each node.
    pub x: Field2,
    /// Beta coordinate of each node.
    pub y: Field2,
    /// Topography height z_s at each node.
    pub topography: Field2,
    /// ∂_a z_s at each node (interior only).
    pub topo_deriv_a: Field2,
    /// ∂_b z_s at each node (interior only).
    pub topo_deriv_b: Field2,
    /// Coriolis parameter at each node.
    pub coriolis: Field2,

    /// Physical height of model levels.
    pub z_node: Field3,
    /// Physical height of model interfaces.
    pub z_edge: Field3,

    /// 2D horizontal Jacobian (unity on the Cartesian grid).
    pub jacobian2d: Field2,
    /// Pointwise 3D Jacobian on levels.
    pub jacobian_node: Field3,
    /// Pointwise 3D Jacobian on interfaces.
    pub jacobian_edge: Field3,
    /// Quadrature area attached to each level DOF.
    pub element_area_node: Field3,
    /// Quadrature area attached to each interface DOF.
    pub element_area_edge: Field3,

    /// Contravariant metric rows (g^{a·}, g^{b·}, g^{ξ·}) on levels.
    pub contra_a_node: TensorField3,
    pub contra_b_node: TensorField3,
    pub contra_xi_node: TensorField3,
    /// Contravariant metric rows on interfaces.
    pub contra_a_edge: TensorField3,
    pub contra_b_edge: TensorField3,
    pub contra_xi_edge: TensorField3,
    /// Covariant metric rows (g_{a·}, g_{b·}, g_{ξ·}) on levels.
    pub cov_a_node: TensorField3,
    pub cov_b_node: TensorField3,
    pub cov_xi_node: TensorField3,

    /// (∂_a z, ∂_b z, ∂_ξ z) on levels.
    pub deriv_z_node: TensorField3,
    /// (∂_a z, ∂_b z, ∂_ξ z) on interfaces.
    pub deriv_z_edge: TensorField3,

    /// Rayleigh friction strength on levels.
    pub rayleigh_node: Field3,
    /// Rayleigh friction strength on interfaces.
    pub rayleigh_edge: Field3,
    /// Whether the test case supplies Rayleigh friction.
    pub has_rayleigh: bool,

    /// Relative vorticity diagnostic.
    pub vorticity: Field3,
    /// Horizontal divergence diagnostic.
    pub divergence: Field3,

    /// State instances (slots).
    pub state: Vec<StateData>,
    /// Time-independent reference state.
    pub ref_state: StateData,
    /// Whether the reference state has been populated.
    pub has_ref_state: bool,
}

impl GridPatch {
    /// Allocate all per-patch arrays sized to the box and vertical
    /// coordinate. State values are zero until the test case is evaluated.
    pub fn new(
        index: usize,
        bx: PatchBox,
        n_levels: usize,
        n_tracers: usize,
        n_state_slots: usize,
    ) -> Self {
        let n_a = bx.a_total_width();
        let n_b = bx.b_total_width();
        let n_int = n_levels + 1;
        let n_c = crate::equations::N_COMPONENTS;

        let mut x = Field2::zeros(n_a, n_b);
        let mut y = Field2::zeros(n_a, n_b);
        for i in 0..n_a {
            for j in 0..n_b {
                x.set(i, j, bx.a_node(i));
                y.set(i, j, bx.b_node(j));
            }
        }

        Self {
            index,
            x,
            y,
            topography: Field2::zeros(n_a, n_b),
            topo_deriv_a: Field2::zeros(n_a, n_b),
            topo_deriv_b: Field2::zeros(n_a, n_b),
            coriolis: Field2::zeros(n_a, n_b),
            z_node: Field3::zeros(n_levels, n_a, n_b),
            z_edge: Field3::zeros(n_int, n_a, n_b),
            jacobian2d: Field2::zeros(n_a, n_b),
            jacobian_node: Field3::zeros(n_levels, n_a, n_b),
            jacobian_edge: Field3::zeros(n_int, n_a, n_b),
            element_area_node: Field3::zeros(n_levels, n_a, n_b),
            element_area_edge: Field3::zeros(n_int, n_a, n_b),
            contra_a_node: TensorField3::zeros(n_levels, n_a, n_b, 3),
            contra_b_node: TensorField3::zeros(n_levels, n_a, n_b, 3),
            contra_xi_node: TensorField3::zeros(n_levels, n_a, n_b, 3),
            contra_a_edge: TensorField3::zeros(n_int, n_a, n_b, 3),
            contra_b_edge: TensorField3::zeros(n_int, n_a, n_b, 3),
            contra_xi_edge: TensorField3::zeros(n_int, n_a, n_b, 3),
            cov_a_node: TensorField3::zeros(n_levels, n_a, n_b, 3),
            cov_b_node: TensorField3::zeros(n_levels, n_a, n_b, 3),
            cov_xi_node: TensorField3::zeros(n_levels, n_a, n_b, 3),
            deriv_z_node: TensorField3::zeros(n_levels, n_a, n_b, 3),
            deriv_z_edge: TensorField3::zeros(n_int, n_a, n_b, 3),
            rayleigh_node: Field3::zeros(n_levels, n_a, n_b),
            rayleigh_edge: Field3::zeros(n_int, n_a, n_b),
            has_rayleigh: false,
            vorticity: Field3::zeros(n_levels, n_a, n_b),
            divergence: Field3::zeros(n_levels, n_a, n_b),
            state: (0..n_state_slots)
                .map(|_| StateData::zeros(n_c, n_tracers, n_levels, n_a, n_b))
                .collect(),
            ref_state: StateData::zeros(n_c, 0, n_levels, n_a, n_b),
            has_ref_state: false,
            bx,
        }
    }

    /// Sample the test-case topography at every node and differentiate it
    /// with the spectral derivative matrix over each interior element.
    pub fn evaluate_topography(
        &mut self,
        test: &dyn TestCase,
        phys: &PhysicalConstants,
        basis: &HorizontalBasis,
        z_top: f64,
    ) -> Result<()> {
        let n_a = self.bx.a_total_width();
        let n_b = self.bx.b_total_width();

        for i in 0..n_a {
            for j in 0..n_b {
                let zs = test.evaluate_topography(phys, self.x.get(i, j), self.y.get(i, j));
                if zs >= z_top {
                    return Err(ModelError::Configuration(format!(
                        "topography {zs} m at ({}, {}) exceeds the model top {z_top} m",
                        self.x.get(i, j),
                        self.y.get(i, j)
                    )));
                }
                self.topography.set(i, j, zs);
            }
        }

        let p = self.bx.order();
        let delta_a = self.bx.element_delta_a();
        let delta_b = self.bx.element_delta_b();

        for a in 0..self.bx.element_count_a() {
            for b in 0..self.bx.element_count_b() {
                let ea = self.bx.a_interior_begin() + a * p;
                let eb = self.bx.b_interior_begin() + b * p;

                for i in 0..p {
                    for j in 0..p {
                        let mut da_zs = 0.0;
                        let mut db_zs = 0.0;
                        for s in 0..p {
                            da_zs += basis.dx[(s, i)] * self.topography.get(ea + s, eb + j);
                            db_zs += basis.dx[(s, j)] * self.topography.get(ea + i, eb + s);
                        }
                        self.topo_deriv_a.set(ea + i, eb + j, da_zs / delta_a);
                        self.topo_deriv_b.set(ea + i, eb + j, db_zs / delta_b);
                    }
                }
            }
        }

        Ok(())
    }

    /// Evaluate the terrain-following vertical transform and all metric
    /// tensors at both vertical locations over the patch interior.
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate_geometric_terms(
        &mut self,
        phys: &PhysicalConstants,
        vc: &VerticalCoordinate,
        stretch: &dyn VerticalStretch,
        basis: &HorizontalBasis,
        z_top: f64,
        ref_lat: f64,
        y_mid: f64,
    ) -> Result<()> {
        // Normalized-area identities protect against a broken vertical
        // coordinate before any metric term is formed
        let w_node_sum: f64 = vc.w_node.iter().sum();
        if (w_node_sum - 1.0).abs() > 1.0e-13 {
            return Err(ModelError::Geometry(format!(
                "level normalized areas sum to {w_node_sum:.15e}"
            )));
        }
        let w_edge_sum: f64 = vc.w_edge.iter().sum();
        if (w_edge_sum - 1.0).abs() > 1.0e-13 {
            return Err(ModelError::Geometry(format!(
                "interface normalized areas sum to {w_edge_sum:.15e}"
            )));
        }

        // Coriolis parameter on the beta plane
        let f0 = phys.coriolis_f(ref_lat);
        let beta = phys.coriolis_beta(ref_lat);
        let n_a = self.bx.a_total_width();
        let n_b = self.bx.b_total_width();
        for i in 0..n_a {
            for j in 0..n_b {
                self.coriolis
                    .set(i, j, f0 + beta * (self.y.get(i, j) - y_mid));
            }
        }

        let p = self.bx.order();
        let delta_a = self.bx.element_delta_a();
        let delta_b = self.bx.element_delta_b();

        for a in 0..self.bx.element_count_a() {
            for b in 0..self.bx.element_count_b() {
                let ea = self.bx.a_interior_begin() + a * p;
                let eb = self.bx.b_interior_begin() + b * p;

                for i in 0..p {
                    for j in 0..p {
                        let ia = ea + i;
                        let ib = eb + j;

                        let zs = self.topography.get(ia, ib);
                        let da_zs = self.topo_deriv_a.get(ia, ib);
                        let db_zs = self.topo_deriv_b.get(ia, ib);

                        // Cartesian horizontal metric is the identity
                        self.jacobian2d.set(ia, ib, 1.0);

                        for k in 0..vc.n_levels() {
                            let (f, df) = stretch.evaluate(vc.reta_node[k]);
                            self.write_point_metric(
                                MetricLocation::Node,
                                k,
                                ia,
                                ib,
                                zs,
                                da_zs,
                                db_zs,
                                f,
                                df,
                                z_top,
                                basis.weights[i] * delta_a * basis.weights[j] * delta_b
                                    * vc.w_node[k],
                            )?;
                        }

                        for k in 0..vc.n_interfaces() {
                            let (f, df) = stretch.evaluate(vc.reta_edge[k]);
                            self.write_point_metric(
                                MetricLocation::Edge,
                                k,
                                ia,
                                ib,
                                zs,
                                da_zs,
                                db_zs,
                                f,
                                df,
                                z_top,
                                basis.weights[i] * delta_a * basis.weights[j] * delta_b
                                    * vc.w_edge[k],
                            )?;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Gal-Chen and Somerville terrain-following transform and metric at
    /// one point.
    #[allow(clippy::too_many_arguments)]
    fn write_point_metric(
        &mut self,
        loc: MetricLocation,
        k: usize,
        ia: usize,
        ib: usize,
        zs: f64,
        da_zs: f64,
        db_zs: f64,
        f: f64,
        df: f64,
        z_top: f64,
        horizontal_area: f64,
    ) -> Result<()> {
        let z = zs + (z_top - zs) * f;
        let da_z = (1.0 - f) * da_zs;
        let db_z = (1.0 - f) * db_zs;
        let dx_z = (z_top - zs) * df;

        if dx_z <= 0.0 {
            return Err(ModelError::Geometry(format!(
                "vertical transform is not monotone: ∂_ξ z = {dx_z:.6e} at k={k}"
            )));
        }

        let jac2d = self.jacobian2d.get(ia, ib);
        let jac = dx_z * jac2d;
        if jac <= 0.0 {
            return Err(ModelError::Geometry(format!(
                "metric Jacobian non-positive ({jac:.6e}) at k={k}"
            )));
        }

        let ca = [1.0, 0.0, -da_z / dx_z];
        let cb = [0.0, 1.0, -db_z / dx_z];
        let cxi = [
            -da_z / dx_z,
            -db_z / dx_z,
            (1.0 + da_z * da_z + db_z * db_z) / (dx_z * dx_z),
        ];

        match loc {
            MetricLocation::Node => {
                self.z_node.set(k, ia, ib, z);
                self.jacobian_node.set(k, ia, ib, jac);
                self.element_area_node.set(k, ia, ib, jac * horizontal_area);
                for c in 0..3 {
                    self.contra_a_node.set(k, ia, ib, c, ca[c]);
                    self.contra_b_node.set(k, ia, ib, c, cb[c]);
                    self.contra_xi_node.set(k, ia, ib, c, cxi[c]);
                }
                self.cov_a_node.set(k, ia, ib, 0, 1.0 + da_z * da_z);
                self.cov_a_node.set(k, ia, ib, 1, da_z * db_z);
                self.cov_a_node.set(k, ia, ib, 2, da_z * dx_z);
                self.cov_b_node.set(k, ia, ib, 0, db_z * da_z);
                self.cov_b_node.set(k, ia, ib, 1, 1.0 + db_z * db_z);
                self.cov_b_node.set(k, ia, ib, 2, db_z * dx_z);
                self.cov_xi_node.set(k, ia, ib, 0, da_z * dx_z);
                self.cov_xi_node.set(k, ia, ib, 1, db_z * dx_z);
                self.cov_xi_node.set(k, ia, ib, 2, dx_z * dx_z);
                self.deriv_z_node.set(k, ia, ib, 0, da_z);
                self.deriv_z_node.set(k, ia, ib, 1, db_z);
                self.deriv_z_node.set(k, ia, ib, 2, dx_z);
            }
            MetricLocation::Edge => {
                self.z_edge.set(k, ia, ib, z);
                self.jacobian_edge.set(k, ia, ib, jac);
                self.element_area_edge.set(k, ia, ib, jac * horizontal_area);
                for c in 0..3 {
                    self.contra_a_edge.set(k, ia, ib, c, ca[c]);
                    self.contra_b_edge.set(k, ia, ib, c, cb[c]);
                    self.contra_xi_edge.set(k, ia, ib, c, cxi[c]);
                }
                self.deriv_z_edge.set(k, ia, ib, 0, da_z);
                self.deriv_z_edge.set(k, ia, ib, 1, db_z);
                self.deriv_z_edge.set(k, ia, ib, 2, dx_z);
            }
        }

        Ok(())
    }

    /// Populate a state slot (and the reference state) from the test-case
    /// callbacks, converting primitive to conservative components.
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate_test_case(
        &mut self,
        test: &dyn TestCase,
        phys: &PhysicalConstants,
        eqs: &EquationSet,
        vc: &VerticalCoordinate,
        stretch: &dyn VerticalStretch,
        z_top: f64,
        time: f64,
        slot: usize,
    ) -> Result<()> {
        if slot >= self.state.len() {
            return Err(ModelError::Configuration(format!(
                "state slot {slot} out of range ({} allocated)",
                self.state.len()
            )));
        }
        if eqs.dimensionality() == 2 && vc.order != 1 {
            return Err(ModelError::Configuration(
                "2D (xz slice) problems require vertical order 1".into(),
            ));
        }

        let n_a = self.bx.a_total_width();
        let n_b = self.bx.b_total_width();
        let n_c = eqs.components();
        let n_tr = eqs.tracers();

        // Physical heights at every node, halos included, so halo state is
        // well-defined before the first exchange
        for i in 0..n_a {
            for j in 0..n_b {
                let zs = self.topography.get(i, j);
                for k in 0..vc.n_levels() {
                    let (f, _) = stretch.evaluate(vc.reta_node[k]);
                    self.z_node.set(k, i, j, zs + (z_top - zs) * f);
                }
                for k in 0..vc.n_interfaces() {
                    let (f, _) = stretch.evaluate(vc.reta_edge[k]);
                    self.z_edge.set(k, i, j, zs + (z_top - zs) * f);
                }
            }
        }

        // Rayleigh friction strength at both vertical locations
        self.has_rayleigh = test.has_rayleigh_friction();
        if self.has_rayleigh {
            for i in 0..n_a {
                for j in 0..n_b {
                    let (x, y) = (self.x.get(i, j), self.y.get(i, j));
                    for k in 0..vc.n_levels() {
                        self.rayleigh_node.set(
                            k,
                            i,
                            j,
                            test.evaluate_rayleigh_strength(self.z_node.get(k, i, j), x, y),
                        );
                    }
                    for k in 0..vc.n_interfaces() {
                        self.rayleigh_edge.set(
                            k,
                            i,
                            j,
                            test.evaluate_rayleigh_strength(self.z_edge.get(k, i, j), x, y),
                        );
                    }
                }
            }
        }

        self.has_ref_state = test.has_reference_state();

        let mut pointwise = vec![0.0; n_c];
        let mut tracers = vec![0.0; n_tr];

        // Model levels
        for k in 0..vc.n_levels() {
            for i in 0..n_a {
                for j in 0..n_b {
                    let (x, y) = (self.x.get(i, j), self.y.get(i, j));
                    let z = self.z_node.get(k, i, j);

                    test.evaluate_pointwise_state(
                        phys,
                        time,
                        z,
                        x,
                        y,
                        &mut pointwise,
                        &mut tracers,
                    );
                    eqs.primitive_to_conservative(&mut pointwise);
                    for (c, &v) in pointwise.iter().enumerate() {
                        self.state[slot].node.comp_mut(c).set(k, i, j, v);
                    }
                    for (c, &v) in tracers.iter().enumerate() {
                        self.state[slot].tracers.comp_mut(c).set(k, i, j, v);
                    }

                    if self.has_ref_state {
                        test.evaluate_reference_state(phys, z, x, y, &mut pointwise);
                        eqs.primitive_to_conservative(&mut pointwise);
                        for (c, &v) in pointwise.iter().enumerate() {
                            self.ref_state.node.comp_mut(c).set(k, i, j, v);
                        }
                    }
                }
            }
        }

        // Model interfaces
        for k in 0..vc.n_interfaces() {
            for i in 0..n_a {
                for j in 0..n_b {
                    let (x, y) = (self.x.get(i, j), self.y.get(i, j));
                    let z = self.z_edge.get(k, i, j);

                    test.evaluate_pointwise_state(
                        phys,
                        time,
                        z,
                        x,
                        y,
                        &mut pointwise,
                        &mut tracers,
                    );
                    eqs.primitive_to_conservative(&mut pointwise);
                    for (c, &v) in pointwise.iter().enumerate() {
                        self.state[slot].edge.comp_mut(c).set(k, i, j, v);
                    }

                    if self.has_ref_state {
                        test.evaluate_reference_state(phys, z, x, y, &mut pointwise);
                        eqs.primitive_to_conservative(&mut pointwise);
                        for (c, &v) in pointwise.iter().enumerate() {
                            self.ref_state.edge.comp_mut(c).set(k, i, j, v);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Impose no-flow at the rigid ground and lid on the staggering's
    /// w-location over the patch interior.
    ///
    /// At the ground the flow must be tangent to the terrain; at the flat
    /// lid the vertical momentum vanishes.
    pub fn apply_boundary_conditions(
        &mut self,
        slot: usize,
        staggering: VerticalStaggering,
        velocity_form: VelocityForm,
    ) {
        let w_on_edges = staggering.location(var::W) == ColumnBasis::Interfaces;
        let uv_on_edges = staggering.location(var::U) == ColumnBasis::Interfaces;

        let (ai0, ai1) = (self.bx.a_interior_begin(), self.bx.a_interior_end());
        let (bi0, bi1) = (self.bx.b_interior_begin(), self.bx.b_interior_end());

        for i in ai0..ai1 {
            for j in bi0..bi1 {
                let (ru, rv) = if uv_on_edges {
                    (
                        self.state[slot].edge.comp(var::U).get(0, i, j),
                        self.state[slot].edge.comp(var::V).get(0, i, j),
                    )
                } else {
                    (
                        self.state[slot].node.comp(var::U).get(0, i, j),
                        self.state[slot].node.comp(var::V).get(0, i, j),
                    )
                };

                let rw_bottom = match velocity_form {
                    VelocityForm::Contravariant => {
                        // Flow tangent to the terrain: w = u ∂_a z + v ∂_b z
                        let (da_z, db_z) = if w_on_edges {
                            (
                                self.deriv_z_edge.get(0, i, j, 0),
                                self.deriv_z_edge.get(0, i, j, 1),
                            )
                        } else {
                            (
                                self.deriv_z_node.get(0, i, j, 0),
                                self.deriv_z_node.get(0, i, j, 1),
                            )
                        };
                        ru * da_z + rv * db_z
                    }
                    VelocityForm::Covariant => {
                        // w = -(g^{ξa} u_a + g^{ξb} u_b) / (g^{ξξ} ∂_ξ z)
                        let (gxa, gxb, gxx, dx_z) = if w_on_edges {
                            (
                                self.contra_xi_edge.get(0, i, j, 0),
                                self.contra_xi_edge.get(0, i, j, 1),
                                self.contra_xi_edge.get(0, i, j, 2),
                                self.deriv_z_edge.get(0, i, j, 2),
                            )
                        } else {
                            (
                                self.contra_xi_node.get(0, i, j, 0),
                                self.contra_xi_node.get(0, i, j, 1),
                                self.contra_xi_node.get(0, i, j, 2),
                                self.deriv_z_node.get(0, i, j, 2),
                            )
                        };
                        -(gxa * ru + gxb * rv) / (gxx * dx_z)
                    }
                };

                if w_on_edges {
                    let k_top = self.z_edge.dims().0 - 1;
                    self.state[slot]
                        .edge
                        .comp_mut(var::W)
                        .set(0, i, j, rw_bottom);
                    self.state[slot].edge.comp_mut(var::W).set(k_top, i, j, 0.0);
                } else {
                    let k_top = self.z_node.dims().0 - 1;
                    self.state[slot]
                        .node
                        .comp_mut(var::W)
                        .set(0, i, j, rw_bottom);
                    self.state[slot].node.comp_mut(var::W).set(k_top, i, j, 0.0);
                }
            }
        }
    }

    /// Direct stiffness summation over one 3D field: average the
    /// coincident duplicated nodes at every element boundary, halo seams
    /// included. Alpha direction first, then beta; corner copies converge
    /// to the four-way average.
    pub fn dss_field(&self, field: &mut Field3) {
        let p = self.bx.order();
        if p == 1 {
            // Single-node elements share no boundary nodes
            return;
        }

        let (n_k, n_a, n_b) = field.dims();
        let halo = self.bx.halo_elements();

        // Alpha direction: element boundaries at i = e·p - 1 | e·p for
        // e = 1 .. total_elements-1 (halo elements included so the patch
        // seam pairs are averaged against exchanged neighbor data)
        let total_elems_a = self.bx.element_count_a() + 2 * halo;
        for k in 0..n_k {
            for e in 1..total_elems_a {
                let il = e * p - 1;
                let ir = e * p;
                for j in 0..n_b {
                    let avg = 0.5 * (field.get(k, il, j) + field.get(k, ir, j));
                    field.set(k, il, j, avg);
                    field.set(k, ir, j, avg);
                }
            }
        }

        let total_elems_b = self.bx.element_count_b() + 2 * halo;
        for k in 0..n_k {
            for e in 1..total_elems_b {
                let jl = e * p - 1;
                let jr = e * p;
                for i in 0..n_a {
                    let avg = 0.5 * (field.get(k, i, jl) + field.get(k, i, jr));
                    field.set(k, i, jl, avg);
                    field.set(k, i, jr, avg);
                }
            }
        }
    }

    /// Apply DSS to every component of a state slot at both vertical
    /// locations, and to its tracers.
    pub fn dss_state(&mut self, slot: usize) {
        let mut state = std::mem::replace(
            &mut self.state[slot],
            StateData::zeros(0, 0, 0, 0, 0),
        );
        for c in 0..state.node.n_components() {
            self.dss_field(state.node.comp_mut(c));
            self.dss_field(state.edge.comp_mut(c));
        }
        for c in 0..state.tracers.n_components() {
            self.dss_field(state.tracers.comp_mut(c));
        }
        self.state[slot] = state;
    }

    /// Relative vorticity and divergence of the horizontal flow,
    /// ω = (∂_a u_b - ∂_b u_a) / J₂D and
    /// ∇·u = (∂_a(J₂D u^a) + ∂_b(J₂D u^b)) / J₂D,
    /// evaluated with the spectral derivative matrix per element.
    ///
    /// The vorticity numerator differentiates the raw velocity fields;
    /// on the identity Cartesian metric this coincides with the covariant
    /// components.
    pub fn compute_curl_and_div(&mut self, ua: &Field3, ub: &Field3, basis: &HorizontalBasis) {
        let p = self.bx.order();
        let delta_a = self.bx.element_delta_a();
        let delta_b = self.bx.element_delta_b();
        let n_k = ua.dims().0;

        let mut con_ua = vec![0.0; p * p];
        let mut con_ub = vec![0.0; p * p];

        for k in 0..n_k {
            for a in 0..self.bx.element_count_a() {
                for b in 0..self.bx.element_count_b() {
                    let ea = self.bx.a_interior_begin() + a * p;
                    let eb = self.bx.b_interior_begin() + b * p;

                    // Contravariant velocity within the element (identity
                    // 2D metric on the Cartesian grid)
                    for i in 0..p {
                        for j in 0..p {
                            let u = ua.get(k, ea + i, eb + j);
                            let v = ub.get(k, ea + i, eb + j);
                            con_ua[i * p + j] = self.contra_a_node.get(k, ea + i, eb + j, 0) * u
                                + self.contra_a_node.get(k, ea + i, eb + j, 1) * v;
                            con_ub[i * p + j] = self.contra_b_node.get(k, ea + i, eb + j, 0) * u
                                + self.contra_b_node.get(k, ea + i, eb + j, 1) * v;
                        }
                    }

                    for i in 0..p {
                        for j in 0..p {
                            let mut da_jua = 0.0;
                            let mut db_jub = 0.0;
                            let mut da_ub = 0.0;
                            let mut db_ua = 0.0;

                            for s in 0..p {
                                da_jua += basis.dx[(s, i)]
                                    * self.jacobian2d.get(ea + s, eb + j)
                                    * con_ua[s * p + j];
                                db_jub += basis.dx[(s, j)]
                                    * self.jacobian2d.get(ea + i, eb + s)
                                    * con_ub[i * p + s];
                                da_ub += basis.dx[(s, i)] * ub.get(k, ea + s, eb + j);
                                db_ua += basis.dx[(s, j)] * ua.get(k, ea + i, eb + s);
                            }

                            da_jua /= delta_a;
                            db_jub /= delta_b;
                            da_ub /= delta_a;
                            db_ua /= delta_b;

                            let jac = self.jacobian2d.get(ea + i, eb + j);
                            self.vorticity
                                .set(k, ea + i, eb + j, (da_ub - db_ua) / jac);
                            self.divergence
                                .set(k, ea + i, eb + j, (da_jua + db_jub) / jac);
                        }
                    }
                }
            }
        }
    }

    /// Vorticity and divergence of the velocity in a state slot.
    pub fn compute_vorticity_divergence(&mut self, slot: usize, basis: &HorizontalBasis) {
        let rho = self.state[slot].node.comp(var::R).clone();
        let mut ua = self.state[slot].node.comp(var::U).clone();
        let mut ub = self.state[slot].node.comp(var::V).clone();

        // Momenta to velocities
        let (n_k, n_a, n_b) = ua.dims();
        for k in 0..n_k {
            for i in 0..n_a {
                for j in 0..n_b {
                    let r = rho.get(k, i, j);
                    if r != 0.0 {
                        ua.set(k, i, j, ua.get(k, i, j) / r);
                        ub.set(k, i, j, ub.get(k, i, j) / r);
                    }
                }
            }
        }

        self.compute_curl_and_div(&ua, &ub, basis);
    }

    /// Lagrange interpolation of one 3D field at arbitrary (alpha, beta)
    /// points inside the patch interior.
    ///
    /// Returns values shaped (level, point). Points outside the interior
    /// (tolerance 1e-10) are rejected.
    pub fn interpolate_field(
        &self,
        field: &Field3,
        alpha: &[f64],
        beta: &[f64],
    ) -> Result<Vec<Vec<f64>>> {
        if alpha.len() != beta.len() {
            return Err(ModelError::Mesh(
                "point coordinate vectors must have equal length".into(),
            ));
        }

        const EPS: f64 = 1.0e-10;
        let p = self.bx.order();
        let (a_min, a_max) = self.bx.interior_bounds_a();
        let (b_min, b_max) = self.bx.interior_bounds_b();
        let delta_a = self.bx.element_delta_a();
        let delta_b = self.bx.element_delta_b();
        let n_k = field.dims().0;

        let mut result = vec![vec![0.0; alpha.len()]; n_k];

        for (n, (&pa, &pb)) in alpha.iter().zip(beta.iter()).enumerate() {
            if pa < a_min - EPS || pa > a_max + EPS || pb < b_min - EPS || pb > b_max + EPS {
                return Err(ModelError::Mesh(format!(
                    "interpolation point ({pa}, {pb}) outside patch domain \
                     [{a_min}, {a_max}] × [{b_min}, {b_max}]"
                )));
            }

            let ea = (((pa - a_min) / delta_a) as usize).min(self.bx.element_count_a() - 1);
            let eb = (((pb - b_min) / delta_b) as usize).min(self.bx.element_count_b() - 1);

            let ia = self.bx.a_interior_begin() + ea * p;
            let ib = self.bx.b_interior_begin() + eb * p;

            let a_pts: Vec<f64> = (0..p).map(|m| self.bx.a_node(ia + m)).collect();
            let b_pts: Vec<f64> = (0..p).map(|m| self.bx.b_node(ib + m)).collect();
            let a_coeffs = lagrange_interp_coeffs(&a_pts, pa);
            let b_coeffs = lagrange_interp_coeffs(&b_pts, pb);

            for (k, row) in result.iter_mut().enumerate() {
                let mut sum = 0.0;
                for m in 0..p {
                    for q in 0..p {
                        sum += a_coeffs[m] * b_coeffs[q] * field.get(k, ia + m, ib + q);
                    }
                }
                row[n] = sum;
            }
        }

        Ok(result)
    }

    /// Interpolate one state component at arbitrary points, optionally
    /// subtracting the reference state.
    #[allow(clippy::too_many_arguments)]
    pub fn interpolate_state(
        &self,
        slot: usize,
        component: usize,
        loc: ColumnBasis,
        alpha: &[f64],
        beta: &[f64],
        subtract_reference: bool,
    ) -> Result<Vec<Vec<f64>>> {
        let (field, ref_field) = match loc {
            ColumnBasis::Levels => (
                self.state[slot].node.comp(component),
                self.ref_state.node.comp(component),
            ),
            ColumnBasis::Interfaces => (
                self.state[slot].edge.comp(component),
                self.ref_state.edge.comp(component),
            ),
        };

        let mut values = self.interpolate_field(field, alpha, beta)?;
        if subtract_reference && self.has_ref_state {
            let reference = self.interpolate_field(ref_field, alpha, beta)?;
            for (vk, rk) in values.iter_mut().zip(reference.iter()) {
                for (v, r) in vk.iter_mut().zip(rk.iter()) {
                    *v -= r;
                }
            }
        }

        Ok(values)
    }
}

#[derive(Clone, Copy)]
enum MetricLocation {
    Node,
    Edge,
}
