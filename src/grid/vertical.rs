//! Vertical reference coordinate and stretching.
//!
//! The vertical direction is a column of `N_v` finite elements of order
//! `p_v` in the reference coordinate REta ∈ [0, 1]. Levels (the
//! discontinuous basis) sit at the `p_v` Gauss points of each element;
//! interfaces (the continuous basis) at the `p_v + 1` Gauss-Lobatto
//! points, shared at element boundaries. A stretching function maps REta
//! to physical height together with the terrain-following transform.
//!
//! # Available stretching functions
//!
//! - [`UniformStretch`]: identity, equal spacing in REta
//! - [`TanhStretch`]: tanh refinement toward the ground

/// Trait for vertical stretching functions.
///
/// A stretch maps the reference coordinate REta ∈ [0, 1] to a stretched
/// coordinate F(REta) ∈ [0, 1] with F(0) = 0, F(1) = 1 and F' > 0
/// everywhere (the terrain-following transform requires a monotone map).
pub trait VerticalStretch: Send + Sync {
    /// Evaluate the stretch and its derivative: returns (F, dF/dREta).
    fn evaluate(&self, reta: f64) -> (f64, f64);

    /// Human-readable identifier for diagnostics and mesh persistence.
    fn name(&self) -> &'static str;
}

/// Identity stretch: F(REta) = REta.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformStretch;

impl VerticalStretch for UniformStretch {
    fn evaluate(&self, reta: f64) -> (f64, f64) {
        (reta, 1.0)
    }

    fn name(&self) -> &'static str {
        "uniform"
    }
}

/// Tanh stretch clustering levels near the ground.
///
/// F(REta) = 1 + tanh(s·(REta - 1)) / tanh(s), so F' is smallest at
/// REta = 0 (fine spacing near the surface) and largest at REta = 1.
#[derive(Clone, Copy, Debug)]
pub struct TanhStretch {
    /// Sharpness parameter, typically 1-3.
    pub strength: f64,
}

impl Default for TanhStretch {
    fn default() -> Self {
        Self { strength: 2.0 }
    }
}

impl VerticalStretch for TanhStretch {
    fn evaluate(&self, reta: f64) -> (f64, f64) {
        let s = self.strength;
        let f = 1.0 + (s * (reta - 1.0)).tanh() / s.tanh();
        let c = (s * (reta - 1.0)).cosh();
        let df = s / (c * c * s.tanh());
        (f, df)
    }

    fn name(&self) -> &'static str {
        "tanh"
    }
}

/// Vertical reference coordinate: level/interface positions and their
/// normalized quadrature areas.
#[derive(Clone, Debug)]
pub struct VerticalCoordinate {
    /// Finite-element count N_v.
    pub nfe: usize,
    /// Vertical order p_v (levels per element).
    pub order: usize,
    /// Level positions in [0, 1], `nfe · order` values.
    pub reta_node: Vec<f64>,
    /// Interface positions in [0, 1], `nfe · order + 1` values.
    pub reta_edge: Vec<f64>,
    /// Normalized area of each level; sums to 1.
    pub w_node: Vec<f64>,
    /// Normalized area of each interface; sums to 1.
    pub w_edge: Vec<f64>,
}

impl VerticalCoordinate {
    /// Uniform element spacing over [0, 1].
    pub fn uniform(nfe: usize, order: usize) -> Self {
        let element_edges: Vec<f64> = (0..=nfe).map(|a| a as f64 / nfe as f64).collect();
        Self::from_element_edges(order, &element_edges)
    }

    /// Build from explicit element boundary positions (ascending,
    /// spanning [0, 1]).
    pub fn from_element_edges(order: usize, element_edges: &[f64]) -> Self {
        use crate::polynomial::{gauss_lobatto_points, gauss_points};

        let nfe = element_edges.len() - 1;
        let n_lvl = nfe * order;

        let mut reta_node = Vec::with_capacity(n_lvl);
        let mut w_node = Vec::with_capacity(n_lvl);
        let mut reta_edge = Vec::with_capacity(n_lvl + 1);
        let mut w_edge = vec![0.0; n_lvl + 1];

        for a in 0..nfe {
            let (x0, x1) = (element_edges[a], element_edges[a + 1]);

            let (nodes, weights) = gauss_points(order, x0, x1);
            reta_node.extend_from_slice(&nodes);
            w_node.extend_from_slice(&weights);

            let (edges, edge_weights) = gauss_lobatto_points(order + 1, x0, x1);
            for (k, (&x, &w)) in edges.iter().zip(edge_weights.iter()).enumerate() {
                let global = a * order + k;
                if k == 0 && a > 0 {
                    // Shared interface accumulates weight from both sides
                    w_edge[global] += w;
                } else {
                    reta_edge.push(x);
                    w_edge[global] += w;
                }
            }
        }

        Self {
            nfe,
            order,
            reta_node,
            reta_edge,
            w_node,
            w_edge,
        }
    }

    /// Number of model levels.
    pub fn n_levels(&self) -> usize {
        self.reta_node.len()
    }

    /// Number of model interfaces.
    pub fn n_interfaces(&self) -> usize {
        self.reta_edge.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-13;

    #[test]
    fn test_counts() {
        for (nfe, order) in [(4, 1), (6, 2), (3, 4)] {
            let vc = VerticalCoordinate::uniform(nfe, order);
            assert_eq!(vc.n_levels(), nfe * order);
            assert_eq!(vc.n_interfaces(), nfe * order + 1);
        }
    }

    #[test]
    fn test_normalized_areas_sum_to_one() {
        for (nfe, order) in [(4, 1), (8, 2), (5, 3), (3, 4)] {
            let vc = VerticalCoordinate::uniform(nfe, order);
            let node_sum: f64 = vc.w_node.iter().sum();
            let edge_sum: f64 = vc.w_edge.iter().sum();
            assert!(
                (node_sum - 1.0).abs() < TOL,
                "nfe={nfe} order={order}: node areas sum to {node_sum}"
            );
            assert!(
                (edge_sum - 1.0).abs() < TOL,
                "nfe={nfe} order={order}: edge areas sum to {edge_sum}"
            );
        }
    }

    #[test]
    fn test_monotone_and_bounded() {
        let vc = VerticalCoordinate::uniform(5, 3);
        assert!((vc.reta_edge[0]).abs() < TOL);
        assert!((vc.reta_edge[vc.n_interfaces() - 1] - 1.0).abs() < TOL);
        for k in 1..vc.n_levels() {
            assert!(vc.reta_node[k] > vc.reta_node[k - 1]);
        }
        for k in 1..vc.n_interfaces() {
            assert!(vc.reta_edge[k] > vc.reta_edge[k - 1]);
        }
    }

    #[test]
    fn test_levels_interleave_interfaces() {
        let vc = VerticalCoordinate::uniform(4, 2);
        for k in 0..vc.n_levels() {
            assert!(
                vc.reta_node[k] > vc.reta_edge[0] && vc.reta_node[k] < vc.reta_edge[vc.nfe * 2],
            );
        }
    }

    #[test]
    fn test_order_one_matches_finite_volume_layout() {
        let vc = VerticalCoordinate::uniform(4, 1);
        // Levels are element midpoints, interfaces the element boundaries
        for (a, &x) in vc.reta_node.iter().enumerate() {
            assert!((x - (a as f64 + 0.5) / 4.0).abs() < TOL);
        }
        for (a, &x) in vc.reta_edge.iter().enumerate() {
            assert!((x - a as f64 / 4.0).abs() < TOL);
        }
    }

    #[test]
    fn test_stretch_endpoints_and_monotonicity() {
        let stretches: [&dyn VerticalStretch; 2] = [&UniformStretch, &TanhStretch::default()];
        for stretch in stretches {
            let (f0, _) = stretch.evaluate(0.0);
            let (f1, _) = stretch.evaluate(1.0);
            assert!(f0.abs() < 1e-12, "{}: F(0) = {f0}", stretch.name());
            assert!((f1 - 1.0).abs() < 1e-12, "{}: F(1) = {f1}", stretch.name());

            for k in 0..=20 {
                let (_, df) = stretch.evaluate(k as f64 / 20.0);
                assert!(df > 0.0, "{}: dF must be positive", stretch.name());
            }
        }
    }

    #[test]
    fn test_tanh_stretch_refines_near_ground() {
        let stretch = TanhStretch { strength: 2.5 };
        let (_, df_bottom) = stretch.evaluate(0.0);
        let (_, df_top) = stretch.evaluate(1.0);
        assert!(df_bottom < df_top);
    }

    #[test]
    fn test_stretch_derivative_consistency() {
        let stretch = TanhStretch::default();
        let h = 1e-6;
        for k in 1..10 {
            let x = k as f64 / 10.0;
            let (fp, _) = stretch.evaluate(x + h);
            let (fm, _) = stretch.evaluate(x - h);
            let (_, df) = stretch.evaluate(x);
            assert!(((fp - fm) / (2.0 * h) - df).abs() < 1e-8);
        }
    }
}
