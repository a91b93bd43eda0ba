//! Rectangular index space of one grid patch.

use crate::polynomial::gauss_lobatto_points;

/// Index box of a patch: interior element ranges in the global element
/// grid plus a halo ring, with precomputed node and edge coordinates.
///
/// Nodes are stored element by element: element `e` in the alpha direction
/// owns node indices `[e·p, (e+1)·p)` where `p` is the horizontal order.
/// The GLL points of each element include both endpoints, so coincident
/// boundary nodes are stored once per adjacent element and reconciled by
/// direct stiffness summation.
#[derive(Clone, Debug)]
pub struct PatchBox {
    order: usize,
    halo: usize,
    a_elem_begin: usize,
    a_elem_end: usize,
    b_elem_begin: usize,
    b_elem_end: usize,
    delta_a: f64,
    delta_b: f64,
    a_nodes: Vec<f64>,
    b_nodes: Vec<f64>,
    a_edges: Vec<f64>,
    b_edges: Vec<f64>,
}

impl PatchBox {
    /// Build a patch box.
    ///
    /// `a_elem_begin..a_elem_end` is the interior element range in the
    /// global element grid; `a0`/`b0` are the physical coordinates of
    /// global element 0 and `delta_a`/`delta_b` the element widths.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order: usize,
        halo: usize,
        a_elem_begin: usize,
        a_elem_end: usize,
        b_elem_begin: usize,
        b_elem_end: usize,
        a0: f64,
        delta_a: f64,
        b0: f64,
        delta_b: f64,
    ) -> Self {
        let (gll, _) = gauss_lobatto_points(order.max(2), 0.0, 1.0);

        // Node coordinate within element e (in halo-extended coordinates):
        // for order 1 the single node sits at the element midpoint
        let node_offsets: Vec<f64> = if order == 1 {
            vec![0.5]
        } else {
            gll
        };

        let build_nodes = |elem_begin: usize, n_elems: usize, x0: f64, delta: f64| -> Vec<f64> {
            let mut nodes = Vec::with_capacity((n_elems + 2 * halo) * order);
            for e in 0..(n_elems + 2 * halo) {
                // Halo elements sit before the interior range; the global
                // element index may be "negative" and is handled in
                // physical coordinates directly
                let global = elem_begin as f64 + e as f64 - halo as f64;
                for &xi in &node_offsets {
                    nodes.push(x0 + (global + xi) * delta);
                }
            }
            nodes
        };

        let build_edges = |elem_begin: usize, n_elems: usize, x0: f64, delta: f64| -> Vec<f64> {
            (0..=(n_elems + 2 * halo))
                .map(|e| x0 + (elem_begin as f64 + e as f64 - halo as f64) * delta)
                .collect()
        };

        let n_a = a_elem_end - a_elem_begin;
        let n_b = b_elem_end - b_elem_begin;

        Self {
            order,
            halo,
            a_elem_begin,
            a_elem_end,
            b_elem_begin,
            b_elem_end,
            delta_a,
            delta_b,
            a_nodes: build_nodes(a_elem_begin, n_a, a0, delta_a),
            b_nodes: build_nodes(b_elem_begin, n_b, b0, delta_b),
            a_edges: build_edges(a_elem_begin, n_a, a0, delta_a),
            b_edges: build_edges(b_elem_begin, n_b, b0, delta_b),
        }
    }

    /// Horizontal order (nodes per element edge).
    pub fn order(&self) -> usize {
        self.order
    }

    /// Halo width in elements.
    pub fn halo_elements(&self) -> usize {
        self.halo
    }

    /// Interior element count in the alpha direction.
    pub fn element_count_a(&self) -> usize {
        self.a_elem_end - self.a_elem_begin
    }

    /// Interior element count in the beta direction.
    pub fn element_count_b(&self) -> usize {
        self.b_elem_end - self.b_elem_begin
    }

    /// Interior element range in the global element grid.
    pub fn global_elements_a(&self) -> (usize, usize) {
        (self.a_elem_begin, self.a_elem_end)
    }

    /// Interior element range in the global element grid.
    pub fn global_elements_b(&self) -> (usize, usize) {
        (self.b_elem_begin, self.b_elem_end)
    }

    /// Element width in the alpha direction.
    pub fn element_delta_a(&self) -> f64 {
        self.delta_a
    }

    /// Element width in the beta direction.
    pub fn element_delta_b(&self) -> f64 {
        self.delta_b
    }

    /// Total node count (interior + halos) in the alpha direction.
    pub fn a_total_width(&self) -> usize {
        (self.element_count_a() + 2 * self.halo) * self.order
    }

    /// Total node count (interior + halos) in the beta direction.
    pub fn b_total_width(&self) -> usize {
        (self.element_count_b() + 2 * self.halo) * self.order
    }

    /// First interior node index in the alpha direction.
    pub fn a_interior_begin(&self) -> usize {
        self.halo * self.order
    }

    /// One past the last interior node index in the alpha direction.
    pub fn a_interior_end(&self) -> usize {
        self.halo * self.order + self.element_count_a() * self.order
    }

    /// First interior node index in the beta direction.
    pub fn b_interior_begin(&self) -> usize {
        self.halo * self.order
    }

    /// One past the last interior node index in the beta direction.
    pub fn b_interior_end(&self) -> usize {
        self.halo * self.order + self.element_count_b() * self.order
    }

    /// Alpha coordinate of node `i` (halo-extended indexing).
    #[inline]
    pub fn a_node(&self, i: usize) -> f64 {
        self.a_nodes[i]
    }

    /// Beta coordinate of node `j` (halo-extended indexing).
    #[inline]
    pub fn b_node(&self, j: usize) -> f64 {
        self.b_nodes[j]
    }

    /// Alpha coordinate of element edge `e` (halo-extended, `0..=n_elems`).
    #[inline]
    pub fn a_edge(&self, e: usize) -> f64 {
        self.a_edges[e]
    }

    /// Beta coordinate of element edge `e` (halo-extended, `0..=n_elems`).
    #[inline]
    pub fn b_edge(&self, e: usize) -> f64 {
        self.b_edges[e]
    }

    /// Whether node `(i, j)` lies in the patch interior.
    pub fn is_interior(&self, i: usize, j: usize) -> bool {
        i >= self.a_interior_begin()
            && i < self.a_interior_end()
            && j >= self.b_interior_begin()
            && j < self.b_interior_end()
    }

    /// Physical alpha bounds of the patch interior.
    pub fn interior_bounds_a(&self) -> (f64, f64) {
        (
            self.a_edges[self.halo],
            self.a_edges[self.halo + self.element_count_a()],
        )
    }

    /// Physical beta bounds of the patch interior.
    pub fn interior_bounds_b(&self) -> (f64, f64) {
        (
            self.b_edges[self.halo],
            self.b_edges[self.halo + self.element_count_b()],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_box() -> PatchBox {
        // 3x2 elements of order 4, one halo element, unit element width
        PatchBox::new(4, 1, 0, 3, 0, 2, 0.0, 1.0, 0.0, 1.0)
    }

    #[test]
    fn test_widths_and_ranges() {
        let bx = sample_box();
        assert_eq!(bx.a_total_width(), (3 + 2) * 4);
        assert_eq!(bx.b_total_width(), (2 + 2) * 4);
        assert_eq!(bx.a_interior_begin(), 4);
        assert_eq!(bx.a_interior_end(), 16);
        assert_eq!(bx.element_count_a(), 3);
        assert_eq!(bx.element_count_b(), 2);
    }

    #[test]
    fn test_interior_query() {
        let bx = sample_box();
        assert!(bx.is_interior(4, 4));
        assert!(bx.is_interior(15, 11));
        assert!(!bx.is_interior(3, 4), "halo node");
        assert!(!bx.is_interior(16, 4), "halo node");
    }

    #[test]
    fn test_duplicated_boundary_nodes_coincide() {
        let bx = sample_box();
        let p = 4;
        // Last node of interior element 0 and first node of element 1
        let left = bx.a_node(bx.a_interior_begin() + p - 1);
        let right = bx.a_node(bx.a_interior_begin() + p);
        assert!(
            (left - right).abs() < 1e-14,
            "coincident element-edge nodes: {left} vs {right}"
        );
    }

    #[test]
    fn test_halo_coordinates_extend_domain() {
        let bx = sample_box();
        // First halo node lies one element to the left of the interior
        assert!(bx.a_node(0) < bx.a_edge(1));
        assert!((bx.a_edge(0) - (-1.0)).abs() < 1e-14);
        let (a0, a1) = bx.interior_bounds_a();
        assert!((a0 - 0.0).abs() < 1e-14);
        assert!((a1 - 3.0).abs() < 1e-14);
    }

    #[test]
    fn test_order_one_nodes_at_midpoints() {
        let bx = PatchBox::new(1, 1, 0, 4, 0, 1, 0.0, 2.0, 0.0, 2.0);
        assert_eq!(bx.a_total_width(), 6);
        // Interior element 0 spans [0, 2]; its single node is the midpoint
        assert!((bx.a_node(bx.a_interior_begin()) - 1.0).abs() < 1e-14);
    }
}
