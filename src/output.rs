//! Output sampling interface.
//!
//! Builds in-memory output records: per frame, one 3D real array per
//! variable in (k, j, i) order plus axis metadata. File-format writers
//! (NetCDF-shaped) are external collaborators consuming these records;
//! their I/O errors surface unchanged through [`crate::error::ModelError`].

use crate::column::ColumnBasis;
use crate::equations::N_COMPONENTS;
use crate::error::{ModelError, Result};
use crate::grid::CartesianGrid;

/// Axis metadata of one output frame.
#[derive(Clone, Debug)]
pub struct OutputAxes {
    /// Element edge coordinates in x.
    pub x_edges: Vec<f64>,
    /// Element edge coordinates in y.
    pub y_edges: Vec<f64>,
    /// Nominal level heights of the flat reference column.
    pub z_levels: Vec<f64>,
    /// Nominal interface heights of the flat reference column.
    pub z_interfaces: Vec<f64>,
    /// Model time of the frame (s).
    pub time: f64,
}

/// One sampled variable.
#[derive(Clone, Debug)]
pub struct OutputVariable {
    /// Variable name ("U", "V", "Theta", "W", "Rho").
    pub name: &'static str,
    /// Vertical location the values were sampled at.
    pub location: ColumnBasis,
    /// Dimensions (n_k, n_j, n_i).
    pub dims: (usize, usize, usize),
    /// Values in (k, j, i) order, i fastest.
    pub values: Vec<f64>,
}

impl OutputVariable {
    /// Value at (k, j, i).
    pub fn get(&self, k: usize, j: usize, i: usize) -> f64 {
        let (_, n_j, n_i) = self.dims;
        self.values[(k * n_j + j) * n_i + i]
    }
}

/// One output frame: all prognostic variables plus axis metadata.
#[derive(Clone, Debug)]
pub struct OutputFrame {
    pub axes: OutputAxes,
    pub variables: Vec<OutputVariable>,
}

impl OutputFrame {
    /// The variable with the given name.
    pub fn variable(&self, name: &str) -> Option<&OutputVariable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// Output sampling configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct OutputSampler {
    /// Subtract the time-independent reference state.
    pub subtract_reference: bool,
}

const VARIABLE_NAMES: [&str; N_COMPONENTS] = ["U", "V", "Theta", "W", "Rho"];

impl OutputSampler {
    /// Sample every prognostic component of `slot` at its authoritative
    /// vertical location over the full grid.
    pub fn sample(&self, grid: &CartesianGrid, slot: usize, time: f64) -> Result<OutputFrame> {
        let desc = grid.descriptor();
        let p = desc.horizontal_order;
        let n_i = desc.resolution_a * p;
        let n_j = desc.resolution_b * p;

        if slot >= grid.n_state_slots() {
            return Err(ModelError::Configuration(format!(
                "output slot {slot} out of range"
            )));
        }

        let delta_a = (desc.bounds[1] - desc.bounds[0]) / desc.resolution_a as f64;
        let delta_b = (desc.bounds[3] - desc.bounds[2]) / desc.resolution_b as f64;
        let x_edges: Vec<f64> = (0..=desc.resolution_a)
            .map(|e| desc.bounds[0] + e as f64 * delta_a)
            .collect();
        let y_edges: Vec<f64> = (0..=desc.resolution_b)
            .map(|e| desc.bounds[2] + e as f64 * delta_b)
            .collect();

        let z_top = grid.z_top();
        let z_levels: Vec<f64> = grid
            .vertical()
            .reta_node
            .iter()
            .map(|&reta| z_top * grid.stretch().evaluate(reta).0)
            .collect();
        let z_interfaces: Vec<f64> = grid
            .vertical()
            .reta_edge
            .iter()
            .map(|&reta| z_top * grid.stretch().evaluate(reta).0)
            .collect();

        let mut variables = Vec::with_capacity(N_COMPONENTS);
        for c in 0..N_COMPONENTS {
            let location = grid.staggering().location(c);
            let n_k = match location {
                ColumnBasis::Levels => grid.n_levels(),
                ColumnBasis::Interfaces => grid.n_interfaces(),
            };
            let mut values = vec![0.0; n_k * n_j * n_i];

            for patch in &grid.patches {
                let (field, ref_field) = match location {
                    ColumnBasis::Levels => (
                        patch.state[slot].node.comp(c),
                        patch.ref_state.node.comp(c),
                    ),
                    ColumnBasis::Interfaces => (
                        patch.state[slot].edge.comp(c),
                        patch.ref_state.edge.comp(c),
                    ),
                };

                let (ea0, _) = patch.bx.global_elements_a();
                let (eb0, _) = patch.bx.global_elements_b();
                let subtract = self.subtract_reference && patch.has_ref_state;

                for k in 0..n_k {
                    for (li, i) in
                        (patch.bx.a_interior_begin()..patch.bx.a_interior_end()).enumerate()
                    {
                        for (lj, j) in
                            (patch.bx.b_interior_begin()..patch.bx.b_interior_end()).enumerate()
                        {
                            let gi = ea0 * p + li;
                            let gj = eb0 * p + lj;
                            let mut v = field.get(k, i, j);
                            if subtract {
                                v -= ref_field.get(k, i, j);
                            }
                            values[(k * n_j + gj) * n_i + gi] = v;
                        }
                    }
                }
            }

            variables.push(OutputVariable {
                name: VARIABLE_NAMES[c],
                location,
                dims: (n_k, n_j, n_i),
                values,
            });
        }

        Ok(OutputFrame {
            axes: OutputAxes {
                x_edges,
                y_edges,
                z_levels,
                z_interfaces,
                time,
            },
            variables,
        })
    }
}
