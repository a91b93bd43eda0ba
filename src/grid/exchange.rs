//! Halo exchange between patches.
//!
//! The exchange contract is pack → transport → unpack per side: the sender
//! packs its interior boundary strip into a flat buffer, the transport
//! moves it, and the receiver unpacks it into the matching halo region,
//! applying the seam orientation flags. [`LocalExchange`] implements the
//! transport for patches living in the same process; a message-passing
//! transport implements the same trait out of tree. The exchange
//! establishes the happens-before edge from "sender finished its stage" to
//! "receiver begins DSS".

use super::fields::Field3;
use super::patch::GridPatch;
use crate::equations::var;
use crate::error::{ModelError, Result};
use crate::mesh::{Direction, NeighborSpec, PatchConnectivity};

/// Transport filling every patch halo for one state slot.
pub trait HaloExchange {
    /// Fill all halo regions of `patches` for state slot `slot` (both
    /// vertical locations, every component, tracers included).
    fn exchange(
        &self,
        patches: &mut [GridPatch],
        conn: &PatchConnectivity,
        slot: usize,
    ) -> Result<()>;
}

/// Node-index rectangle of one halo (or interior-source) region.
#[derive(Clone, Copy, Debug)]
struct Region {
    i0: usize,
    i1: usize,
    j0: usize,
    j1: usize,
}

impl Region {
    fn len(&self) -> usize {
        (self.i1 - self.i0) * (self.j1 - self.j0)
    }
}

/// Process-local transport: halos are filled by direct buffer copies
/// between patches of the same process.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalExchange;

impl HaloExchange for LocalExchange {
    fn exchange(
        &self,
        patches: &mut [GridPatch],
        conn: &PatchConnectivity,
        slot: usize,
    ) -> Result<()> {
        if conn.n_patches() != patches.len() {
            return Err(ModelError::Configuration(format!(
                "connectivity describes {} patches, grid holds {}",
                conn.n_patches(),
                patches.len()
            )));
        }

        for p in 0..patches.len() {
            // Sides first so that wall corners can mirror side halos
            for dir in [
                Direction::Right,
                Direction::Top,
                Direction::Left,
                Direction::Bottom,
            ] {
                exchange_one_side(patches, conn, slot, p, dir)?;
            }
            for dir in [
                Direction::TopRight,
                Direction::TopLeft,
                Direction::BottomLeft,
                Direction::BottomRight,
            ] {
                exchange_one_side(patches, conn, slot, p, dir)?;
            }
        }

        Ok(())
    }
}

/// Which velocity component is perpendicular to a seam.
fn perpendicular_component(dir: Direction) -> usize {
    match dir {
        Direction::Right | Direction::Left => var::U,
        Direction::Top | Direction::Bottom => var::V,
        // Corner flips are resolved per axis by the caller
        _ => usize::MAX,
    }
}

fn parallel_component(dir: Direction) -> usize {
    match dir {
        Direction::Right | Direction::Left => var::V,
        Direction::Top | Direction::Bottom => var::U,
        _ => usize::MAX,
    }
}

/// Halo region of patch `bx` in direction `dir` (sides cover interior
/// rows/columns only; corners cover the diagonal blocks).
fn halo_region(patch: &GridPatch, dir: Direction) -> Region {
    let bx = &patch.bx;
    let h = bx.halo_elements() * bx.order();
    let (ai0, ai1) = (bx.a_interior_begin(), bx.a_interior_end());
    let (bi0, bi1) = (bx.b_interior_begin(), bx.b_interior_end());

    match dir {
        Direction::Right => Region {
            i0: ai1,
            i1: ai1 + h,
            j0: bi0,
            j1: bi1,
        },
        Direction::Left => Region {
            i0: ai0 - h,
            i1: ai0,
            j0: bi0,
            j1: bi1,
        },
        Direction::Top => Region {
            i0: ai0,
            i1: ai1,
            j0: bi1,
            j1: bi1 + h,
        },
        Direction::Bottom => Region {
            i0: ai0,
            i1: ai1,
            j0: bi0 - h,
            j1: bi0,
        },
        Direction::TopRight => Region {
            i0: ai1,
            i1: ai1 + h,
            j0: bi1,
            j1: bi1 + h,
        },
        Direction::TopLeft => Region {
            i0: ai0 - h,
            i1: ai0,
            j0: bi1,
            j1: bi1 + h,
        },
        Direction::BottomLeft => Region {
            i0: ai0 - h,
            i1: ai0,
            j0: bi0 - h,
            j1: bi0,
        },
        Direction::BottomRight => Region {
            i0: ai1,
            i1: ai1 + h,
            j0: bi0 - h,
            j1: bi0,
        },
    }
}

/// Interior source region on the neighbor that maps onto the receiver's
/// halo region for `dir` (identity Cartesian mapping: the strip adjacent
/// to the opposing side).
fn source_region(neighbor: &GridPatch, dir: Direction) -> Region {
    let bx = &neighbor.bx;
    let h = bx.halo_elements() * bx.order();
    let (ai0, ai1) = (bx.a_interior_begin(), bx.a_interior_end());
    let (bi0, bi1) = (bx.b_interior_begin(), bx.b_interior_end());

    match dir {
        // Receiver's right halo is the neighbor's leftmost interior strip
        Direction::Right => Region {
            i0: ai0,
            i1: ai0 + h,
            j0: bi0,
            j1: bi1,
        },
        Direction::Left => Region {
            i0: ai1 - h,
            i1: ai1,
            j0: bi0,
            j1: bi1,
        },
        Direction::Top => Region {
            i0: ai0,
            i1: ai1,
            j0: bi0,
            j1: bi0 + h,
        },
        Direction::Bottom => Region {
            i0: ai0,
            i1: ai1,
            j0: bi1 - h,
            j1: bi1,
        },
        Direction::TopRight => Region {
            i0: ai0,
            i1: ai0 + h,
            j0: bi0,
            j1: bi0 + h,
        },
        Direction::TopLeft => Region {
            i0: ai1 - h,
            i1: ai1,
            j0: bi0,
            j1: bi0 + h,
        },
        Direction::BottomLeft => Region {
            i0: ai1 - h,
            i1: ai1,
            j0: bi1 - h,
            j1: bi1,
        },
        Direction::BottomRight => Region {
            i0: ai0,
            i1: ai0 + h,
            j0: bi1 - h,
            j1: bi1,
        },
    }
}

/// Pack a region of a field into a flat row-major buffer, per level.
fn pack(field: &Field3, r: Region) -> Vec<f64> {
    let n_k = field.dims().0;
    let mut buf = Vec::with_capacity(n_k * r.len());
    for k in 0..n_k {
        for i in r.i0..r.i1 {
            for j in r.j0..r.j1 {
                buf.push(field.get(k, i, j));
            }
        }
    }
    buf
}

/// Unpack a buffer into a region, optionally negating values and
/// reversing the seam-parallel traversal order.
fn unpack(field: &mut Field3, r: Region, buf: &[f64], negate: bool, reverse_parallel: bool) {
    let n_k = field.dims().0;
    let (ni, nj) = (r.i1 - r.i0, r.j1 - r.j0);
    debug_assert_eq!(buf.len(), n_k * ni * nj);

    let sign = if negate { -1.0 } else { 1.0 };
    for k in 0..n_k {
        for di in 0..ni {
            for dj in 0..nj {
                // The parallel direction is the longer extent of the strip
                let (si, sj) = if reverse_parallel {
                    if ni >= nj {
                        (ni - 1 - di, dj)
                    } else {
                        (di, nj - 1 - dj)
                    }
                } else {
                    (di, dj)
                };
                let v = buf[(k * ni + si) * nj + sj];
                field.set(k, r.i0 + di, r.j0 + dj, sign * v);
            }
        }
    }
}

/// Mirror a same-patch region across one or both walls into the halo.
fn mirror(
    field: &mut Field3,
    dest: Region,
    mirror_i_about: Option<usize>,
    mirror_j_about: Option<usize>,
    negate: bool,
) {
    let n_k = field.dims().0;
    let sign = if negate { -1.0 } else { 1.0 };

    // Gather first: source indices may be read while the halo is written
    let mut src_vals = Vec::with_capacity(n_k * dest.len());
    for k in 0..n_k {
        for i in dest.i0..dest.i1 {
            for j in dest.j0..dest.j1 {
                let si = match mirror_i_about {
                    // Node m past the seam mirrors node m before it
                    Some(seam) => 2 * seam - 1 - i,
                    None => i,
                };
                let sj = match mirror_j_about {
                    Some(seam) => 2 * seam - 1 - j,
                    None => j,
                };
                src_vals.push(field.get(k, si, sj));
            }
        }
    }

    let mut it = src_vals.into_iter();
    for k in 0..n_k {
        for i in dest.i0..dest.i1 {
            for j in dest.j0..dest.j1 {
                let v = it.next().unwrap();
                field.set(k, i, j, sign * v);
            }
        }
    }
}

/// Exchange (or mirror) one side of one patch.
fn exchange_one_side(
    patches: &mut [GridPatch],
    conn: &PatchConnectivity,
    slot: usize,
    p: usize,
    dir: Direction,
) -> Result<()> {
    let spec: NeighborSpec = *conn.neighbor(p, dir);
    let dest = halo_region(&patches[p], dir);

    match spec.patch {
        Some(q) => {
            let src = source_region(&patches[q], dir);
            if src.len() != dest.len() {
                return Err(ModelError::Configuration(format!(
                    "halo/source size mismatch across {dir:?} of patch {p}"
                )));
            }

            let n_c = patches[p].state[slot].node.n_components();
            let n_tr = patches[p].state[slot].tracers.n_components();

            for c in 0..n_c {
                let negate = (spec.switch_perpendicular && c == perpendicular_component(dir))
                    || (spec.switch_parallel && c == parallel_component(dir));

                let buf = pack(patches[q].state[slot].node.comp(c), src);
                unpack(
                    patches[p].state[slot].node.comp_mut(c),
                    dest,
                    &buf,
                    negate,
                    spec.reverse_order,
                );

                let buf = pack(patches[q].state[slot].edge.comp(c), src);
                unpack(
                    patches[p].state[slot].edge.comp_mut(c),
                    dest,
                    &buf,
                    negate,
                    spec.reverse_order,
                );
            }
            for c in 0..n_tr {
                let buf = pack(patches[q].state[slot].tracers.comp(c), src);
                unpack(
                    patches[p].state[slot].tracers.comp_mut(c),
                    dest,
                    &buf,
                    false,
                    spec.reverse_order,
                );
            }
        }
        None => {
            // Reflective wall: mirror the interior, flipping the
            // wall-perpendicular velocity. Corners consult both axes.
            let bx = &patches[p].bx;
            let (mirror_i, flip_u) = match dir {
                Direction::Right | Direction::TopRight | Direction::BottomRight
                    if wall_on(conn, p, Direction::Right) =>
                {
                    (Some(bx.a_interior_end()), true)
                }
                Direction::Left | Direction::TopLeft | Direction::BottomLeft
                    if wall_on(conn, p, Direction::Left) =>
                {
                    (Some(bx.a_interior_begin()), true)
                }
                _ => (None, false),
            };
            let (mirror_j, flip_v) = match dir {
                Direction::Top | Direction::TopRight | Direction::TopLeft
                    if wall_on(conn, p, Direction::Top) =>
                {
                    (Some(bx.b_interior_end()), true)
                }
                Direction::Bottom | Direction::BottomLeft | Direction::BottomRight
                    if wall_on(conn, p, Direction::Bottom) =>
                {
                    (Some(bx.b_interior_begin()), true)
                }
                _ => (None, false),
            };

            if mirror_i.is_none() && mirror_j.is_none() {
                // Corner beyond a periodic seam whose diagonal neighbor is
                // missing cannot occur on a Cartesian patch grid
                return Err(ModelError::Configuration(format!(
                    "no neighbor and no wall across {dir:?} of patch {p}"
                )));
            }

            let n_c = patches[p].state[slot].node.n_components();
            let n_tr = patches[p].state[slot].tracers.n_components();
            let patch = &mut patches[p];

            for c in 0..n_c {
                let negate = (flip_u && c == var::U) || (flip_v && c == var::V);
                mirror(
                    patch.state[slot].node.comp_mut(c),
                    dest,
                    mirror_i,
                    mirror_j,
                    negate,
                );
                mirror(
                    patch.state[slot].edge.comp_mut(c),
                    dest,
                    mirror_i,
                    mirror_j,
                    negate,
                );
            }
            for c in 0..n_tr {
                mirror(
                    patch.state[slot].tracers.comp_mut(c),
                    dest,
                    mirror_i,
                    mirror_j,
                    false,
                );
            }
        }
    }

    Ok(())
}

fn wall_on(conn: &PatchConnectivity, p: usize, dir: Direction) -> bool {
    conn.neighbor(p, dir).patch.is_none()
}
