//! Shape and enumeration of the polydispersity hypercube.
//!
//! Each dispersed parameter contributes one axis: a 1-D grid of
//! `(value, weight)` pairs stored in the parameter pool. The hypercube is
//! the Cartesian product of the active axes; one *cube point* is a concrete
//! choice of one grid index per axis. Points are enumerated in mixed-radix
//! order with the first axis varying fastest, and the enumeration can be
//! seeded at any linear index, which makes long evaluations resumable in
//! contiguous slices.

use crate::parameters::{ParameterBlock, ParameterPool};

/// Largest number of simultaneously active polydispersity axes.
pub const MAX_PD: usize = 5;

/// One axis of the hypercube: the parameter slot it drives, the grid
/// length, and the shared offset of its values/weights in the pool.
#[derive(Debug, Clone, Copy)]
pub struct PdAxis {
    pub par: usize,
    pub length: usize,
    pub offset: usize,
}

/// Shape of the hypercube of one call.
///
/// Strides and the total evaluation count are derived from the axis list;
/// axes beyond `num_active` have length 1 and are never touched by the
/// enumeration.
#[derive(Debug, Clone)]
pub struct ProblemDetails {
    pd_par: [usize; MAX_PD],
    pd_length: [usize; MAX_PD],
    pd_offset: [usize; MAX_PD],
    pd_stride: [usize; MAX_PD],
    num_eval: usize,
    num_weights: usize,
    num_active: usize,
}

impl ProblemDetails {
    /// Builds the descriptor for the given active axes. `num_weights` is
    /// the total length of the concatenated weight grids in the pool.
    pub fn new(axes: &[PdAxis], num_weights: usize) -> ProblemDetails {
        assert!(
            axes.len() <= MAX_PD,
            "At most {} polydispersity axes are supported, got {}.",
            MAX_PD,
            axes.len()
        );

        let mut pd_par = [0; MAX_PD];
        let mut pd_length = [1; MAX_PD];
        let mut pd_offset = [0; MAX_PD];
        let mut pd_stride = [1; MAX_PD];

        let mut stride = 1;
        for (d, axis) in axes.iter().enumerate() {
            assert!(axis.length > 0, "Empty grid on axis {}.", d);
            assert!(
                axis.offset + axis.length <= num_weights,
                "Grid on axis {} does not fit into the weight pool.",
                d
            );

            pd_par[d] = axis.par;
            pd_length[d] = axis.length;
            pd_offset[d] = axis.offset;
            pd_stride[d] = stride;
            stride *= axis.length;
        }
        // strides of the trailing length-1 axes stay consistent
        for d in axes.len()..MAX_PD {
            pd_stride[d] = stride;
        }

        ProblemDetails {
            pd_par,
            pd_length,
            pd_offset,
            pd_stride,
            num_eval: stride,
            num_weights,
            num_active: axes.len(),
        }
    }

    /// Total number of cube points.
    pub fn num_eval(&self) -> usize {
        self.num_eval
    }

    /// Total length of the concatenated weight grids.
    pub fn num_weights(&self) -> usize {
        self.num_weights
    }

    /// Number of axes with more than the trivial single grid point.
    pub fn num_active(&self) -> usize {
        self.num_active
    }

    pub fn pd_par(&self, d: usize) -> usize {
        self.pd_par[d]
    }

    pub fn pd_length(&self, d: usize) -> usize {
        self.pd_length[d]
    }

    pub fn pd_offset(&self, d: usize) -> usize {
        self.pd_offset[d]
    }

    pub fn pd_stride(&self, d: usize) -> usize {
        self.pd_stride[d]
    }

    /// Writes the grid values selected by `index` into the parameter block.
    pub fn load_values(
        &self,
        pool: &ParameterPool,
        index: &[usize; MAX_PD],
        block: &mut ParameterBlock,
    ) {
        for d in 0..self.num_active {
            let values = pool.pd_value(self.pd_offset[d], self.pd_length[d]);
            block.set(self.pd_par[d], values[index[d]]);
        }
    }
}

/// One enumerated cube point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubePoint {
    /// Grid index per axis.
    pub index: [usize; MAX_PD],
    /// Cumulative weight, the product over the active axes.
    pub weight: f64,
}

/// Enumerates the cube points of a `[pd_start, pd_stop)` slice.
///
/// The iterator carries the per-axis indices and a cache of partial weight
/// products, so seeking to `pd_start` costs one division per axis instead
/// of a replay of the skipped points.
pub struct CubeIter<'a> {
    details: &'a ProblemDetails,
    weights: Vec<&'a [f64]>,
    index: [usize; MAX_PD],
    // partial[d] = product of the weights of axes d.. ; partial[0] is the
    // cumulative weight of the current point, innermost factor last.
    partial: [f64; MAX_PD + 1],
    step: usize,
    stop: usize,
}

impl<'a> CubeIter<'a> {
    pub fn new(
        details: &'a ProblemDetails,
        pool: &ParameterPool<'a>,
        pd_start: usize,
        pd_stop: usize,
    ) -> CubeIter<'a> {
        assert!(
            pd_start <= pd_stop && pd_stop <= details.num_eval(),
            "Invalid cube slice [{}, {}) of {} points.",
            pd_start,
            pd_stop,
            details.num_eval()
        );

        let weights = (0..details.num_active())
            .map(|d| pool.pd_weight(details.pd_offset(d), details.pd_length(d)))
            .collect();

        let mut index = [0; MAX_PD];
        for d in 0..details.num_active() {
            index[d] = (pd_start / details.pd_stride(d)) % details.pd_length(d);
        }

        let mut iter = CubeIter {
            details,
            weights,
            index,
            partial: [1.; MAX_PD + 1],
            step: pd_start,
            stop: pd_stop,
        };
        if iter.details.num_active() > 0 {
            iter.refresh_partial(iter.details.num_active() - 1);
        }
        iter
    }

    /// Recomputes the weight cache for axes `from` down to 0 after their
    /// indices changed.
    fn refresh_partial(&mut self, from: usize) {
        for d in (0..=from).rev() {
            self.partial[d] = self.partial[d + 1] * self.weights[d][self.index[d]];
        }
    }
}

impl<'a> Iterator for CubeIter<'a> {
    type Item = CubePoint;

    fn next(&mut self) -> Option<CubePoint> {
        if self.step >= self.stop {
            return None;
        }

        let point = CubePoint {
            index: self.index,
            weight: self.partial[0],
        };

        // advance the mixed-radix counter, first axis fastest
        self.step += 1;
        let mut d = 0;
        while d < self.details.num_active() {
            self.index[d] += 1;
            if self.index[d] < self.details.pd_length(d) {
                break;
            }
            self.index[d] = 0;
            d += 1;
        }
        if d < self.details.num_active() {
            self.refresh_partial(d);
        }

        Some(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelInfo, OrientationMode};
    use crate::parameters::{ParameterBlock, ParameterPool};

    fn info(num_pars: usize) -> ModelInfo {
        ModelInfo {
            num_pars,
            orientation: OrientationMode::None,
            magnetic_slots: vec![],
        }
    }

    /// Pool with two axes: values [1, 2, 3] / weights [0.2, 0.3, 0.5] on
    /// parameter 0 and values [10, 20] / weights [0.5, 1.5] on parameter 1.
    fn two_axis_pool() -> Vec<f64> {
        let mut values = vec![1., 0., 0., 0.];
        values.extend(&[1., 2., 3., 10., 20.]); // pd values
        values.extend(&[0.2, 0.3, 0.5, 0.5, 1.5]); // pd weights
        values
    }

    fn two_axis_details() -> ProblemDetails {
        ProblemDetails::new(
            &[
                PdAxis {
                    par: 0,
                    length: 3,
                    offset: 0,
                },
                PdAxis {
                    par: 1,
                    length: 2,
                    offset: 3,
                },
            ],
            5,
        )
    }

    #[test]
    fn strides_and_num_eval() {
        let details = two_axis_details();
        assert_eq!(details.num_eval(), 6);
        assert_eq!(details.num_active(), 2);
        assert_eq!(details.pd_stride(0), 1);
        assert_eq!(details.pd_stride(1), 3);
        // trailing axes are trivial
        assert_eq!(details.pd_length(2), 1);
        assert_eq!(details.pd_length(4), 1);
    }

    #[test]
    fn no_active_axes() {
        let details = ProblemDetails::new(&[], 0);
        assert_eq!(details.num_eval(), 1);
        assert_eq!(details.num_active(), 0);

        let info = info(1);
        let values = [1., 0., 42.];
        let pool = ParameterPool::new(&values, &info, 0);

        let points: Vec<_> = CubeIter::new(&details, &pool, 0, 1).collect();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].index, [0; MAX_PD]);
        assert_eq!(points[0].weight, 1.);
    }

    #[test]
    fn mixed_radix_order_and_weights() {
        let info = info(2);
        let values = two_axis_pool();
        let pool = ParameterPool::new(&values, &info, 5);
        let details = two_axis_details();

        let points: Vec<_> = CubeIter::new(&details, &pool, 0, 6).collect();
        assert_eq!(points.len(), 6);

        // first axis fastest
        let indices: Vec<_> = points.iter().map(|p| (p.index[0], p.index[1])).collect();
        assert_eq!(
            indices,
            [(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]
        );

        let w0 = [0.2, 0.3, 0.5];
        let w1 = [0.5, 1.5];
        for p in &points {
            assert_eq!(p.weight, w1[p.index[1]] * w0[p.index[0]]);
        }
    }

    #[test]
    fn seeding_skips_without_replay() {
        let info = info(2);
        let values = two_axis_pool();
        let pool = ParameterPool::new(&values, &info, 5);
        let details = two_axis_details();

        let full: Vec<_> = CubeIter::new(&details, &pool, 0, 6).collect();

        for start in 0..6 {
            let tail: Vec<_> = CubeIter::new(&details, &pool, start, 6).collect();
            assert_eq!(tail.len(), 6 - start);
            for (a, b) in tail.iter().zip(full.iter().skip(start)) {
                assert_eq!(a.index, b.index);
                assert_eq!(a.weight.to_bits(), b.weight.to_bits());
            }
        }
    }

    #[test]
    fn empty_slice_yields_nothing() {
        let info = info(2);
        let values = two_axis_pool();
        let pool = ParameterPool::new(&values, &info, 5);
        let details = two_axis_details();

        assert_eq!(CubeIter::new(&details, &pool, 4, 4).count(), 0);
    }

    #[test]
    fn load_values_writes_driven_slots() {
        let info = info(2);
        let values = two_axis_pool();
        let pool = ParameterPool::new(&values, &info, 5);
        let details = two_axis_details();

        let mut block = ParameterBlock::from_pool(&pool);
        let index = [2, 1, 0, 0, 0];
        details.load_values(&pool, &index, &mut block);
        assert_eq!(block.values(), &[3., 20.]);
    }

    #[test]
    #[should_panic]
    fn too_many_axes() {
        let axis = PdAxis {
            par: 0,
            length: 2,
            offset: 0,
        };
        ProblemDetails::new(&[axis; 6], 12);
    }
}
