//! Driver folding model evaluations over the polydispersity hypercube.
//!
//! The outer loop over cube points is strictly sequential: the parameter
//! block is shared mutable scratch and the weight accumulator advances with
//! the enumeration. The inner loop over the `q` batch fans out over rayon;
//! every `result[k]` slot is owned by exactly one worker per cube point, so
//! the accumulation stays bitwise reproducible for a fixed slice partition.
//!
//! A call covers the half-open slice `[pd_start, pd_stop)`. With
//! `pd_start = 0` the result buffer is zeroed first; otherwise accumulation
//! continues on the caller's buffer, which makes long evaluations
//! interruptible at slice boundaries (see [`Snapshot`]).

// Move unit test into own file
#[cfg(test)]
#[path = "./integrator_test.rs"]
mod integrator_test;

use crate::magnetic::CrossSections;
use crate::model::{AsymmetricModel, Model, ModelInfo, OrientationMode, RadialModel,
                   SymmetricModel};
use crate::orientation::{QabcRotation, QacRotation};
use crate::parameters::{ParameterBlock, ParameterPool};
use crate::polydispersity::{CubeIter, ProblemDetails};
use crate::QPoint;
use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};

/// Captures a partially accumulated evaluation between two slices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Result buffer after the last completed slice, `nq + 1` slots.
    pub result: Vec<f64>,
    /// First cube point not yet evaluated.
    pub pd_start: usize,
}

/// Bundles one model with the shape of its evaluation.
pub struct Integrator<'a, M> {
    model: &'a M,
    info: &'a ModelInfo,
    details: &'a ProblemDetails,
}

impl<'a, M: Model> Integrator<'a, M> {
    pub fn new(model: &'a M, info: &'a ModelInfo, details: &'a ProblemDetails) -> Integrator<'a, M> {
        Integrator {
            model,
            info,
            details,
        }
    }

    /// Walks the cube slice, applying the cutoff and invalid-point policies
    /// and maintaining the weight-volume denominator in `result[nq]`;
    /// `per_point` folds one evaluated cube point into `result[0..nq]`.
    fn fold<F>(
        &self,
        pool: &ParameterPool,
        pd_start: usize,
        pd_stop: usize,
        cutoff: f64,
        nq: usize,
        result: &mut [f64],
        mut per_point: F,
    ) where
        F: FnMut(&mut ParameterBlock, f64, &mut [f64]),
    {
        assert_eq!(
            result.len(),
            nq + 1,
            "Result buffer must hold one slot per q point plus the denominator."
        );

        if pd_start == 0 {
            for r in result.iter_mut() {
                *r = 0.;
            }
        }

        let (intensity, tail) = result.split_at_mut(nq);
        let mut pd_norm = tail[0];

        let mut local = ParameterBlock::from_pool(pool);
        for point in CubeIter::new(self.details, pool, pd_start, pd_stop) {
            if point.weight <= cutoff {
                continue;
            }
            self.details.load_values(pool, &point.index, &mut local);
            if self.model.invalid(local.values()) {
                continue;
            }
            pd_norm += point.weight * self.model.form_volume(local.values());
            per_point(&mut local, point.weight, &mut intensity[..]);
        }

        tail[0] = pd_norm;
    }

    fn pool<'v>(&self, values: &'v [f64]) -> ParameterPool<'v>
    where
        'a: 'v,
    {
        ParameterPool::new(values, self.info, self.details.num_weights())
    }
}

impl<'a, M: RadialModel> Integrator<'a, M> {
    /// 1-D evaluation at scalar `|q|` values. Never magnetic.
    pub fn radial(
        &self,
        q: &[f64],
        values: &[f64],
        pd_start: usize,
        pd_stop: usize,
        cutoff: f64,
        result: &mut [f64],
    ) {
        assert_eq!(self.info.orientation, OrientationMode::None);
        assert!(
            !self.info.is_magnetic(),
            "1-D evaluation carries no magnetic dressing."
        );
        let pool = self.pool(values);

        self.fold(&pool, pd_start, pd_stop, cutoff, q.len(), result, |local, weight, out| {
            q.par_iter().zip(out.par_iter_mut()).for_each(|(&qk, r)| {
                *r += weight * self.model.iq(qk, local.values());
            });
        });
    }

    /// Unoriented 2-D evaluation, `iq(|q|)` per detector point, with the
    /// magnetic cross-section mixing when the model carries magnetic slots.
    pub fn unoriented(
        &self,
        q: &[QPoint],
        values: &[f64],
        pd_start: usize,
        pd_stop: usize,
        cutoff: f64,
        result: &mut [f64],
    ) {
        assert_eq!(self.info.orientation, OrientationMode::None);
        let pool = self.pool(values);

        if self.info.is_magnetic() {
            let xs = CrossSections::new(&pool);
            self.fold(&pool, pd_start, pd_stop, cutoff, q.len(), result, |local, weight, out| {
                let template: &ParameterBlock = local;
                q.par_iter().zip(out.par_iter_mut()).for_each_init(
                    || template.clone(),
                    |scratch, (qp, r)| {
                        let q_abs = qp.norm();
                        *r += weight
                            * xs.scattering(&pool, qp.x, qp.y, scratch, |pars| {
                                self.model.iq(q_abs, pars)
                            });
                    },
                );
            });
        } else {
            self.fold(&pool, pd_start, pd_stop, cutoff, q.len(), result, |local, weight, out| {
                q.par_iter().zip(out.par_iter_mut()).for_each(|(qp, r)| {
                    *r += weight * self.model.iq(qp.norm(), local.values());
                });
            });
        }
    }
}

impl<'a, M: SymmetricModel> Integrator<'a, M> {
    /// Oriented evaluation of a model symmetric about its `c` axis. The
    /// mean angles are read from the pool, the jitter from the block.
    pub fn symmetric(
        &self,
        q: &[QPoint],
        values: &[f64],
        pd_start: usize,
        pd_stop: usize,
        cutoff: f64,
        result: &mut [f64],
    ) {
        let theta_par = match self.info.orientation {
            OrientationMode::Symmetric { theta_par } => theta_par,
            mode => panic!("Symmetric evaluation of a model with orientation {:?}.", mode),
        };
        let pool = self.pool(values);
        let theta = pool.parameter(theta_par);
        let phi = pool.parameter(theta_par + 1);

        if self.info.is_magnetic() {
            let xs = CrossSections::new(&pool);
            self.fold(&pool, pd_start, pd_stop, cutoff, q.len(), result, |local, weight, out| {
                let jitter = local.values();
                let rot = QacRotation::new(theta, phi, jitter[theta_par], jitter[theta_par + 1]);
                let template: &ParameterBlock = local;
                q.par_iter().zip(out.par_iter_mut()).for_each_init(
                    || template.clone(),
                    |scratch, (qp, r)| {
                        let (qab, qc) = rot.apply(qp.x, qp.y);
                        *r += weight
                            * xs.scattering(&pool, qp.x, qp.y, scratch, |pars| {
                                self.model.iqac(qab, qc, pars)
                            });
                    },
                );
            });
        } else {
            self.fold(&pool, pd_start, pd_stop, cutoff, q.len(), result, |local, weight, out| {
                let jitter = local.values();
                let rot = QacRotation::new(theta, phi, jitter[theta_par], jitter[theta_par + 1]);
                q.par_iter().zip(out.par_iter_mut()).for_each(|(qp, r)| {
                    let (qab, qc) = rot.apply(qp.x, qp.y);
                    *r += weight * self.model.iqac(qab, qc, local.values());
                });
            });
        }
    }
}

impl<'a, M: AsymmetricModel> Integrator<'a, M> {
    /// Oriented evaluation of a fully asymmetric model.
    pub fn asymmetric(
        &self,
        q: &[QPoint],
        values: &[f64],
        pd_start: usize,
        pd_stop: usize,
        cutoff: f64,
        result: &mut [f64],
    ) {
        let theta_par = match self.info.orientation {
            OrientationMode::Asymmetric { theta_par } => theta_par,
            mode => panic!("Asymmetric evaluation of a model with orientation {:?}.", mode),
        };
        let pool = self.pool(values);
        let theta = pool.parameter(theta_par);
        let phi = pool.parameter(theta_par + 1);
        let psi = pool.parameter(theta_par + 2);

        if self.info.is_magnetic() {
            let xs = CrossSections::new(&pool);
            self.fold(&pool, pd_start, pd_stop, cutoff, q.len(), result, |local, weight, out| {
                let jitter = local.values();
                let rot = QabcRotation::new(
                    theta,
                    phi,
                    psi,
                    jitter[theta_par],
                    jitter[theta_par + 1],
                    jitter[theta_par + 2],
                );
                let template: &ParameterBlock = local;
                q.par_iter().zip(out.par_iter_mut()).for_each_init(
                    || template.clone(),
                    |scratch, (qp, r)| {
                        let (qa, qb, qc) = rot.apply(qp.x, qp.y);
                        *r += weight
                            * xs.scattering(&pool, qp.x, qp.y, scratch, |pars| {
                                self.model.iqabc(qa, qb, qc, pars)
                            });
                    },
                );
            });
        } else {
            self.fold(&pool, pd_start, pd_stop, cutoff, q.len(), result, |local, weight, out| {
                let jitter = local.values();
                let rot = QabcRotation::new(
                    theta,
                    phi,
                    psi,
                    jitter[theta_par],
                    jitter[theta_par + 1],
                    jitter[theta_par + 2],
                );
                q.par_iter().zip(out.par_iter_mut()).for_each(|(qp, r)| {
                    let (qa, qb, qc) = rot.apply(qp.x, qp.y);
                    *r += weight * self.model.iqabc(qa, qb, qc, local.values());
                });
            });
        }
    }
}
