//! Mixing of the four neutron spin cross sections.
//!
//! A polarised measurement splits into the cross sections `dd`, `du`, `ud`
//! and `uu` of incoming and outgoing beam polarisation. Each cross section
//! sees an effective scattering length density per magnetic slot, derived
//! from the nuclear density, the magnetisation vector and the projection of
//! the polarisation axis onto the scattering vector. The kernel is invoked
//! once per contributing cross section (twice for the spin-flip sections,
//! which carry an in-plane and an out-of-plane part) with the magnetic
//! slots of the parameter block rewritten in place.

use crate::consts::PI_180;
use crate::parameters::{ParameterBlock, ParameterPool};

/// Cross sections below this weight are not evaluated.
const WEIGHT_CUTOFF: f64 = 1e-8;

/// Below this `|q|^2` the polarisation projections are undefined and the
/// magnetic contribution is taken as zero.
const QSQ_CUTOFF: f64 = 1e-16;

fn clip(value: f64, low: f64, high: f64) -> f64 {
    if value < low {
        low
    } else if value > high {
        high
    } else {
        value
    }
}

/// Mixing weights of the cross sections `[dd, du, ud, uu]` for the given
/// beam polarisation fractions. The fractions are clamped to `[0, 1]`
/// before the fourth root.
pub fn spin_weights(up_frac_i: f64, up_frac_f: f64) -> [f64; 4] {
    let in_spin = clip(up_frac_i, 0., 1.);
    let out_spin = clip(up_frac_f, 0., 1.);
    [
        ((1. - in_spin) * (1. - out_spin)).sqrt().sqrt(),
        ((1. - in_spin) * out_spin).sqrt().sqrt(),
        (in_spin * (1. - out_spin)).sqrt().sqrt(),
        (in_spin * out_spin).sqrt().sqrt(),
    ]
}

/// Effective scattering length density seen by one cross section.
fn mag_sld(qx: f64, qy: f64, pk: f64, mx: f64, my: f64, sld: f64) -> f64 {
    let perp = qy * mx - qx * my;
    sld + perp * pk
}

/// Precomputed, `q`-independent part of the spin mixing.
#[derive(Debug, Clone, Copy)]
pub struct CrossSections {
    spins: [f64; 4],
    cos_mspin: f64,
    sin_mspin: f64,
}

impl CrossSections {
    /// Reads the polarisation slots of a magnetic pool.
    pub fn new(pool: &ParameterPool) -> CrossSections {
        let (up_frac_i, up_frac_f, up_angle) = pool.polarisation();
        let (sin_mspin, cos_mspin) = (-up_angle * PI_180).sin_cos();

        CrossSections {
            spins: spin_weights(up_frac_i, up_frac_f),
            cos_mspin,
            sin_mspin,
        }
    }

    /// Sums the kernel over all contributing cross sections at one `q`
    /// point, rewriting the magnetic slots of `block` before every
    /// invocation. The nuclear densities are taken from the pool.
    pub fn scattering<K>(
        &self,
        pool: &ParameterPool,
        qx: f64,
        qy: f64,
        block: &mut ParameterBlock,
        mut kernel: K,
    ) -> f64
    where
        K: FnMut(&[f64]) -> f64,
    {
        let qsq = qx * qx + qy * qy;
        if qsq <= QSQ_CUTOFF {
            return 0.;
        }

        // polarisation projections of [dd, du, ud, uu]
        let mut p = [0.; 4];
        p[0] = (qy * self.cos_mspin + qx * self.sin_mspin) / qsq;
        p[3] = -p[0];
        p[1] = (qy * self.sin_mspin - qx * self.cos_mspin) / qsq;
        p[2] = p[1];

        let slots = &pool.info().magnetic_slots;

        let mut total = 0.;
        for (k, &weight) in self.spins.iter().enumerate() {
            if weight <= WEIGHT_CUTOFF {
                continue;
            }
            let flip = k == 1 || k == 2;
            let axes = if flip { 2 } else { 1 };

            for axis in 0..axes {
                for (m, &slot) in slots.iter().enumerate() {
                    let (mx, my, mz) = pool.moment(m);
                    let value = if axis == 0 {
                        let nuclear = if flip { 0. } else { pool.parameter(slot) };
                        weight * mag_sld(qx, qy, p[k], mx, my, nuclear)
                    } else {
                        weight * if k == 1 { -mz } else { mz }
                    };
                    block.set(slot, value);
                }
                total += kernel(block.values());
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelInfo, OrientationMode};
    use crate::parameters::{ParameterBlock, ParameterPool};
    use crate::test_helper::equal_floats;

    #[test]
    fn spin_weights_at_corners() {
        assert_eq!(spin_weights(0., 0.), [1., 0., 0., 0.]);
        assert_eq!(spin_weights(1., 1.), [0., 0., 0., 1.]);
        assert_eq!(spin_weights(0., 1.), [0., 1., 0., 0.]);
        assert_eq!(spin_weights(1., 0.), [0., 0., 1., 0.]);
    }

    #[test]
    fn spin_fractions_are_clamped() {
        // out-of-range fractions must not reach the fourth root as
        // negative numbers
        let w = spin_weights(-0.5, 1.5);
        assert_eq!(w, [0., 1., 0., 0.]);
        for weight in &w {
            assert!(weight.is_finite());
        }
    }

    #[test]
    fn balanced_weights() {
        let w = spin_weights(0.5, 0.5);
        let expect = 0.25f64.sqrt().sqrt();
        for weight in &w {
            assert!(equal_floats(*weight, expect));
        }
    }

    fn magnetic_pool(up_frac_i: f64, up_frac_f: f64, moment: (f64, f64, f64)) -> Vec<f64> {
        // one parameter, which is also the single magnetic slot
        vec![
            1.,
            0.,
            4.0, // nuclear sld
            up_frac_i,
            up_frac_f,
            0., // up_angle
            moment.0,
            moment.1,
            moment.2,
        ]
    }

    fn magnetic_info() -> ModelInfo {
        ModelInfo {
            num_pars: 1,
            orientation: OrientationMode::None,
            magnetic_slots: vec![0],
        }
    }

    #[test]
    fn zero_q_contributes_nothing() {
        let info = magnetic_info();
        let values = magnetic_pool(1., 1., (1., 2., 3.));
        let pool = ParameterPool::new(&values, &info, 0);
        let xs = CrossSections::new(&pool);

        let mut block = ParameterBlock::from_pool(&pool);
        let mut calls = 0;
        let total = xs.scattering(&pool, 0., 0., &mut block, |_| {
            calls += 1;
            1.
        });
        assert_eq!(total, 0.);
        assert_eq!(calls, 0);
    }

    #[test]
    fn pure_up_beam_reduces_to_one_section() {
        // up_frac = 1/1 keeps only uu with unit weight; at zero
        // magnetisation the rewritten sld is the nuclear one
        let info = magnetic_info();
        let values = magnetic_pool(1., 1., (0., 0., 0.));
        let pool = ParameterPool::new(&values, &info, 0);
        let xs = CrossSections::new(&pool);

        let mut block = ParameterBlock::from_pool(&pool);
        let mut seen = Vec::new();
        let total = xs.scattering(&pool, 0.1, 0.2, &mut block, |pars| {
            seen.push(pars[0]);
            pars[0] * pars[0]
        });
        assert_eq!(seen, vec![4.0]);
        assert!(equal_floats(total, 16.0));
    }

    #[test]
    fn flip_sections_use_zero_nuclear_sld() {
        // a pure spin-flip beam sees no nuclear scattering; with zero
        // magnetisation both flip axes evaluate at sld 0
        let info = magnetic_info();
        let values = magnetic_pool(0., 1., (0., 0., 0.));
        let pool = ParameterPool::new(&values, &info, 0);
        let xs = CrossSections::new(&pool);

        let mut block = ParameterBlock::from_pool(&pool);
        let mut seen = Vec::new();
        xs.scattering(&pool, 0.1, 0.2, &mut block, |pars| {
            seen.push(pars[0]);
            0.
        });
        assert_eq!(seen, vec![0., 0.]);
    }

    #[test]
    fn out_of_plane_moment_enters_flip_axis() {
        let info = magnetic_info();
        let values = magnetic_pool(0., 1., (0., 0., 2.5));
        let pool = ParameterPool::new(&values, &info, 0);
        let xs = CrossSections::new(&pool);

        let mut block = ParameterBlock::from_pool(&pool);
        let mut seen = Vec::new();
        xs.scattering(&pool, 0.1, 0.2, &mut block, |pars| {
            seen.push(pars[0]);
            0.
        });
        // du: in-plane axis first, then -m_z
        assert_eq!(seen.len(), 2);
        assert!(equal_floats(seen[1], -2.5));
    }
}
