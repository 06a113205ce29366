//! Parameter pool layout and the mutable parameter block.
//!
//! A call hands the core one flat slice of doubles, the *parameter pool*:
//!
//! ```text
//! [scale, background,
//!  p_1 … p_num_pars,
//!  up_frac_i, up_frac_f, up_angle,          (magnetic models only)
//!  m_x_1, m_y_1, m_z_1, …,
//!  pd_values…, pd_weights…]
//! ```
//!
//! The two trailing blocks are the concatenated polydispersity grids. Values
//! and weights share one offset table; the weights of a grid start
//! `num_weights` doubles after its values.

use crate::model::ModelInfo;

/// Read-only view of the parameter pool of one call.
#[derive(Debug, Clone, Copy)]
pub struct ParameterPool<'a> {
    values: &'a [f64],
    info: &'a ModelInfo,
    num_weights: usize,
}

impl<'a> ParameterPool<'a> {
    pub fn new(values: &'a [f64], info: &'a ModelInfo, num_weights: usize) -> ParameterPool<'a> {
        assert_eq!(
            values.len(),
            info.num_values() + 2 * num_weights,
            "Parameter pool has {} slots, but the layout requires {} + 2x{}.",
            values.len(),
            info.num_values(),
            num_weights
        );

        ParameterPool {
            values,
            info,
            num_weights,
        }
    }

    pub fn info(&self) -> &'a ModelInfo {
        self.info
    }

    pub fn scale(&self) -> f64 {
        self.values[0]
    }

    pub fn background(&self) -> f64 {
        self.values[1]
    }

    /// Nominal value of model parameter `slot`, before any polydispersity
    /// substitution.
    pub fn parameter(&self, slot: usize) -> f64 {
        debug_assert!(slot < self.info.num_pars);
        self.values[2 + slot]
    }

    /// All nominal model parameters.
    pub fn model_pars(&self) -> &'a [f64] {
        &self.values[2..2 + self.info.num_pars]
    }

    /// `(up_frac_i, up_frac_f, up_angle)` of a magnetic pool.
    pub fn polarisation(&self) -> (f64, f64, f64) {
        debug_assert!(self.info.is_magnetic());
        let base = 2 + self.info.num_pars;
        (
            self.values[base],
            self.values[base + 1],
            self.values[base + 2],
        )
    }

    /// Magnetisation vector `(m_x, m_y, m_z)` of the `k`-th magnetic slot.
    pub fn moment(&self, k: usize) -> (f64, f64, f64) {
        debug_assert!(k < self.info.magnetic_slots.len());
        let base = 2 + self.info.num_pars + 3 + 3 * k;
        (
            self.values[base],
            self.values[base + 1],
            self.values[base + 2],
        )
    }

    /// Grid values of one polydispersity dimension.
    pub fn pd_value(&self, offset: usize, length: usize) -> &'a [f64] {
        let base = self.info.num_values() + offset;
        &self.values[base..base + length]
    }

    /// Grid weights of one polydispersity dimension.
    pub fn pd_weight(&self, offset: usize, length: usize) -> &'a [f64] {
        let base = self.info.num_values() + self.num_weights + offset;
        &self.values[base..base + length]
    }
}

/// Scratch parameter table the kernels are evaluated with.
///
/// Initialized from the nominal pool values and then overwritten in place
/// while the hypercube is walked. Orientation slots start at zero: they hold
/// the jitter deviation from the mean orientation, and the mean stays in the
/// pool.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBlock {
    values: Vec<f64>,
}

impl ParameterBlock {
    pub fn from_pool(pool: &ParameterPool) -> ParameterBlock {
        let mut values = pool.model_pars().to_vec();

        if let Some(theta_par) = pool.info().orientation.theta_par() {
            for slot in theta_par..theta_par + pool.info().orientation.angles() {
                values[slot] = 0.;
            }
        }

        ParameterBlock { values }
    }

    pub fn set(&mut self, slot: usize, value: f64) {
        self.values[slot] = value;
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelInfo, OrientationMode};

    fn magnetic_info() -> ModelInfo {
        ModelInfo {
            num_pars: 3,
            orientation: OrientationMode::None,
            magnetic_slots: vec![1, 2],
        }
    }

    #[test]
    fn pool_layout() {
        let info = magnetic_info();
        // scale, background, 3 pars, polarisation, 2 moments, 2 values, 2 weights
        let values = [
            1.0, 0.1, // scale, background
            10., 20., 30., // model parameters
            0.3, 0.7, 15., // up_frac_i, up_frac_f, up_angle
            1., 2., 3., // moment of slot 1
            4., 5., 6., // moment of slot 2
            0.9, 1.1, // pd values
            0.5, 0.5, // pd weights
        ];
        let pool = ParameterPool::new(&values, &info, 2);

        assert_eq!(pool.scale(), 1.0);
        assert_eq!(pool.background(), 0.1);
        assert_eq!(pool.parameter(1), 20.);
        assert_eq!(pool.model_pars(), &[10., 20., 30.]);
        assert_eq!(pool.polarisation(), (0.3, 0.7, 15.));
        assert_eq!(pool.moment(0), (1., 2., 3.));
        assert_eq!(pool.moment(1), (4., 5., 6.));
        assert_eq!(pool.pd_value(0, 2), &[0.9, 1.1]);
        assert_eq!(pool.pd_weight(0, 2), &[0.5, 0.5]);
    }

    #[test]
    #[should_panic]
    fn pool_length_mismatch() {
        let info = magnetic_info();
        let values = [0.; 4];
        ParameterPool::new(&values, &info, 2);
    }

    #[test]
    fn block_copies_nominal_values() {
        let info = ModelInfo {
            num_pars: 2,
            orientation: OrientationMode::None,
            magnetic_slots: vec![],
        };
        let values = [1., 0., 7., 8.];
        let pool = ParameterPool::new(&values, &info, 0);

        let mut block = ParameterBlock::from_pool(&pool);
        assert_eq!(block.values(), &[7., 8.]);

        block.set(0, 9.);
        assert_eq!(block.values(), &[9., 8.]);
    }

    #[test]
    fn block_zeroes_jitter_slots() {
        let info = ModelInfo {
            num_pars: 4,
            orientation: OrientationMode::Symmetric { theta_par: 2 },
            magnetic_slots: vec![],
        };
        // theta = 60, phi = 30 are the mean orientation; the block must not
        // see them as jitter.
        let values = [1., 0., 5., 6., 60., 30.];
        let pool = ParameterPool::new(&values, &info, 0);

        let block = ParameterBlock::from_pool(&pool);
        assert_eq!(block.values(), &[5., 6., 0., 0.]);
        assert_eq!(pool.parameter(2), 60.);
        assert_eq!(pool.parameter(3), 30.);
    }
}
