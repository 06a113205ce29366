//! Weight-normalized scattering intensities for polydisperse models.
//!
//! A scattering model is a pure kernel `F(q; p)` evaluated at a batch of
//! momentum transfers. Polydispersity turns the parameter vector `p` into a
//! Cartesian product of 1-D weighted grids, one grid per dispersed
//! parameter. This crate walks that hypercube, evaluates the kernel at every
//! cube point, and accumulates the weighted intensity per `q` together with
//! the weight-volume denominator the caller divides by.
//!
//! The enumeration of the hypercube is resumable: a call covers a half-open
//! slice `[pd_start, pd_stop)` of cube points and accumulates into a result
//! buffer that can be handed back for the next slice, so long evaluations
//! can be chunked, interrupted and resumed.

pub mod consts;
pub mod integrator;
pub mod magnetic;
pub mod model;
pub mod models;
pub mod orientation;
pub mod output;
pub mod parameters;
pub mod polydispersity;

#[cfg(test)]
pub mod test_helper;

pub use crate::integrator::{Integrator, Snapshot};
pub use crate::model::{AsymmetricModel, Model, ModelInfo, OrientationMode, RadialModel,
                       SymmetricModel};
pub use crate::parameters::{ParameterBlock, ParameterPool};
pub use crate::polydispersity::{ProblemDetails, MAX_PD};

use derive_more::{From, Into};
use serde_derive::{Deserialize, Serialize};

/// Momentum transfer in the detector plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, From, Into)]
pub struct QPoint {
    pub x: f64,
    pub y: f64,
}

impl QPoint {
    /// Magnitude of the scattering vector.
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}
