//! Numerical constants shared between kernels and drivers.

use std::f64::consts::PI;

/// Degree to radian conversion factor.
pub const PI_180: f64 = PI / 180.;

/// Volume prefactor of a sphere, `4π/3`.
pub const M_4PI_3: f64 = 4. / 3. * PI;
