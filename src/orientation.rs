//! Reverse rotations taking detector-plane momentum transfers into the
//! frame of an oriented model.
//!
//! The mean orientation of the model and the per-point jitter are two
//! separate rotations: the detector coordinates are first rotated back
//! through the mean view angles, then back through the jitter deviations.
//! Both compose into one matrix that is built once per cube point and
//! applied to every `q`. All angles are in degrees.

use crate::consts::PI_180;

/// Reverse rotation for a model that is rotationally symmetric about its
/// `c` axis. Only the bottom row of the composite matrix is needed: the
/// in-plane component follows from `|q|` and `q_c`.
#[derive(Debug, Clone, Copy)]
pub struct QacRotation {
    r31: f64,
    r32: f64,
}

impl QacRotation {
    /// Composes the reverse view rotation at the mean angles
    /// `(theta, phi)` with the reverse jitter rotation at `(dtheta, dphi)`.
    pub fn new(theta: f64, phi: f64, dtheta: f64, dphi: f64) -> QacRotation {
        let (sin_theta, cos_theta) = (theta * PI_180).sin_cos();
        let (sin_phi, cos_phi) = (phi * PI_180).sin_cos();

        // reverse view matrix
        let v11 = cos_phi * cos_theta;
        let v12 = sin_phi * cos_theta;
        let v21 = -sin_phi;
        let v22 = cos_phi;
        let v31 = sin_theta * cos_phi;
        let v32 = sin_phi * sin_theta;

        // reverse jitter matrix, bottom row
        let (sin_dtheta, cos_dtheta) = (dtheta * PI_180).sin_cos();
        let (sin_dphi, cos_dphi) = (dphi * PI_180).sin_cos();
        let j31 = sin_dtheta;
        let j32 = -sin_dphi * cos_dtheta;
        let j33 = cos_dphi * cos_dtheta;

        QacRotation {
            r31: j31 * v11 + j32 * v21 + j33 * v31,
            r32: j31 * v12 + j32 * v22 + j33 * v32,
        }
    }

    /// Maps `(qx, qy)` to `(q_ab, q_c)`. The in-plane component is
    /// recovered from `q_ab^2 = |q|^2 - q_c^2`; a negative radicand from
    /// rounding is clamped to zero.
    pub fn apply(&self, qx: f64, qy: f64) -> (f64, f64) {
        let qc = self.r31 * qx + self.r32 * qy;
        let qab_sq = qx * qx + qy * qy - qc * qc;
        let qab = if qab_sq > 0. { qab_sq.sqrt() } else { 0. };
        (qab, qc)
    }
}

/// Reverse rotation for a fully oriented model; all three rows of the
/// composite matrix are applied.
#[derive(Debug, Clone, Copy)]
pub struct QabcRotation {
    r11: f64,
    r12: f64,
    r21: f64,
    r22: f64,
    r31: f64,
    r32: f64,
}

impl QabcRotation {
    /// Composes the reverse view rotation at the mean angles
    /// `(theta, phi, psi)` with the reverse jitter rotation at
    /// `(dtheta, dphi, dpsi)`.
    pub fn new(theta: f64, phi: f64, psi: f64, dtheta: f64, dphi: f64, dpsi: f64) -> QabcRotation {
        let (sin_theta, cos_theta) = (theta * PI_180).sin_cos();
        let (sin_phi, cos_phi) = (phi * PI_180).sin_cos();
        let (sin_psi, cos_psi) = (psi * PI_180).sin_cos();

        // reverse view matrix
        let v11 = -sin_phi * sin_psi + cos_phi * cos_psi * cos_theta;
        let v12 = sin_phi * cos_psi * cos_theta + sin_psi * cos_phi;
        let v21 = -sin_phi * cos_psi - sin_psi * cos_phi * cos_theta;
        let v22 = -sin_phi * sin_psi * cos_theta + cos_phi * cos_psi;
        let v31 = sin_theta * cos_phi;
        let v32 = sin_phi * sin_theta;

        // reverse jitter matrix
        let (sin_dtheta, cos_dtheta) = (dtheta * PI_180).sin_cos();
        let (sin_dphi, cos_dphi) = (dphi * PI_180).sin_cos();
        let (sin_dpsi, cos_dpsi) = (dpsi * PI_180).sin_cos();
        let j11 = cos_dpsi * cos_dtheta;
        let j12 = sin_dphi * sin_dtheta * cos_dpsi + sin_dpsi * cos_dphi;
        let j13 = sin_dphi * sin_dpsi - sin_dtheta * cos_dphi * cos_dpsi;
        let j21 = -sin_dpsi * cos_dtheta;
        let j22 = -sin_dphi * sin_dpsi * sin_dtheta + cos_dphi * cos_dpsi;
        let j23 = sin_dphi * cos_dpsi + sin_dpsi * sin_dtheta * cos_dphi;
        let j31 = sin_dtheta;
        let j32 = -sin_dphi * cos_dtheta;
        let j33 = cos_dphi * cos_dtheta;

        QabcRotation {
            r11: j11 * v11 + j12 * v21 + j13 * v31,
            r12: j11 * v12 + j12 * v22 + j13 * v32,
            r21: j21 * v11 + j22 * v21 + j23 * v31,
            r22: j21 * v12 + j22 * v22 + j23 * v32,
            r31: j31 * v11 + j32 * v21 + j33 * v31,
            r32: j31 * v12 + j32 * v22 + j33 * v32,
        }
    }

    /// Maps `(qx, qy)` to `(q_a, q_b, q_c)`.
    pub fn apply(&self, qx: f64, qy: f64) -> (f64, f64, f64) {
        (
            self.r11 * qx + self.r12 * qy,
            self.r21 * qx + self.r22 * qy,
            self.r31 * qx + self.r32 * qy,
        )
    }
}
