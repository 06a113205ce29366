//! Spherical particle with a core of one scattering length density wrapped
//! in a shell of another, embedded in a solvent.

use super::sph_j1c;
use crate::consts::M_4PI_3;
use crate::model::{Model, ModelInfo, OrientationMode, RadialModel};

/// Parameter slots: `radius`, `thickness`, `sld_core`, `sld_shell`,
/// `sld_solvent`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreShellSphere;

impl CoreShellSphere {
    pub const NUM_PARS: usize = 5;

    /// Parameter layout; with `magnetic` the three densities carry
    /// magnetisation vectors.
    pub fn info(magnetic: bool) -> ModelInfo {
        ModelInfo {
            num_pars: CoreShellSphere::NUM_PARS,
            orientation: OrientationMode::None,
            magnetic_slots: if magnetic { vec![2, 3, 4] } else { vec![] },
        }
    }
}

fn core_shell_kernel(
    q: f64,
    radius: f64,
    thickness: f64,
    core_sld: f64,
    shell_sld: f64,
    solvent_sld: f64,
) -> f64 {
    let core_volume = M_4PI_3 * radius.powi(3);
    let core_contrast = core_sld - shell_sld;
    let mut f = core_volume * core_contrast * sph_j1c(q * radius);

    let shell_volume = M_4PI_3 * (radius + thickness).powi(3);
    let shell_contrast = shell_sld - solvent_sld;
    f += shell_volume * shell_contrast * sph_j1c(q * (radius + thickness));

    // 1e-4: convert from 1e-6 Angstrom^-2 sld units to cm^-1
    f * f * 1.0e-4
}

impl Model for CoreShellSphere {
    fn form_volume(&self, pars: &[f64]) -> f64 {
        M_4PI_3 * (pars[0] + pars[1]).powi(3)
    }
}

impl RadialModel for CoreShellSphere {
    fn iq(&self, q: f64, pars: &[f64]) -> f64 {
        core_shell_kernel(q, pars[0], pars[1], pars[2], pars[3], pars[4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helper::equal_floats;

    const PARS: [f64; 5] = [60., 10., 1., 2., 3.];

    #[test]
    fn forward_scattering() {
        // at q -> 0 both Bessel factors go to 1 and the amplitude is the
        // contrast-weighted volume sum
        let core_volume = M_4PI_3 * 60f64.powi(3);
        let shell_volume = M_4PI_3 * 70f64.powi(3);
        let amplitude = core_volume * (1. - 2.) + shell_volume * (2. - 3.);
        let expect = amplitude * amplitude * 1e-4;

        let model = CoreShellSphere;
        assert!((model.iq(1e-9, &PARS) - expect).abs() < expect * 1e-10);
    }

    #[test]
    fn form_volume_is_outer_sphere() {
        let model = CoreShellSphere;
        assert!(equal_floats(
            model.form_volume(&PARS),
            M_4PI_3 * 70f64.powi(3)
        ));
    }

    #[test]
    fn vanishing_contrast_scatters_nothing() {
        let model = CoreShellSphere;
        let flat = [60., 10., 3., 3., 3.];
        assert_eq!(model.iq(0.05, &flat), 0.);
    }

    #[test]
    fn info_layout() {
        let info = CoreShellSphere::info(true);
        assert_eq!(info.num_pars, 5);
        assert_eq!(info.magnetic_slots, vec![2, 3, 4]);
        assert!(CoreShellSphere::info(false).magnetic_slots.is_empty());
    }
}
