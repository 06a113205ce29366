//! Multilamellar vesicle: concentric solvent-filled shells, two layers per
//! repeat.

use super::sph_j1c;
use crate::consts::M_4PI_3;
use crate::model::{Model, ModelInfo, OrientationMode, RadialModel};

/// Parameter slots: `volfraction`, `radius`, `thick_shell`,
/// `thick_solvent`, `sld_solvent`, `sld`, `n_pairs`.
///
/// `n_pairs` arrives as a double and is rounded to the nearest shell-pair
/// count; `n_pairs < 2` corresponds to a unilamellar vesicle.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultilayerVesicle;

impl MultilayerVesicle {
    pub const NUM_PARS: usize = 7;

    pub fn info(magnetic: bool) -> ModelInfo {
        ModelInfo {
            num_pars: MultilayerVesicle::NUM_PARS,
            orientation: OrientationMode::None,
            magnetic_slots: if magnetic { vec![4, 5] } else { vec![] },
        }
    }
}

fn multilayer_vesicle_kernel(
    q: f64,
    volfraction: f64,
    radius: f64,
    thick_shell: f64,
    thick_solvent: f64,
    sld_solvent: f64,
    sld: f64,
    n_pairs: i32,
) -> f64 {
    // two shells at a time; voli is left at the outermost layer volume and
    // enters the final scaling
    let sldi = sld_solvent - sld;
    let mut fval = 0.;
    let mut voli;
    let mut ii = 0;

    loop {
        let mut ri = radius + f64::from(ii) * (thick_shell + thick_solvent);

        // layer 1
        voli = M_4PI_3 * ri * ri * ri;
        fval += voli * sldi * sph_j1c(ri * q);

        ri += thick_shell;

        // layer 2
        voli = M_4PI_3 * ri * ri * ri;
        fval -= voli * sldi * sph_j1c(ri * q);

        ii += 1;
        if ii > n_pairs - 1 {
            break;
        }
    }

    fval * volfraction * 1.0e-4 * fval / voli
}

impl Model for MultilayerVesicle {
    fn form_volume(&self, pars: &[f64]) -> f64 {
        let n_pairs = f64::from((pars[6] + 0.5) as i32);
        let outer = pars[1] + n_pairs * (pars[2] + pars[3]) - pars[3];
        M_4PI_3 * outer.powi(3)
    }
}

impl RadialModel for MultilayerVesicle {
    fn iq(&self, q: f64, pars: &[f64]) -> f64 {
        let n_pairs = (pars[6] + 0.5) as i32;
        multilayer_vesicle_kernel(q, pars[0], pars[1], pars[2], pars[3], pars[4], pars[5], n_pairs)
    }
}
