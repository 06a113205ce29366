//! Builds the integration problem from the parsed settings.

use crate::errors::*;
use crate::settings::{ModelType, Settings};
use itertools::izip;
use log::info;
use polyscatter::models::{CoreShellSphere, MultilayerVesicle};
use polyscatter::polydispersity::PdAxis;
use polyscatter::{ModelInfo, ProblemDetails, QPoint, Snapshot};
use std::fs::File;

/// How the result buffer is seeded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitType {
    Fresh,
    Resume,
}

/// The shipped kernels the binary can drive.
pub enum ModelKind {
    CoreShellSphere(CoreShellSphere),
    MultilayerVesicle(MultilayerVesicle),
}

/// The q batch, matching the dispatch of the call.
pub enum QMesh {
    Radial(Vec<f64>),
    Planar(Vec<QPoint>),
}

impl QMesh {
    pub fn len(&self) -> usize {
        match self {
            QMesh::Radial(q) => q.len(),
            QMesh::Planar(q) => q.len(),
        }
    }
}

/// Fully assembled call: descriptor, pool, q batch and the (possibly
/// resumed) accumulator.
pub struct Problem {
    pub model: ModelKind,
    pub info: ModelInfo,
    pub details: ProblemDetails,
    pub values: Vec<f64>,
    pub q: QMesh,
    pub result: Vec<f64>,
    pub pd_start: usize,
}

pub fn init_problem(settings: &Settings, init_type: InitType) -> Result<Problem> {
    let magnetic = settings.model.magnetism.is_some();

    let (model, info) = match settings.model.name {
        ModelType::CoreShellSphere => (
            ModelKind::CoreShellSphere(CoreShellSphere),
            CoreShellSphere::info(magnetic),
        ),
        ModelType::MultilayerVesicle => (
            ModelKind::MultilayerVesicle(MultilayerVesicle),
            MultilayerVesicle::info(magnetic),
        ),
    };

    let q = match (&settings.integration.q, &settings.integration.qxy) {
        (Some(q), None) => QMesh::Radial(q.clone()),
        (None, Some(qxy)) => QMesh::Planar(
            qxy.iter()
                .map(|&[x, y]| QPoint { x, y })
                .collect(),
        ),
        _ => bail!("Provide either `q` or `qxy`."),
    };

    let (values, details) = assemble_pool(settings, &info)?;

    let (result, pd_start) = match init_type {
        InitType::Fresh => (vec![0.; q.len() + 1], 0),
        InitType::Resume => {
            let snapshot = read_snapshot(settings)?;
            if snapshot.result.len() != q.len() + 1 {
                bail!(
                    "Snapshot holds {} slots, but the q grid needs {}.",
                    snapshot.result.len(),
                    q.len() + 1
                );
            }
            if snapshot.pd_start > details.num_eval() {
                bail!(
                    "Snapshot resumes at cube point {} of {}.",
                    snapshot.pd_start,
                    details.num_eval()
                );
            }
            info!("Resuming at cube point {}.", snapshot.pd_start);
            (snapshot.result, snapshot.pd_start)
        }
    };

    Ok(Problem {
        model,
        info,
        details,
        values,
        q,
        result,
        pd_start,
    })
}

/// Lays out the parameter pool and derives the hypercube descriptor.
fn assemble_pool(settings: &Settings, info: &ModelInfo) -> Result<(Vec<f64>, ProblemDetails)> {
    let model = &settings.model;

    let mut values = Vec::with_capacity(info.num_values());
    values.push(model.scale);
    values.push(model.background);
    values.extend(&model.parameters);

    if let Some(magnetism) = &model.magnetism {
        if magnetism.moments.len() != info.magnetic_slots.len() {
            bail!(
                "Model has {} magnetic sld slots, the parameter file provides \
                 {} magnetisation vectors.",
                info.magnetic_slots.len(),
                magnetism.moments.len()
            );
        }
        values.push(magnetism.up_frac_i);
        values.push(magnetism.up_frac_f);
        values.push(magnetism.up_angle);
        for moment in &magnetism.moments {
            values.extend(moment);
        }
    }
    debug_assert_eq!(values.len(), info.num_values());

    let mut axes = Vec::with_capacity(model.polydispersity.len());
    let mut offset = 0;
    for pd in &model.polydispersity {
        axes.push(PdAxis {
            par: pd.parameter,
            length: pd.values.len(),
            offset,
        });
        offset += pd.values.len();
    }
    let num_weights = offset;

    for pd in &model.polydispersity {
        values.extend(&pd.values);
    }
    for pd in &model.polydispersity {
        values.extend(&pd.weights);
    }

    for (axis, pd) in izip!(&axes, &model.polydispersity) {
        info!(
            "Polydispersity axis: parameter {} over {} points at offset {}.",
            pd.parameter,
            pd.values.len(),
            axis.offset
        );
    }

    Ok((values, ProblemDetails::new(&axes, num_weights)))
}

fn read_snapshot(settings: &Settings) -> Result<Snapshot> {
    let filename = settings
        .environment
        .init_file
        .as_ref()
        .ok_or("Cannot resume. Please provide a snapshot in the `init_file` field.")?;

    let f = File::open(filename)
        .chain_err(|| format!("Unable to open snapshot file '{}'.", filename))?;

    bincode::deserialize_from(f).chain_err(|| "Unable to parse snapshot file.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings;

    fn example() -> Settings {
        settings::read_parameter_file("test/parameter.toml").unwrap()
    }

    #[test]
    fn assembled_pool_matches_layout() {
        let settings = example();
        let problem = init_problem(&settings, InitType::Fresh).unwrap();

        // scale, background, 5 parameters, one grid of 3 values + weights
        assert_eq!(problem.info.num_values(), 7);
        assert_eq!(problem.values.len(), 7 + 6);
        assert_eq!(problem.details.num_eval(), 3);
        assert_eq!(problem.details.num_active(), 1);
        assert_eq!(problem.q.len(), 3);
        assert_eq!(problem.result.len(), 4);
        assert_eq!(problem.pd_start, 0);
    }

    #[test]
    fn resume_needs_init_file() {
        let settings = example();
        assert!(init_problem(&settings, InitType::Resume).is_err());
    }
}
