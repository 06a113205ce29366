//! This module handles a TOML settings file.

use polyscatter::models::{CoreShellSphere, MultilayerVesicle};
use polyscatter::MAX_PD;
use serde_derive::{Deserialize, Serialize};
use std::fs::File;
use std::io::prelude::*;
use toml;

error_chain! {
    foreign_links {
        TOMLError(toml::de::Error);
    }
}

/// Structure that holds settings, which are defined externally in a TOML
/// file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub model: ModelSettings,
    pub integration: IntegrationSettings,
    pub environment: EnvironmentSettings,
}

/// Selects one of the shipped model kernels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ModelType {
    #[serde(rename = "core_shell_sphere")]
    CoreShellSphere,
    #[serde(rename = "multilayer_vesicle")]
    MultilayerVesicle,
}

impl ModelType {
    pub fn num_pars(&self) -> usize {
        match self {
            ModelType::CoreShellSphere => CoreShellSphere::NUM_PARS,
            ModelType::MultilayerVesicle => MultilayerVesicle::NUM_PARS,
        }
    }

    /// Kernel name as it appears in parameter files and output paths.
    pub fn label(&self) -> &'static str {
        match self {
            ModelType::CoreShellSphere => "core_shell_sphere",
            ModelType::MultilayerVesicle => "multilayer_vesicle",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSettings {
    pub name: ModelType,
    pub scale: f64,
    pub background: f64,
    /// Model parameters in slot order.
    pub parameters: Vec<f64>,
    #[serde(default)]
    pub magnetism: Option<MagnetismSettings>,
    #[serde(default)]
    pub polydispersity: Vec<PolydispersitySettings>,
}

/// Beam polarisation and one magnetisation vector per magnetic sld slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MagnetismSettings {
    pub up_frac_i: f64,
    pub up_frac_f: f64,
    pub up_angle: f64,
    pub moments: Vec<[f64; 3]>,
}

/// One polydispersity axis: a weighted grid driving one parameter slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolydispersitySettings {
    pub parameter: usize,
    pub values: Vec<f64>,
    pub weights: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationSettings {
    /// Lower threshold on the cumulative grid weight of a cube point.
    pub cutoff: f64,
    /// Cube points evaluated per driver call.
    pub slice_size: usize,
    /// `|q|` values for the 1-D dispatch.
    #[serde(default)]
    pub q: Option<Vec<f64>>,
    /// `(qx, qy)` pairs for the 2-D dispatch.
    #[serde(default)]
    pub qxy: Option<Vec<[f64; 2]>>,
    pub output_at_slice: OutputAtSlice,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputAtSlice {
    /// Append the raw accumulator to the output stream every n slices.
    #[serde(default)]
    pub accumulated: Option<usize>,
    /// Write a resumable snapshot every n slices.
    #[serde(default)]
    pub snapshot: Option<usize>,
    pub final_snapshot: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentSettings {
    pub prefix: String,
    /// Snapshot file to resume from.
    #[serde(default)]
    pub init_file: Option<String>,
    pub io_queue_size: usize,
    pub output_format: OutputFormat,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OutputFormat {
    #[serde(rename = "cbor")]
    CBOR,
    #[serde(rename = "bincode")]
    Bincode,
    #[serde(rename = "msgpack")]
    MsgPack,
}

impl Settings {
    /// Writes the settings back out, so a run is reproducible from its
    /// output directory.
    pub fn save_to_file(&self, filename: &str) -> Result<()> {
        let serialized =
            toml::to_string(self).chain_err(|| "Unable to serialize settings.")?;

        let mut f = File::create(filename).chain_err(|| "Unable to create parameter file.")?;
        f.write_all(serialized.as_bytes())
            .chain_err(|| "Unable to write parameter file.")?;

        Ok(())
    }

    pub fn set_version(&mut self, version: &str) {
        self.environment.version = version.to_string();
    }
}

/// Reads the content of a file `filename` into an string and return it.
fn read_from_file(filename: &str) -> Result<String> {
    let mut f = File::open(filename).chain_err(|| "Unable to open file.")?;
    let mut content = String::new();

    f.read_to_string(&mut content)
        .chain_err(|| "Unable to read file.")?;

    Ok(content)
}

/// Reads content of a file `param_file`, that should point to a valid TOML
/// file, and parses it.
/// Then returns the deserialized data in form of a Settings struct.
pub fn read_parameter_file(param_file: &str) -> Result<Settings> {
    // read .toml file into string
    let toml_string = read_from_file(param_file).chain_err(|| "Unable to read parameter file.")?;

    let mut settings: Settings =
        toml::from_str(&toml_string).chain_err(|| "Unable to parse parameter file.")?;

    settings.environment.version = "".to_string();

    check_settings(&settings)?;

    Ok(settings)
}

fn check_settings(s: &Settings) -> Result<()> {
    let num_pars = s.model.name.num_pars();

    if s.model.parameters.len() != num_pars {
        bail!(
            "Model expects {} parameters, the parameter file provides {}.",
            num_pars,
            s.model.parameters.len()
        );
    }

    match (&s.integration.q, &s.integration.qxy) {
        (Some(_), Some(_)) => bail!("Provide either `q` or `qxy`, not both."),
        (None, None) => bail!("Provide a `q` or `qxy` grid."),
        (Some(q), None) if q.is_empty() => bail!("`q` grid is empty."),
        (None, Some(qxy)) if qxy.is_empty() => bail!("`qxy` grid is empty."),
        _ => {}
    }

    if s.integration.slice_size == 0 {
        bail!("`slice_size` must be at least 1.");
    }

    if s.model.polydispersity.len() > MAX_PD {
        bail!(
            "At most {} polydispersity axes are supported, got {}.",
            MAX_PD,
            s.model.polydispersity.len()
        );
    }

    for pd in &s.model.polydispersity {
        if pd.values.is_empty() || pd.values.len() != pd.weights.len() {
            bail!(
                "Polydispersity grid of parameter {} needs matching, non-empty \
                 value and weight lists.",
                pd.parameter
            );
        }
        if pd.parameter >= num_pars {
            bail!(
                "Polydispersity grid drives parameter {}, but the model has \
                 only {} parameters.",
                pd.parameter,
                num_pars
            );
        }
        if pd.weights.iter().any(|w| *w < 0. || !w.is_finite()) {
            bail!(
                "Polydispersity weights of parameter {} must be finite and \
                 non-negative.",
                pd.parameter
            );
        }
    }

    if s.model.magnetism.is_some() && s.integration.q.is_some() {
        bail!("Magnetic evaluation needs a 2-D `qxy` grid.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
        [model]
        name = "core_shell_sphere"
        scale = 1.0
        background = 0.001
        parameters = [60.0, 10.0, 1.0, 2.8, 6.4]

        [[model.polydispersity]]
        parameter = 0
        values = [55.0, 60.0, 65.0]
        weights = [0.25, 0.5, 0.25]

        [integration]
        cutoff = 1e-5
        slice_size = 1000
        q = [0.01, 0.02, 0.05]

        [integration.output_at_slice]
        snapshot = 10
        final_snapshot = true

        [environment]
        prefix = "vesicle"
        io_queue_size = 50
        output_format = "cbor"
    "#;

    #[test]
    fn parse_example() {
        let settings: Settings = toml::from_str(EXAMPLE).unwrap();
        check_settings(&settings).unwrap();

        assert_eq!(settings.model.name, ModelType::CoreShellSphere);
        assert_eq!(settings.model.parameters.len(), 5);
        assert_eq!(settings.model.polydispersity[0].values.len(), 3);
        assert_eq!(settings.integration.slice_size, 1000);
        assert_eq!(settings.environment.output_format, OutputFormat::CBOR);
        assert!(settings.environment.init_file.is_none());
        assert_eq!(settings.integration.output_at_slice.accumulated, None);
    }

    #[test]
    fn reject_wrong_parameter_count() {
        let mut settings: Settings = toml::from_str(EXAMPLE).unwrap();
        settings.model.parameters.pop();
        assert!(check_settings(&settings).is_err());
    }

    #[test]
    fn reject_missing_q() {
        let mut settings: Settings = toml::from_str(EXAMPLE).unwrap();
        settings.integration.q = None;
        assert!(check_settings(&settings).is_err());
    }

    #[test]
    fn reject_magnetism_on_radial_grid() {
        let mut settings: Settings = toml::from_str(EXAMPLE).unwrap();
        settings.model.magnetism = Some(MagnetismSettings {
            up_frac_i: 1.,
            up_frac_f: 1.,
            up_angle: 0.,
            moments: vec![[0., 0., 0.]; 3],
        });
        assert!(check_settings(&settings).is_err());
    }

    #[test]
    fn settings_roundtrip_through_toml() {
        let settings: Settings = toml::from_str(EXAMPLE).unwrap();
        let serialized = toml::to_string(&settings).unwrap();
        let reparsed: Settings = toml::from_str(&serialized).unwrap();
        assert_eq!(reparsed.model.name, settings.model.name);
        assert_eq!(reparsed.model.parameters, settings.model.parameters);
    }
}
