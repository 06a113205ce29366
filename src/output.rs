use ndarray::Array1;
use serde_derive::{Deserialize, Serialize};

/// Values appended to the output stream while the hypercube is processed.
/// Not all fields need to have values, which is reflected in the Option
/// type.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OutputEntry {
    /// Raw weighted intensity sums, one per q point.
    pub accumulated: Option<Array1<f64>>,
    /// Weight-volume denominator accumulated so far.
    pub pd_norm: Option<f64>,
    /// Normalized intensity, `scale * accumulated / pd_norm + background`.
    pub intensity: Option<Array1<f64>>,
    /// First cube point not yet evaluated.
    pub pd_start: usize,
}
