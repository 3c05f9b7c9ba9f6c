use serde::{Deserialize, Serialize};

/// Latest known device orientation, as delivered by one platform event.
///
/// Every field may be legitimately absent: the platform withholds values it
/// cannot measure, and `None` is distinct from a zero angle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationReading {
    /// Rotation around the Z-axis (0 to 360)
    pub alpha: Option<f64>,
    /// Rotation around the X-axis (-180 to 180)
    pub beta: Option<f64>,
    /// Rotation around the Y-axis (-90 to 90)
    pub gamma: Option<f64>,
    /// true if the device is providing earth-referenced orientation
    pub absolute: Option<bool>,
}

impl RotationReading {
    pub fn new(
        alpha: Option<f64>,
        beta: Option<f64>,
        gamma: Option<f64>,
        absolute: Option<bool>,
    ) -> Self {
        Self {
            alpha,
            beta,
            gamma,
            absolute,
        }
    }

    /// A reading has "arrived" once the vertical-axis angle is known.
    pub fn has_arrived(&self) -> bool {
        self.alpha.is_some()
    }
}
