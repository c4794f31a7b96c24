/// Stencil settings
///
/// Everything a caller tunes between runs of the layer pipeline. The
/// struct serializes to JSON so a front end can save and restore a session;
/// missing fields fall back to their defaults.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{FilterError, Result};
use crate::filters::convolve::box_size_for_strength;
use crate::raster::LevelParameters;

/// Print scale that maps the on-screen template onto the pumpkin surface
const PRINT_SCALE: f32 = 0.375;

/// Which backend runs the blur, levels, posterize and finishing stages
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Cpu,
    #[default]
    Gpu,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct StencilSettings {
    // ========== Tone ==========

    /// Levels triple `[low, mid, high]`, each 0-255
    pub level_range: [u8; 3],

    /// Blur strength (0.0 to 100.0), mapped to a 2x2..10x10 box
    pub blur_strength: f32,

    // ========== Placement ==========

    /// Template scale on the pumpkin (0.1 to 2.0)
    pub scale: f32,

    /// Rotation of the source photo in degrees (-180.0 to 180.0)
    pub rotation_degrees: f32,

    /// Pumpkin diameter in inches
    pub pumpkin_size_inches: f32,

    pub backend: BackendKind,
}

impl Default for StencilSettings {
    fn default() -> Self {
        Self {
            level_range: [120, 134, 179],
            blur_strength: 10.0,
            scale: 1.2,
            rotation_degrees: 0.0,
            pumpkin_size_inches: 14.0,
            backend: BackendKind::Gpu,
        }
    }
}

impl StencilSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// True when every value is at its default
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Reject values outside their documented domains.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.blur_strength) {
            return Err(FilterError::InvalidSettings(format!(
                "blur strength {} outside 0..=100",
                self.blur_strength
            )));
        }
        if !(0.1..=2.0).contains(&self.scale) {
            return Err(FilterError::InvalidSettings(format!(
                "scale {} outside 0.1..=2.0",
                self.scale
            )));
        }
        if !(-180.0..=180.0).contains(&self.rotation_degrees) {
            return Err(FilterError::InvalidSettings(format!(
                "rotation {} outside -180..=180 degrees",
                self.rotation_degrees
            )));
        }
        if !(self.pumpkin_size_inches > 0.0 && self.pumpkin_size_inches.is_finite()) {
            return Err(FilterError::InvalidSettings(format!(
                "pumpkin size {} must be positive",
                self.pumpkin_size_inches
            )));
        }
        self.level_parameters().validate()
    }

    pub fn level_parameters(&self) -> LevelParameters {
        let [low, mid, high] = self.level_range;
        LevelParameters::new(low, mid, high)
    }

    pub fn box_blur_size(&self) -> usize {
        box_size_for_strength(self.blur_strength)
    }

    /// Printed template width: half the pumpkin's circumference, scaled.
    pub fn print_width_inches(&self) -> f32 {
        self.pumpkin_size_inches * PI / 2.0 * self.scale * PRINT_SCALE
    }

    /// Printed height of a `width x height` template at `print_width_inches`.
    pub fn print_height_inches(&self, width: u32, height: u32) -> f32 {
        if width == 0 {
            return 0.0;
        }
        self.print_width_inches() * height as f32 / width as f32
    }
}
