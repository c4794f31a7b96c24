/// Data model shared by both backends
///
/// These types are what flows between the caller and every filter stage:
/// - `RasterBuffer` - width/height tagged RGBA8 pixels
/// - `Kernel` - weighted convolution mask
/// - `ColorTable` - posterize output colors
/// - `LevelParameters` - low/mid/high tone remap

use crate::error::{FilterError, Result};

/// RGBA8 pixels, row-major, top-left origin.
///
/// The buffer is owned by whichever stage currently holds it. In-place
/// filters take `&mut RasterBuffer`, filters that need the untouched source
/// while writing take `&RasterBuffer` and return a fresh buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterBuffer {
    /// Zero-filled (fully transparent black) buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Buffer where every pixel is `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * 4);
        for _ in 0..count {
            pixels.extend_from_slice(&rgba);
        }
        Self { width, height, pixels }
    }

    /// Wrap existing RGBA bytes. Fails if the length is not `width * height * 4`.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(FilterError::BufferSizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self { width, height, pixels })
    }

    /// Wrap bytes already known to be `width * height * 4` long.
    pub(crate) fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);
        Self { width, height, pixels }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Byte offset of pixel (x, y).
    #[inline]
    pub fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Read pixel (x, y). Panics when out of bounds, like slice indexing.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.pixels[i..i + 4].copy_from_slice(&rgba);
    }

    /// Same-sized blank buffer, used when no rendering context exists.
    pub fn blank_like(&self) -> Self {
        Self::new(self.width, self.height)
    }
}

/// Store an intermediate value into an 8-bit sample.
///
/// Saturates to [0, 255], rounds half to even and maps NaN to 0. Every CPU
/// stage writes through this, so filters may compute out-of-range values
/// without wrapping.
#[inline]
pub(crate) fn to_sample(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 255.0).round_ties_even() as u8
}

/// Weighted 2-D convolution mask, row-major. Weights need not sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    width: usize,
    height: usize,
    weights: Vec<f64>,
}

impl Kernel {
    pub fn new(width: usize, height: usize, weights: Vec<f64>) -> Result<Self> {
        let expected = width * height;
        if weights.len() != expected || expected == 0 {
            return Err(FilterError::KernelSizeMismatch {
                width,
                height,
                expected,
                actual: weights.len(),
            });
        }
        Ok(Self {
            width,
            height,
            weights,
        })
    }

    /// `size x size` mask of uniform weight `1 / size^2`.
    pub fn box_blur(size: usize) -> Self {
        let size = size.max(1);
        let count = size * size;
        Self {
            width: size,
            height: size,
            weights: vec![1.0 / count as f64; count],
        }
    }

    /// Binomial `[1 2 1; 2 4 2; 1 2 1] / 16`.
    pub fn gaussian_3x3() -> Self {
        Self {
            width: 3,
            height: 3,
            weights: vec![
                0.0625, 0.125, 0.0625, //
                0.125, 0.25, 0.125, //
                0.0625, 0.125, 0.0625,
            ],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[inline]
    pub fn weight(&self, u: usize, v: usize) -> f64 {
        self.weights[v * self.width + u]
    }

    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }
}

/// Posterize output colors, ordered by the input brightness bucket they
/// replace (row 0 replaces the darkest bucket).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    rows: Vec<[u8; 3]>,
}

/// The finishing table: lightens the three posterized tones before the
/// pattern pass.
const FINAL_TONES: [[u8; 3]; 4] = [
    [255, 255, 255],
    [220, 220, 220],
    [200, 200, 200],
    [150, 150, 150],
];

/// Black / mid gray / white, used by the posterize layer.
const THREE_TONES: [[u8; 3]; 3] = [[0, 0, 0], [127, 127, 127], [255, 255, 255]];

impl ColorTable {
    pub fn new(rows: Vec<[u8; 3]>) -> Result<Self> {
        if rows.len() < 2 {
            return Err(FilterError::ColorTableTooShort { rows: rows.len() });
        }
        Ok(Self { rows })
    }

    /// `levels` evenly spaced grays: `floor(i * 255 / (levels - 1))`.
    pub fn grayscale_levels(levels: usize) -> Result<Self> {
        if levels < 2 {
            return Err(FilterError::ColorTableTooShort { rows: levels });
        }
        let level_size = 255.0 / (levels - 1) as f64;
        let rows = (0..levels)
            .map(|i| {
                let value = (level_size * i as f64).floor() as u8;
                [value, value, value]
            })
            .collect();
        Ok(Self { rows })
    }

    pub fn final_tones() -> Self {
        Self {
            rows: FINAL_TONES.to_vec(),
        }
    }

    pub fn three_tones() -> Self {
        Self {
            rows: THREE_TONES.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[[u8; 3]] {
        &self.rows
    }

    /// Width of one input bucket: `255 / (rows - 1)`.
    pub fn bucket_width(&self) -> f64 {
        255.0 / (self.rows.len() - 1) as f64
    }

    /// Flat `r, g, b, r, g, b, ...` list normalized to [0, 1], the shape the
    /// GPU posterize pass takes.
    pub fn to_flat_normalized(&self) -> Vec<f32> {
        self.rows
            .iter()
            .flat_map(|row| row.iter().map(|&c| c as f32 / 255.0))
            .collect()
    }
}

/// Tone remap triple. `low < high` is expected but only `low == high` is
/// rejected; an inverted range inverts the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelParameters {
    pub low: u8,
    pub mid: u8,
    pub high: u8,
}

impl Default for LevelParameters {
    /// Identity remap
    fn default() -> Self {
        Self {
            low: 0,
            mid: 128,
            high: 255,
        }
    }
}

impl LevelParameters {
    pub fn new(low: u8, mid: u8, high: u8) -> Self {
        Self { low, mid, high }
    }

    pub fn validate(&self) -> Result<()> {
        if self.low == self.high {
            return Err(FilterError::DegenerateRange {
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }

    /// `high - low`, signed.
    pub fn range(&self) -> f64 {
        self.high as f64 - self.low as f64
    }
}
