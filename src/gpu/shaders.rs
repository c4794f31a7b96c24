/// WGSL sources for the stencil filters
///
/// Every filter program is the shared `PRELUDE` (full-screen triangle vertex
/// stage plus the source texture binding) followed by one fragment stage.
/// Fragment stages read the source with `textureLoad` at integer pixel
/// coordinates clamped to the texture edge, so a neighbour lookup past the
/// border returns the border pixel itself.
///
/// Bindings shared by all programs:
/// - `@group(0) @binding(0)` source texture (Rgba8Unorm, read as f32)
/// - `@group(0) @binding(1)` per-filter uniform block

use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::{FilterError, Result};

/// One GPU filter pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Blur,
    Levels,
    Posterize,
    Pattern,
}

impl FilterKind {
    pub const ALL: [FilterKind; 4] = [
        FilterKind::Blur,
        FilterKind::Levels,
        FilterKind::Posterize,
        FilterKind::Pattern,
    ];

    /// Label used for wgpu objects belonging to this filter
    pub fn label(self) -> &'static str {
        match self {
            FilterKind::Blur => "stencil blur",
            FilterKind::Levels => "stencil levels",
            FilterKind::Posterize => "stencil posterize",
            FilterKind::Pattern => "stencil pattern",
        }
    }
}

/// Vertex stage and source binding, prepended to every fragment stage
pub const PRELUDE: &str = r#"
// ========== Vertex Shader ==========
// Full-screen triangle (no vertex buffers needed)

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    var output: VertexOutput;

    // Vertices (-1, -1), (3, -1), (-1, 3) cover the whole viewport
    let x = f32(i32(vertex_index & 1u) * 4 - 1);
    let y = f32(i32(vertex_index >> 1u) * 4 - 1);

    output.clip_position = vec4<f32>(x, -y, 0.0, 1.0);
    return output;
}

// ========== Source ==========

@group(0) @binding(0)
var source_texture: texture_2d<f32>;

// Clamp-to-edge texel fetch
fn load_clamped(pixel: vec2<i32>) -> vec4<f32> {
    let last = vec2<i32>(textureDimensions(source_texture)) - vec2<i32>(1, 1);
    return textureLoad(source_texture, clamp(pixel, vec2<i32>(0, 0), last), 0);
}

fn pixel_of(position: vec4<f32>) -> vec2<i32> {
    return vec2<i32>(floor(position.xy));
}
"#;

/// 10x10 tap box blur. Taps at offsets -5..4 on both axes, weighted by
/// `weights` (packed four per vec4) and divided by `weight_total`. Output
/// alpha is always 1.
pub const BLUR_FRAGMENT: &str = r#"
struct BlurParams {
    weights: array<vec4<f32>, 25>,
    weight_total: f32,
    padding0: f32,
    padding1: f32,
    padding2: f32,
}

@group(0) @binding(1)
var<uniform> params: BlurParams;

@fragment
fn fs_main(@builtin(position) position: vec4<f32>) -> @location(0) vec4<f32> {
    let pixel = pixel_of(position);
    var colour = vec4<f32>(0.0);
    for (var i = 0; i < 100; i = i + 1) {
        let offset = vec2<i32>(i % 10 - 5, i / 10 - 5);
        let weight = params.weights[i / 4][i % 4];
        colour = colour + load_clamped(pixel + offset) * weight;
    }
    return vec4<f32>(colour.rgb / params.weight_total, 1.0);
}
"#;

/// Levels on normalized values: clamp((c - low) / range) then raise to
/// `exponent`. Output alpha is always 1.
pub const LEVELS_FRAGMENT: &str = r#"
struct LevelsParams {
    low: f32,
    range: f32,
    exponent: f32,
    padding: f32,
}

@group(0) @binding(1)
var<uniform> params: LevelsParams;

@fragment
fn fs_main(@builtin(position) position: vec4<f32>) -> @location(0) vec4<f32> {
    let colour = load_clamped(pixel_of(position)).rgb;
    let rescaled = clamp((colour - vec3<f32>(params.low)) / params.range, vec3<f32>(0.0), vec3<f32>(1.0));
    return vec4<f32>(pow(rescaled, vec3<f32>(params.exponent)), 1.0);
}
"#;

/// Posterize by average brightness. `level_count` is the bucket width
/// `1 / (rows - 1)`; all channels take the same table row.
pub const POSTERIZE_FRAGMENT: &str = r#"
struct PosterizeParams {
    colours: array<vec4<f32>, 16>,
    level_count: f32,
    row_count: f32,
    padding0: f32,
    padding1: f32,
}

@group(0) @binding(1)
var<uniform> params: PosterizeParams;

@fragment
fn fs_main(@builtin(position) position: vec4<f32>) -> @location(0) vec4<f32> {
    let colour = load_clamped(pixel_of(position)).rgb;
    let average = dot(colour, vec3<f32>(1.0)) / 3.0;
    let last = u32(params.row_count) - 1u;
    let index = min(u32(floor(average / params.level_count)), last);
    return vec4<f32>(params.colours[index].rgb, 1.0);
}
"#;

/// Keep edges, halftone interiors on a fixed `grid` spacing.
///
/// Neighbour fetches clamp at the border, so border pixels only count as
/// edges when an in-image neighbour differs.
pub const PATTERN_FRAGMENT: &str = r#"
struct PatternParams {
    grid: f32,
    padding0: f32,
    padding1: f32,
    padding2: f32,
}

@group(0) @binding(1)
var<uniform> params: PatternParams;

@fragment
fn fs_main(@builtin(position) position: vec4<f32>) -> @location(0) vec4<f32> {
    let pixel = pixel_of(position);
    let center = load_clamped(pixel);
    let up = load_clamped(pixel + vec2<i32>(0, -1));
    let down = load_clamped(pixel + vec2<i32>(0, 1));
    let left = load_clamped(pixel + vec2<i32>(-1, 0));
    let right = load_clamped(pixel + vec2<i32>(1, 0));

    let is_edge = any(center != up) || any(center != down) || any(center != left) || any(center != right);
    if (is_edge) {
        return center;
    }

    let grid = i32(params.grid);
    let average = dot(center.rgb, vec3<f32>(1.0)) / 3.0;
    let on_grid = pixel.x % grid == 0 || pixel.y % grid == 0;
    let value = select(1.0, average, on_grid);
    return vec4<f32>(value, value, value, 1.0);
}
"#;

/// Immutable map from filter kind to fragment source.
///
/// Handed to `FilterPipeline::new`; each pipeline compiles from its own
/// table, so overriding a program never affects other pipelines.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderTable {
    fragments: HashMap<FilterKind, Cow<'static, str>>,
}

impl Default for ShaderTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ShaderTable {
    /// The four stencil filters
    pub fn builtin() -> Self {
        let fragments = HashMap::from([
            (FilterKind::Blur, Cow::Borrowed(BLUR_FRAGMENT)),
            (FilterKind::Levels, Cow::Borrowed(LEVELS_FRAGMENT)),
            (FilterKind::Posterize, Cow::Borrowed(POSTERIZE_FRAGMENT)),
            (FilterKind::Pattern, Cow::Borrowed(PATTERN_FRAGMENT)),
        ]);
        Self { fragments }
    }

    /// Table with no programs; every filter call fails with `MissingShader`.
    pub fn empty() -> Self {
        Self {
            fragments: HashMap::new(),
        }
    }

    /// Copy of this table with `kind` mapped to `fragment`.
    pub fn with_override(&self, kind: FilterKind, fragment: impl Into<Cow<'static, str>>) -> Self {
        let mut fragments = self.fragments.clone();
        fragments.insert(kind, fragment.into());
        Self { fragments }
    }

    pub fn contains(&self, kind: FilterKind) -> bool {
        self.fragments.contains_key(&kind)
    }

    pub fn fragment(&self, kind: FilterKind) -> Result<&str> {
        self.fragments
            .get(&kind)
            .map(|source| source.as_ref())
            .ok_or(FilterError::MissingShader(kind))
    }

    /// Full module source for `kind`: prelude plus fragment stage.
    pub fn module_source(&self, kind: FilterKind) -> Result<String> {
        let fragment = self.fragment(kind)?;
        Ok(format!("{PRELUDE}\n{fragment}"))
    }
}
