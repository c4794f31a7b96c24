/// Photo-to-stencil filter chain
///
/// Turns a photo into a carving template by running it through grayscale,
/// blur, levels, posterize and a halftone finishing pass. Each stage exists
/// as a CPU filter over `RasterBuffer`s and, except grayscale, as a GPU
/// fragment pass with its own resource lifecycle.
///
/// Module overview:
/// - `raster` - pixel buffer, kernel, color table and level types
/// - `filters` - CPU filters
/// - `gpu` - wgpu backend
/// - `compositor` - finishing stage on either backend
/// - `layers` - the full chain with every intermediate kept
/// - `geometry` - rotated bounding boxes
/// - `source` - rotation and resizing of the input photo
/// - `settings` - user-tunable values, saved as JSON

pub mod compositor;
pub mod error;
pub mod filters;
pub mod geometry;
pub mod gpu;
pub mod layers;
pub mod raster;
pub mod settings;
pub mod source;

pub use compositor::{process_final, GpuFinalCompositor};
pub use error::{FilterError, Result};
pub use geometry::{rotated_bounding_box, BoundingBox, Point2D};
pub use gpu::{FilterKind, FilterPipeline, GpuContext, ShaderTable};
pub use layers::{FilterBackend, GpuLayers, Layer, LayerPipeline, LayerStack};
pub use raster::{ColorTable, Kernel, LevelParameters, RasterBuffer};
pub use settings::{BackendKind, StencilSettings};
