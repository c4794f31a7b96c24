/// Color-table posterization

use crate::error::Result;
use crate::raster::{ColorTable, RasterBuffer};

/// Posterize in place through `table`.
///
/// R, G and B are bucketed independently: `bucket = floor(v / (255 / (rows - 1)))`
/// and the channel takes `table[bucket][channel]`, so the three channels of
/// one pixel may come from different rows. Alpha is forced to 255.
pub fn posterize(image: &mut RasterBuffer, table: &ColorTable) {
    let bucket_width = table.bucket_width();
    let last = table.len() - 1;
    let rows = table.rows();

    for pixel in image.pixels_mut().chunks_exact_mut(4) {
        for channel in 0..3 {
            let bucket = ((pixel[channel] as f64 / bucket_width).floor() as usize).min(last);
            pixel[channel] = rows[bucket][channel];
        }
        pixel[3] = 255;
    }
}

/// Posterize to `levels` evenly spaced grays.
pub fn posterize_levels(image: &mut RasterBuffer, levels: usize) -> Result<()> {
    let table = ColorTable::grayscale_levels(levels)?;
    posterize(image, &table);
    Ok(())
}
