use image::{DynamicImage, GenericImageView, Rgb};

use crate::Grid;

/// Classifies every pixel of `img` into one grid cell.
///
/// A pixel is a wall when its RGB channels match `wall` exactly; alpha is
/// ignored. Row 0 and column 0 become border regardless of their colour.
pub fn parse_img(img: &DynamicImage, wall: Rgb<u8>) -> Result<Grid, anyhow::Error> {
    let width = img.width() as usize;
    let height = img.height() as usize;

    let grid = Grid::from_fn(width, height, |p| {
        let px = img.get_pixel(p.x as u32, p.y as u32);
        px.0[..3] == wall.0
    })?;

    Ok(grid)
}
