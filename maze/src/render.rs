//! Raster output: the bare maze, the solved overlay and the step-by-step animation.

use std::path::Path;

use anyhow::Context;
use image::{
    codecs::gif::{GifEncoder, Repeat},
    Frame, ImageBuffer, Rgb, Rgba, RgbaImage,
};

use crate::{Grid, Position, Solution, Tokens, Trace};

/// Colours used when drawing.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Palette {
    pub wall: Rgba<u8>,
    pub path: Rgba<u8>,
    /// Cells on the final route.
    pub route: Rgba<u8>,
    /// Cells explored but left behind.
    pub explored: Rgba<u8>,
}

impl Palette {
    pub fn new(wall: Rgb<u8>, path: Rgb<u8>) -> Self {
        let [wr, wg, wb] = wall.0;
        let [pr, pg, pb] = path.0;
        Self {
            wall: Rgba([wr, wg, wb, 255]),
            path: Rgba([pr, pg, pb, 255]),
            ..Self::default()
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            wall: Rgba([0, 0, 0, 255]),
            path: Rgba([255, 255, 255, 255]),
            route: Rgba([255, 0, 0, 150]),
            explored: Rgba([133, 133, 133, 150]),
        }
    }
}

fn fill_cell(img: &mut RgbaImage, p: Position, scale: u16, colour: Rgba<u8>) {
    let scale = u32::from(scale);
    let (x0, y0) = (p.x as u32 * scale, p.y as u32 * scale);
    for y in y0..y0 + scale {
        for x in x0..x0 + scale {
            img.put_pixel(x, y, colour);
        }
    }
}

fn paint_trace(img: &mut RgbaImage, trace: &Trace, scale: u16, palette: &Palette) {
    let colour = if trace.is_ok() {
        palette.route
    } else {
        palette.explored
    };
    fill_cell(img, trace.position, scale, colour);
}

/// The grid at its own scale, walls in the wall colour and every other cell in the path colour.
pub fn draw_grid(grid: &Grid, palette: &Palette) -> RgbaImage {
    let scale = u32::from(grid.scale());
    ImageBuffer::from_fn(
        grid.width() as u32 * scale,
        grid.height() as u32 * scale,
        |x, y| {
            let p = Position::new((x / scale) as usize, (y / scale) as usize);
            if grid.has(p, Tokens::WALL) {
                palette.wall
            } else {
                palette.path
            }
        },
    )
}

/// The grid with every trace painted over it in walk order.
pub fn draw_solution(solution: &Solution<'_>, palette: &Palette) -> RgbaImage {
    let mut img = draw_grid(solution.grid(), palette);
    for trace in solution.traces() {
        paint_trace(&mut img, trace, solution.scale(), palette);
    }
    img
}

/// One frame per trace, frame `i` showing traces `0..=i`.
///
/// Traces are coloured by how the walk ended, so a branch later abandoned is
/// drawn as explored from the moment it is entered.
pub fn animation_frames<'a>(
    solution: &Solution<'a>,
    palette: &Palette,
) -> impl Iterator<Item = RgbaImage> + 'a {
    let mut canvas = draw_grid(solution.grid(), palette);
    let scale = solution.scale();
    let palette = *palette;

    solution.traces().iter().map(move |trace| {
        paint_trace(&mut canvas, trace, scale, &palette);
        canvas.clone()
    })
}

/// Encodes `frames` as a looping GIF at `path`.
pub fn write_animation(
    path: &Path,
    frames: impl IntoIterator<Item = RgbaImage>,
) -> anyhow::Result<()> {
    let mut buf = Vec::new();
    {
        // the trailer is written when the encoder is dropped
        let mut encoder = GifEncoder::new(&mut buf);
        encoder.set_repeat(Repeat::Infinite)?;
        encoder
            .encode_frames(frames.into_iter().map(Frame::new))
            .with_context(|| format!("encoding animation for {}", path.display()))?;
    }
    std::fs::write(path, &buf).with_context(|| format!("writing {}", path.display()))
}

/// Writes a single image, the format picked from the file extension.
pub fn write_image(path: &Path, img: &RgbaImage) -> anyhow::Result<()> {
    img.save(path)
        .with_context(|| format!("writing {}", path.display()))
}
