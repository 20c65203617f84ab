//! Where maze images come from and how they become grids.

use std::path::PathBuf;

use anyhow::Context;
use image::{DynamicImage, Rgb};

use crate::{util::parse_img, Grid};

/// Dimensions and colours of a maze to build.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MazeRequest {
    /// Maze cells down.
    pub height: u16,
    /// Maze cells across.
    pub width: u16,
    /// Pixels per grid cell when rendering.
    pub ratio: u16,
    pub wall: Rgb<u8>,
    pub path: Rgb<u8>,
}

impl Default for MazeRequest {
    fn default() -> Self {
        Self {
            height: 20,
            width: 20,
            ratio: 1,
            wall: Rgb([0, 0, 0]),
            path: Rgb([255, 255, 255]),
        }
    }
}

/// Supplies the raster a grid is classified from.
pub trait GridSource {
    fn fetch(&mut self, request: &MazeRequest) -> anyhow::Result<DynamicImage>;
}

/// Reads a maze image from disk; the requested dimensions are ignored.
#[derive(Clone, Debug)]
pub struct ImageFile {
    pub path: PathBuf,
}

impl ImageFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl GridSource for ImageFile {
    fn fetch(&mut self, _request: &MazeRequest) -> anyhow::Result<DynamicImage> {
        image::open(&self.path).with_context(|| format!("opening {}", self.path.display()))
    }
}

/// Fetches an image for `request` and classifies it against the wall colour.
pub fn build_grid<S: GridSource + ?Sized>(
    source: &mut S,
    request: &MazeRequest,
) -> anyhow::Result<Grid> {
    let img = source.fetch(request).context("fetching maze image")?;
    let grid = parse_img(&img, request.wall).context("classifying maze image")?;
    log::debug!(
        "built {}x{} grid at scale {}",
        grid.width(),
        grid.height(),
        request.ratio
    );

    Ok(grid.with_scale(request.ratio))
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::generate::MazeGenerator;
    use crate::{Position, Tokens};

    #[test]
    fn test_build_generated_grid() {
        let request = MazeRequest {
            height: 4,
            width: 6,
            ratio: 3,
            ..MazeRequest::default()
        };
        let grid = build_grid(&mut MazeGenerator::new(3), &request).unwrap();

        assert_eq!(grid.width(), 15);
        assert_eq!(grid.height(), 11);
        assert_eq!(grid.scale(), 3);
        assert!(grid.has(Position::new(2, 1), Tokens::PATH));
        assert!(grid.has(Position::new(1, 1), Tokens::WALL));
        assert!(grid.has(Position::new(0, 5), Tokens::BORDER));
    }

    #[test]
    fn test_missing_file() {
        let mut source = ImageFile::new("does/not/exist.gif");
        let err = build_grid(&mut source, &MazeRequest::default()).unwrap_err();
        assert!(format!("{err:#}").contains("does/not/exist.gif"));
    }
}
