//! Seeded maze generation, a local stand-in for fetching maze images.

use anyhow::ensure;
use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::source::{GridSource, MazeRequest};

/// Recursive backtracker over a `width` x `height` lattice of maze cells.
///
/// Generated mazes are perfect: every pair of cells is joined by exactly one
/// path. The same seed always produces the same sequence of mazes.
#[derive(Clone, Debug)]
pub struct MazeGenerator {
    rng: ChaCha8Rng,
}

impl MazeGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Carves a maze and returns its wall layout in raster order.
    ///
    /// The raster is `2 * width + 3` pixels wide and `2 * height + 3` high. A one
    /// pixel margin of path surrounds the maze's outer wall, cell `(c, r)` sits at
    /// pixel `(2c + 2, 2r + 2)`, the entry is cut into the top wall above cell
    /// `(0, 0)` and the exit into the bottom wall below the last cell.
    pub fn carve(&mut self, width: usize, height: usize) -> Layout {
        let mut layout = Layout::walled(width, height);
        let mut visited = vec![false; width * height];
        let mut stack = vec![(0usize, 0usize)];
        visited[0] = true;
        layout.open(2, 2);

        while let Some(&(c, r)) = stack.last() {
            let mut next = Vec::with_capacity(4);
            if r > 0 && !visited[(r - 1) * width + c] {
                next.push((c, r - 1));
            }
            if c + 1 < width && !visited[r * width + c + 1] {
                next.push((c + 1, r));
            }
            if r + 1 < height && !visited[(r + 1) * width + c] {
                next.push((c, r + 1));
            }
            if c > 0 && !visited[r * width + c - 1] {
                next.push((c - 1, r));
            }

            match next.choose(&mut self.rng) {
                Some(&(nc, nr)) => {
                    visited[nr * width + nc] = true;
                    // knock out the wall between the two cells, then the cell itself
                    layout.open(c + nc + 2, r + nr + 2);
                    layout.open(2 * nc + 2, 2 * nr + 2);
                    stack.push((nc, nr));
                }
                None => {
                    stack.pop();
                }
            }
        }

        layout.open(2, 1);
        layout.open(2 * width, 2 * height + 1);
        layout
    }
}

impl GridSource for MazeGenerator {
    fn fetch(&mut self, request: &MazeRequest) -> anyhow::Result<DynamicImage> {
        ensure!(
            request.width > 0 && request.height > 0,
            "cannot generate a {}x{} maze",
            request.width,
            request.height
        );

        let layout = self.carve(request.width.into(), request.height.into());
        log::debug!(
            "generated {}x{} maze ({}x{} pixels)",
            request.width,
            request.height,
            layout.width,
            layout.height
        );
        Ok(DynamicImage::ImageRgb8(
            layout.to_image(request.wall, request.path),
        ))
    }
}

/// Pixel walls of a generated maze.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Layout {
    pub width: usize,
    pub height: usize,
    walls: Vec<bool>,
}

impl Layout {
    /// Every pixel inside the margin starts out as wall.
    fn walled(width: usize, height: usize) -> Self {
        let (w, h) = (2 * width + 3, 2 * height + 3);
        let walls = (0..h)
            .flat_map(|y| (0..w).map(move |x| x > 0 && y > 0 && x < w - 1 && y < h - 1))
            .collect();
        Self {
            width: w,
            height: h,
            walls,
        }
    }

    fn open(&mut self, x: usize, y: usize) {
        self.walls[y * self.width + x] = false;
    }

    pub fn is_wall(&self, x: usize, y: usize) -> bool {
        self.walls[y * self.width + x]
    }

    pub fn to_image(&self, wall: Rgb<u8>, path: Rgb<u8>) -> RgbImage {
        ImageBuffer::from_fn(self.width as u32, self.height as u32, |x, y| {
            if self.is_wall(x as usize, y as usize) {
                wall
            } else {
                path
            }
        })
    }
}
