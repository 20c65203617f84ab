use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{MazeError, MazeResult};

bitflags::bitflags! {
    /// The classification and walk bits held by a single cell.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
    pub struct Tokens: u8 {
        const WALL = 1 << 0;
        const PATH = 1 << 1;
        const BORDER = 1 << 2;
        const START = 1 << 3;
        const END = 1 << 4;
        const VISITED = 1 << 5;
        const ROUTE = 1 << 6;
    }
}

impl Tokens {
    /// Tokens assigned while discovering and solving; the rest are fixed at classification.
    pub const WALK: Tokens = Tokens::START
        .union(Tokens::END)
        .union(Tokens::VISITED)
        .union(Tokens::ROUTE);

    /// True if every token set here is a walk token.
    pub const fn is_walk_token(self) -> bool {
        !self.is_empty() && Tokens::WALK.contains(self)
    }

    /// WALL and PATH never share a cell.
    pub const fn is_valid(self) -> bool {
        !self.contains(Tokens::WALL.union(Tokens::PATH))
    }
}

/// A cell position, `x` is the column and `y` the row.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// The order in which neighbours are evaluated while walking.
    pub const SCAN_ORDER: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    /// The neighbouring position in this direction, if it does not underflow.
    pub fn offset(self, from: Position) -> Option<Position> {
        match self {
            Direction::Up => from.y.checked_sub(1).map(|y| Position { y, ..from }),
            Direction::Down => Some(Position {
                y: from.y + 1,
                ..from
            }),
            Direction::Left => from.x.checked_sub(1).map(|x| Position { x, ..from }),
            Direction::Right => Some(Position {
                x: from.x + 1,
                ..from
            }),
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Direction::Up => "up",
                Direction::Down => "down",
                Direction::Left => "left",
                Direction::Right => "right",
            }
        )
    }
}

/// An inclusive rectangle of positions.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Position,
    pub max: Position,
}

impl Bounds {
    pub fn contains(&self, p: Position) -> bool {
        (self.min.x..=self.max.x).contains(&p.x) && (self.min.y..=self.max.y).contains(&p.y)
    }
}

/// A rectangular grid of classified cells.
///
/// Row 0 and column 0 are always [`Tokens::BORDER`]; every other cell is either
/// [`Tokens::WALL`] or [`Tokens::PATH`]. Walk tokens are added on top of that
/// classification and never removed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Grid {
    width: usize,
    height: usize,
    scale: u16,
    cells: Vec<Tokens>,
}

impl Grid {
    /// Smallest width and height that still leave an interior cell.
    pub const MIN_SIZE: usize = 3;

    /// Classifies a `width` x `height` grid, asking `is_wall` about every non-border cell.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut is_wall: impl FnMut(Position) -> bool,
    ) -> MazeResult<Self> {
        if width < Self::MIN_SIZE || height < Self::MIN_SIZE {
            return Err(MazeError::MalformedGrid {
                reason: format!(
                    "{width}x{height} has no interior cells, need at least {min}x{min}",
                    min = Self::MIN_SIZE
                ),
            });
        }

        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                cells.push(if x == 0 || y == 0 {
                    Tokens::BORDER
                } else if is_wall(Position { x, y }) {
                    Tokens::WALL
                } else {
                    Tokens::PATH
                });
            }
        }

        Ok(Self {
            width,
            height,
            scale: 1,
            cells,
        })
    }

    /// Sets how many pixels one cell spans when rendered.
    pub fn with_scale(mut self, scale: u16) -> Self {
        self.scale = scale.max(1);
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn scale(&self) -> u16 {
        self.scale
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always `false`, construction rejects grids without cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_valid(&self, p: Position) -> bool {
        p.x < self.width && p.y < self.height
    }

    fn index(&self, p: Position) -> usize {
        p.y * self.width + p.x
    }

    pub fn get(&self, p: Position) -> Option<Tokens> {
        self.is_valid(p).then(|| self.cells[self.index(p)])
    }

    /// Tokens of the cell at `p`.
    ///
    /// # Panics
    ///
    /// Panics if `p` lies outside the grid.
    pub fn tokens(&self, p: Position) -> Tokens {
        self.cells[self.index(p)]
    }

    /// True if `p` is inside the grid and holds `token`.
    pub fn has(&self, p: Position, token: Tokens) -> bool {
        self.get(p).is_some_and(|t| t.contains(token))
    }

    pub(crate) fn mark(&mut self, p: Position, token: Tokens) {
        debug_assert!(token.is_walk_token(), "{token:?} is fixed at classification");
        let index = self.index(p);
        self.cells[index].insert(token);
    }

    /// The rectangle a walker may move in: everything but the outermost rows and columns.
    pub fn interior(&self) -> Bounds {
        Bounds {
            min: Position { x: 1, y: 1 },
            max: Position {
                x: self.width - 2,
                y: self.height - 2,
            },
        }
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Position { x, y }))
    }

    /// Raw cell tokens in row-major order.
    pub fn cells(&self) -> &[Tokens] {
        &self.cells
    }
}

impl FromStr for Grid {
    type Err = MazeError;

    /// Parses ASCII art: `#` is a wall, anything else is a path. Empty lines are skipped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rows: Vec<Vec<char>> = s
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| line.chars().collect())
            .collect();

        let width = rows.first().map_or(0, Vec::len);
        if let Some((row, line)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(MazeError::MalformedGrid {
                reason: format!(
                    "row {row} has {} cells, expected {width}",
                    line.len()
                ),
            });
        }

        Grid::from_fn(width, rows.len(), |p| rows[p.y][p.x] == '#')
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.cells.chunks(self.width) {
            for cell in row {
                write!(f, "{}", if cell.contains(Tokens::WALL) { '#' } else { ' ' })?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
