//! Start/end discovery and the depth-first walk with branch memory.

use std::fmt::Display;

use crate::error::{MazeError, MazeResult};
use crate::grid::{Bounds, Direction, Grid, Position, Tokens};
use crate::trace::{Trace, TraceLog};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WalkState {
    Running,
    Done,
}

impl WalkState {
    pub fn is_done(&self) -> bool {
        matches!(self, WalkState::Done)
    }
}

/// Walks a grid from its entry to its exit.
///
/// Creating a walker scans the ring of the grid's interior for the two openings
/// and marks them [`Tokens::START`] and [`Tokens::END`]. The walker keeps an
/// exclusive borrow of the grid until it is dropped.
#[derive(Debug)]
pub struct Walker<'g> {
    grid: &'g mut Grid,
    start: Position,
    end: Position,
    bounds: Bounds,
    current: Position,
    log: TraceLog,
    state: WalkState,
    steps: usize,
    max_steps: usize,
    halted: Option<MazeError>,
}

impl<'g> Walker<'g> {
    pub fn new(grid: &'g mut Grid) -> MazeResult<Self> {
        let bounds = grid.interior();
        let (start, end) = discover(grid, bounds)?;
        let max_steps = 4 * grid.len() + 4;

        let mut walker = Self {
            grid,
            start,
            end,
            bounds,
            current: start,
            log: TraceLog::new(),
            state: WalkState::Running,
            steps: 0,
            max_steps,
            halted: None,
        };
        walker.reset();
        Ok(walker)
    }

    /// Overrides the step budget, which defaults to four steps per grid cell.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn current(&self) -> Position {
        self.current
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    /// Steps taken since the walk was last reset.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn log(&self) -> &TraceLog {
        &self.log
    }

    pub fn grid(&self) -> &Grid {
        &*self.grid
    }

    pub fn into_log(self) -> TraceLog {
        self.log
    }

    /// Read-only view of the finished walk, `None` until the exit is reached.
    pub fn solution(&self) -> Option<Solution<'_>> {
        self.state.is_done().then(|| Solution {
            grid: &*self.grid,
            log: &self.log,
            start: self.start,
            end: self.end,
        })
    }

    fn reset(&mut self) {
        self.log = TraceLog::new();
        self.log.push(self.start);
        self.grid.mark(self.start, Tokens::VISITED);
        self.current = self.start;
        self.state = WalkState::Running;
        self.steps = 0;
        self.halted = None;
    }

    fn halt(&mut self, err: MazeError) -> MazeError {
        self.halted = Some(err.clone());
        err
    }

    /// Unvisited path cells next to `from`, in [`Direction::SCAN_ORDER`].
    fn candidates(&self, from: Position) -> Vec<Position> {
        let mut points = Vec::with_capacity(4);
        for direction in Direction::SCAN_ORDER {
            let Some(next) = direction.offset(from) else {
                continue;
            };
            if self.bounds.contains(next)
                && self.grid.has(next, Tokens::PATH)
                && !self.log.has_visited(next)
            {
                points.push(next);
            }
        }
        points
    }

    fn enter(&mut self, next: Position) {
        self.grid.mark(next, Tokens::VISITED);
        self.current = next;
    }

    /// Writes the finished walk back into the grid for renderers.
    fn write_back(&mut self) {
        for trace in self.log.traces() {
            self.grid.mark(trace.position, Tokens::VISITED);
            if trace.is_ok() {
                self.grid.mark(trace.position, Tokens::ROUTE);
            }
        }
    }

    /// Takes a single step of the walk.
    ///
    /// Once the walk has failed every further call returns the same error.
    pub fn step(&mut self) -> MazeResult<WalkState> {
        if let Some(err) = &self.halted {
            return Err(err.clone());
        }
        if self.state.is_done() {
            return Ok(self.state);
        }
        if self.steps >= self.max_steps {
            let limit = self.max_steps;
            return Err(self.halt(MazeError::StepLimitExceeded { limit }));
        }
        self.steps += 1;

        let here = self.current;
        if self.grid.has(here, Tokens::END) {
            self.log.push(here);
            self.write_back();
            self.state = WalkState::Done;
            return Ok(self.state);
        }

        let candidates = self.candidates(here);
        match candidates.as_slice() {
            [] => {
                self.log.push_dead_end(here);
                match self.log.backtrack() {
                    Some(branch) => self.current = branch,
                    None => {
                        return Err(self.halt(MazeError::BacktrackExhausted { position: here }))
                    }
                }
            }
            [next] => {
                self.log.push(here);
                self.enter(*next);
            }
            [next, ..] => {
                self.log.push_branch(here, candidates.len());
                self.enter(*next);
            }
        }

        Ok(self.state)
    }

    /// Walks from the start until the exit is reached and returns the record of the walk.
    ///
    /// Any earlier walk is discarded first. Tokens it left on the grid stay.
    pub fn solve(&mut self) -> MazeResult<&TraceLog> {
        self.reset();
        while !self.step()?.is_done() {}

        log::debug!(
            "reached {} from {} in {} steps, route of {} cells",
            self.end,
            self.start,
            self.steps,
            self.log.route().len()
        );
        Ok(&self.log)
    }
}

/// Finds the entry and exit on the ring of `bounds` and marks them on the grid.
fn discover(grid: &mut Grid, bounds: Bounds) -> MazeResult<(Position, Position)> {
    let mut start: Option<Position> = None;

    for p in perimeter(bounds) {
        if !grid.has(p, Tokens::PATH) || start == Some(p) {
            continue;
        }
        match start {
            None => {
                grid.mark(p, Tokens::START);
                start = Some(p);
            }
            Some(start) => {
                grid.mark(p, Tokens::END);
                log::debug!("discovered start {} and end {}", start, p);
                return Ok((start, p));
            }
        }
    }

    Err(MazeError::NoOpeningFound {
        found: usize::from(start.is_some()),
    })
}

/// The ring of `b` in scan order: right along the top row, down the right
/// column, left along the bottom row and up the left column.
///
/// Every leg moves before it tests, so `b.min` itself comes last.
fn perimeter(b: Bounds) -> impl Iterator<Item = Position> {
    let (min, max) = (b.min, b.max);
    let right = (min.x + 1..=max.x).map(move |x| Position { x, y: min.y });
    let down = (min.y + 1..=max.y).map(move |y| Position { x: max.x, y });
    let left = (min.x..max.x).rev().map(move |x| Position { x, y: max.y });
    let up = (min.y..max.y).rev().map(move |y| Position { x: min.x, y });
    right.chain(down).chain(left).chain(up)
}

/// A finished walk over its grid.
#[derive(Copy, Clone, Debug)]
pub struct Solution<'a> {
    grid: &'a Grid,
    log: &'a TraceLog,
    start: Position,
    end: Position,
}

impl<'a> Solution<'a> {
    pub fn grid(&self) -> &'a Grid {
        self.grid
    }

    pub fn log(&self) -> &'a TraceLog {
        self.log
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }

    /// Every trace in walk order.
    pub fn traces(&self) -> &'a [Trace] {
        self.log.traces()
    }

    pub fn trace_at(&self, p: Position) -> Option<&'a Trace> {
        self.log.trace_at(p)
    }

    /// Tokens of the cell at `p`, `None` outside the grid.
    pub fn tokens(&self, p: Position) -> Option<Tokens> {
        self.grid.get(p)
    }

    /// Pixels per cell.
    pub fn scale(&self) -> u16 {
        self.grid.scale()
    }

    pub fn route(&self) -> Vec<Position> {
        self.log.route()
    }
}

impl Display for Solution<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for y in 0..self.grid.height() {
            for x in 0..self.grid.width() {
                let p = Position { x, y };
                let c = match self.log.trace_at(p) {
                    Some(trace) if trace.is_ok() => '*',
                    Some(_) => '.',
                    None => {
                        let tokens = self.grid.tokens(p);
                        if tokens.contains(Tokens::WALL) {
                            '#'
                        } else if tokens.contains(Tokens::START) {
                            'S'
                        } else if tokens.contains(Tokens::END) {
                            'E'
                        } else {
                            ' '
                        }
                    }
                };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
