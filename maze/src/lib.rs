pub mod error;
pub mod generate;
pub mod grid;
pub mod protocol;
pub mod registry;
pub mod render;
pub mod service;
pub mod source;
pub mod trace;
pub mod util;
pub mod walker;

pub use error::{MazeError, MazeResult};
pub use grid::{Bounds, Direction, Grid, Position, Tokens};
pub use trace::{StepFlags, Trace, TraceLog};
pub use walker::{Solution, WalkState, Walker};
