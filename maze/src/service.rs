//! Maps protocol requests onto the registry, the grid source and the walker.

use anyhow::{anyhow, Context};

use crate::{
    protocol::{ProtocolError, Request, Response, WirePoint, WireTrace},
    registry::{MazeEntry, MazeRegistry},
    source::{build_grid, GridSource, MazeRequest},
    Position, Tokens, Walker,
};

/// Where a response goes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Back to the client that sent the request.
    Reply(Response),
    /// To every connected client.
    Broadcast(Response),
}

impl Outcome {
    pub fn response(&self) -> &Response {
        match self {
            Outcome::Reply(r) | Outcome::Broadcast(r) => r,
        }
    }
}

pub struct MazeService<S> {
    source: S,
    registry: MazeRegistry,
    max_steps: Option<usize>,
}

impl<S: GridSource> MazeService<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            registry: MazeRegistry::new(),
            max_steps: None,
        }
    }

    /// Caps the number of steps each solve may take.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn registry(&self) -> &MazeRegistry {
        &self.registry
    }

    /// Decodes and handles a raw request. Malformed requests get an error reply.
    pub fn handle_bytes(&mut self, buf: &[u8]) -> Outcome {
        match Request::decode(buf) {
            Ok(request) => self.handle(request),
            Err(err) => Outcome::Reply(protocol_error(err)),
        }
    }

    pub fn handle(&mut self, request: Request) -> Outcome {
        let result = match request {
            Request::NewMaze(req) => self.new_maze(&req).map(Outcome::Broadcast),
            Request::ListMazes => Ok(Outcome::Reply(self.maze_list())),
            Request::GetMaze { id } => self.get_maze(id).map(Outcome::Reply),
            Request::SolveMaze { id } => self.solve_maze(id).map(Outcome::Reply),
        };

        result.unwrap_or_else(|err| {
            log::warn!("request failed: {err:#}");
            Outcome::Reply(Response::Error(format!("{err:#}")))
        })
    }

    fn maze_list(&self) -> Response {
        Response::MazeList(self.registry.ids())
    }

    fn new_maze(&mut self, req: &MazeRequest) -> anyhow::Result<Response> {
        let grid = build_grid(&mut self.source, req)?;
        let id = self.registry.register(MazeEntry {
            grid,
            request: *req,
        });
        log::debug!("registered maze {id}");
        Ok(self.maze_list())
    }

    fn entry(&self, id: u32) -> anyhow::Result<&MazeEntry> {
        self.registry
            .get(id)
            .ok_or_else(|| anyhow!("no maze with id {id}"))
    }

    fn get_maze(&self, id: u32) -> anyhow::Result<Response> {
        let entry = self.entry(id)?;
        let grid = &entry.grid;
        let ratio = grid.scale();

        let walls = grid
            .positions()
            .filter(|&p| grid.has(p, Tokens::WALL))
            .map(|p| scaled(p, ratio))
            .collect::<anyhow::Result<_>>()?;

        Ok(Response::Maze {
            id,
            ratio,
            height: to_u16(grid.height() * usize::from(ratio)).context("maze height")?,
            width: to_u16(grid.width() * usize::from(ratio)).context("maze width")?,
            wall: entry.request.wall,
            path: entry.request.path,
            walls,
        })
    }

    /// Solves a copy of the registered grid so it can be solved again later.
    fn solve_maze(&self, id: u32) -> anyhow::Result<Response> {
        let mut grid = self.entry(id)?.grid.clone();
        let ratio = grid.scale();

        let mut walker = Walker::new(&mut grid)?;
        if let Some(max_steps) = self.max_steps {
            walker = walker.with_max_steps(max_steps);
        }
        let log = walker
            .solve()
            .with_context(|| format!("solving maze {id}"))?;

        let traces = log
            .traces()
            .iter()
            .map(|t| -> anyhow::Result<WireTrace> {
                Ok(WireTrace {
                    point: scaled(t.position, ratio)?,
                    tag: t.flags,
                })
            })
            .collect::<anyhow::Result<_>>()?;

        Ok(Response::Solution { id, ratio, traces })
    }
}

fn protocol_error(err: ProtocolError) -> Response {
    log::warn!("rejected request: {err}");
    Response::Error(err.to_string())
}

fn to_u16(v: usize) -> anyhow::Result<u16> {
    u16::try_from(v).map_err(|_| anyhow!("{v} does not fit in 16 bits"))
}

fn scaled(p: Position, ratio: u16) -> anyhow::Result<WirePoint> {
    let ratio = usize::from(ratio);
    Ok(WirePoint {
        x: to_u16(p.x * ratio).with_context(|| format!("x of {p}"))?,
        y: to_u16(p.y * ratio).with_context(|| format!("y of {p}"))?,
    })
}

#[cfg(test)]
mod test {

    use image::Rgb;

    use super::*;
    use crate::generate::MazeGenerator;
    use crate::trace::StepFlags;

    fn request(ratio: u16) -> MazeRequest {
        MazeRequest {
            height: 3,
            width: 4,
            ratio,
            wall: Rgb([0, 0, 0]),
            path: Rgb([255, 255, 255]),
        }
    }

    fn register(service: &mut MazeService<MazeGenerator>, ratio: u16) -> u32 {
        match service.handle(Request::NewMaze(request(ratio))) {
            Outcome::Broadcast(Response::MazeList(ids)) => *ids.last().unwrap(),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_new_maze_broadcasts_list() {
        let mut service = MazeService::new(MazeGenerator::new(1));
        let a = register(&mut service, 1);
        let b = register(&mut service, 1);
        assert!(b > a);

        assert_eq!(
            service.handle(Request::ListMazes),
            Outcome::Reply(Response::MazeList(vec![a, b]))
        );
    }

    #[test]
    fn test_get_maze_streams_scaled_walls() {
        let mut service = MazeService::new(MazeGenerator::new(1));
        let id = register(&mut service, 2);
        let grid = &service.registry().get(id).unwrap().grid;
        let wall_count = grid
            .positions()
            .filter(|&p| grid.has(p, Tokens::WALL))
            .count();

        let Outcome::Reply(Response::Maze {
            ratio,
            height,
            width,
            walls,
            ..
        }) = service.handle(Request::GetMaze { id })
        else {
            panic!("expected a maze");
        };

        // 4x3 maze cells make an 11x9 grid
        assert_eq!((ratio, width, height), (2, 22, 18));
        assert_eq!(walls.len(), wall_count);
        // the top-left corner of the outer wall comes first
        assert_eq!(walls[0], WirePoint { x: 2, y: 2 });
        assert!(walls.iter().all(|p| p.x % 2 == 0 && p.y % 2 == 0));
    }

    #[test]
    fn test_solve_maze() {
        let mut service = MazeService::new(MazeGenerator::new(4));
        let id = register(&mut service, 3);

        let Outcome::Reply(Response::Solution { id: got, traces, .. }) =
            service.handle(Request::SolveMaze { id })
        else {
            panic!("expected a solution");
        };
        assert_eq!(got, id);
        // entry at grid (2, 1), exit at (8, 7)
        assert_eq!(traces[0].point, WirePoint { x: 6, y: 3 });
        assert_eq!(traces.last().unwrap().point, WirePoint { x: 24, y: 21 });
        assert!(traces.iter().all(|t| t.tag.contains(StepFlags::VISITED)));

        // the registered grid is left untouched
        let grid = &service.registry().get(id).unwrap().grid;
        assert!(grid.cells().iter().all(|t| !t.contains(Tokens::VISITED)));

        // solving twice gives the same answer
        assert_eq!(
            service.handle(Request::SolveMaze { id }),
            service.handle(Request::SolveMaze { id })
        );
    }

    #[test]
    fn test_errors_become_responses() {
        let mut service = MazeService::new(MazeGenerator::new(4)).with_max_steps(1);

        assert_eq!(
            service.handle_bytes(&[7]),
            Outcome::Reply(Response::Error("unknown opcode 7".into()))
        );
        assert_eq!(
            service.handle_bytes(&[]),
            Outcome::Reply(Response::Error("empty message".into()))
        );

        let Outcome::Reply(Response::Error(message)) = service.handle(Request::GetMaze { id: 5 })
        else {
            panic!("expected an error");
        };
        assert_eq!(message, "no maze with id 5");

        let id = register(&mut service, 1);
        let Outcome::Reply(Response::Error(message)) = service.handle(Request::SolveMaze { id })
        else {
            panic!("expected an error");
        };
        assert!(message.contains("step limit"), "{message}");
    }

    #[test]
    fn test_handle_bytes() {
        let mut service = MazeService::new(MazeGenerator::new(2));
        let outcome = service.handle_bytes(&Request::NewMaze(request(1)).encode());
        assert!(matches!(outcome, Outcome::Broadcast(Response::MazeList(ref ids)) if ids.len() == 1));
        assert_eq!(
            service.handle_bytes(&[2]).response(),
            outcome.response()
        );
    }

    #[test]
    fn test_scaled_overflow() {
        assert!(scaled(Position::new(40_000, 1), 2).is_err());
        assert_eq!(
            scaled(Position::new(3, 4), 5).unwrap(),
            WirePoint { x: 15, y: 20 }
        );
    }
}
